//! Transforms between big-endian register streams and host scalars.
//!
//! Devices disagree on how multi-register values are laid out: some swap
//! the bytes inside each 16-bit word, some reorder the words of 32/64-bit
//! values, some do both. [`WordCodec`] captures that policy as an
//! immutable value with pure, symmetric encode/decode functions.

use crate::DecodeError;

#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

/// Character encoding used when transcoding strings to register bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextEncoding {
    #[default]
    Ascii,
    Utf16Le,
}

/// Byte-ordering policy applied to every scalar and string transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WordCodec {
    /// Swap the two bytes inside each 16-bit word.
    pub word_swap: bool,
    /// Reorder the words of 32/64-bit scalars (swap for two words,
    /// reverse for four).
    pub multi_word_swap: bool,
    /// Swap the bytes inside each word when transcoding strings.
    pub string_word_swap: bool,
}

impl Default for WordCodec {
    fn default() -> Self {
        Self {
            word_swap: true,
            multi_word_swap: false,
            string_word_swap: false,
        }
    }
}

impl WordCodec {
    pub const fn new(word_swap: bool, multi_word_swap: bool, string_word_swap: bool) -> Self {
        Self {
            word_swap,
            multi_word_swap,
            string_word_swap,
        }
    }

    /// Normalization between wire order and big-endian scalar order.
    ///
    /// Both reorders are involutions acting on disjoint axes (bytes
    /// within words, word positions), so one pass serves encode and
    /// decode alike.
    fn reorder(&self, buf: &mut [u8]) {
        if self.word_swap {
            for pair in buf.chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
        }
        if self.multi_word_swap && buf.len() > 2 {
            let words = buf.len() / 2;
            for i in 0..words / 2 {
                let j = words - 1 - i;
                buf.swap(2 * i, 2 * j);
                buf.swap(2 * i + 1, 2 * j + 1);
            }
        }
    }

    fn take<const N: usize>(bytes: &[u8]) -> Result<[u8; N], DecodeError> {
        let slice = bytes.get(..N).ok_or(DecodeError::UnexpectedEof)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn decode_raw<const N: usize>(&self, bytes: &[u8]) -> Result<[u8; N], DecodeError> {
        let mut raw = Self::take::<N>(bytes)?;
        self.reorder(&mut raw);
        Ok(raw)
    }

    pub fn decode_u16(&self, bytes: &[u8]) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.decode_raw(bytes)?))
    }

    pub fn decode_i16(&self, bytes: &[u8]) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.decode_raw(bytes)?))
    }

    pub fn decode_u32(&self, bytes: &[u8]) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.decode_raw(bytes)?))
    }

    pub fn decode_i32(&self, bytes: &[u8]) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.decode_raw(bytes)?))
    }

    pub fn decode_f32(&self, bytes: &[u8]) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.decode_raw(bytes)?))
    }

    pub fn decode_u64(&self, bytes: &[u8]) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.decode_raw(bytes)?))
    }

    pub fn decode_i64(&self, bytes: &[u8]) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.decode_raw(bytes)?))
    }

    pub fn decode_f64(&self, bytes: &[u8]) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.decode_raw(bytes)?))
    }

    fn encode_raw<const N: usize>(&self, mut raw: [u8; N]) -> [u8; N] {
        self.reorder(&mut raw);
        raw
    }

    pub fn encode_u16(&self, value: u16) -> [u8; 2] {
        self.encode_raw(value.to_be_bytes())
    }

    pub fn encode_i16(&self, value: i16) -> [u8; 2] {
        self.encode_raw(value.to_be_bytes())
    }

    pub fn encode_u32(&self, value: u32) -> [u8; 4] {
        self.encode_raw(value.to_be_bytes())
    }

    pub fn encode_i32(&self, value: i32) -> [u8; 4] {
        self.encode_raw(value.to_be_bytes())
    }

    pub fn encode_f32(&self, value: f32) -> [u8; 4] {
        self.encode_raw(value.to_be_bytes())
    }

    pub fn encode_u64(&self, value: u64) -> [u8; 8] {
        self.encode_raw(value.to_be_bytes())
    }

    pub fn encode_i64(&self, value: i64) -> [u8; 8] {
        self.encode_raw(value.to_be_bytes())
    }

    pub fn encode_f64(&self, value: f64) -> [u8; 8] {
        self.encode_raw(value.to_be_bytes())
    }

    /// Transcode `text` into register bytes.
    ///
    /// The output is padded to an even length; with `fixed_len` it is
    /// zero-filled or truncated to exactly that many bytes first.
    #[cfg(feature = "alloc")]
    pub fn encode_text(
        &self,
        text: &str,
        encoding: TextEncoding,
        fixed_len: Option<usize>,
    ) -> Vec<u8> {
        let mut bytes: Vec<u8> = match encoding {
            TextEncoding::Ascii => text.bytes().collect(),
            TextEncoding::Utf16Le => text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
        };
        if let Some(len) = fixed_len {
            bytes.resize(len, 0);
        }
        if bytes.len() % 2 != 0 {
            bytes.push(0);
        }
        if self.string_word_swap {
            for pair in bytes.chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
        }
        bytes
    }

    /// Transcode register bytes back into a string, trimming trailing
    /// NUL padding.
    #[cfg(feature = "alloc")]
    pub fn decode_text(&self, bytes: &[u8], encoding: TextEncoding) -> String {
        let mut bytes = bytes.to_vec();
        if self.string_word_swap {
            for pair in bytes.chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
        }
        match encoding {
            TextEncoding::Ascii => {
                while bytes.last() == Some(&0) {
                    bytes.pop();
                }
                String::from_utf8_lossy(&bytes).into_owned()
            }
            TextEncoding::Utf16Le => {
                let mut units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                while units.last() == Some(&0) {
                    units.pop();
                }
                String::from_utf16_lossy(&units)
            }
        }
    }
}

/// Pack bits LSB-first into `out`, zero-filling trailing pad bits.
///
/// `out` must hold at least `values.len().div_ceil(8)` bytes.
pub fn pack_bits_into(values: &[bool], out: &mut [u8]) {
    out.fill(0);
    for (i, value) in values.iter().enumerate() {
        out[i / 8] |= u8::from(*value) << (i % 8);
    }
}

#[cfg(feature = "alloc")]
pub fn pack_bits(values: &[bool]) -> Vec<u8> {
    let mut out = alloc::vec![0u8; values.len().div_ceil(8)];
    pack_bits_into(values, &mut out);
    out
}

/// Unpack exactly `count` bits LSB-first, discarding trailing pad bits.
/// Returns `None` if `bytes` holds fewer than `count` bits.
#[cfg(feature = "alloc")]
pub fn unpack_bits(bytes: &[u8], count: usize) -> Option<Vec<bool>> {
    if bytes.len() * 8 < count {
        return None;
    }
    Some(
        (0..count)
            .map(|i| (bytes[i / 8] & (1u8 << (i % 8))) != 0)
            .collect(),
    )
}
