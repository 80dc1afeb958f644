//! High-level Modbus RTU client.
//!
//! Operations are addressed by expression strings such as `"100"`,
//! `"s=3;100"` or `"s=3;x=4;100"` (see [`rtubus_core::address`]), and
//! typed values pass through the client's [`WordCodec`] byte-order
//! policy on both the read and write paths.

#![forbid(unsafe_code)]

pub mod sync;

pub use sync::{SyncClientError, SyncRtuClient};

use rtubus_core::address::{self, PointAddress};
use rtubus_core::frame::rtu::{self as rtu_frame, FrameError, RtuFrame};
use rtubus_core::pdu::{
    ExceptionResponse, FunctionCode, PduBuffer, PduCursor, ReadBitsRequest, ReadRegistersRequest,
    Request, Response, WriteMultipleCoilsRequest, WriteMultipleRegistersRequest,
    WriteSingleCoilRequest, WriteSingleRegisterRequest,
};
use rtubus_core::transform::{unpack_bits, TextEncoding, WordCodec};
use rtubus_core::{DecodeError, EncodeError};
use rtubus_datalink::{DataLink, DataLinkError};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Registers fetched per on-wire request during bulk reads. Chunk
/// boundaries always fall on a register, never inside one.
pub const READ_CHUNK_REGISTERS: u16 = 120;

const FRAME_BUF_LEN: usize = 260;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("address parse error: {0}")]
    AddressParse(#[from] address::AddressError),
    #[error("transport error: {0}")]
    Transport(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Frame(#[from] FrameError),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
}

impl ClientError {
    /// The slave's exception diagnostic, when this error carries one.
    pub fn exception(&self) -> Option<ExceptionResponse> {
        match self {
            Self::Frame(FrameError::Exception(ex)) => Some(*ex),
            _ => None,
        }
    }
}

/// Client configuration. Mutating it between exchanges is fine; the
/// client never changes it on its own.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Station addressed when an expression has no `s=` override.
    pub station: u8,
    /// When false, caller-visible offsets start at 1 and are shifted
    /// down before transmission.
    pub zero_based_addressing: bool,
    /// Byte-order policy for every typed transform.
    pub codec: WordCodec,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            station: 1,
            zero_based_addressing: true,
            codec: WordCodec::default(),
        }
    }
}

impl ClientOptions {
    pub fn with_station(mut self, station: u8) -> Self {
        self.station = station;
        self
    }

    pub fn with_zero_based_addressing(mut self, zero_based: bool) -> Self {
        self.zero_based_addressing = zero_based;
        self
    }

    pub fn with_codec(mut self, codec: WordCodec) -> Self {
        self.codec = codec;
        self
    }
}

pub struct RtuClient<D: DataLink> {
    datalink: D,
    options: ClientOptions,
}

impl<D: DataLink> fmt::Display for RtuClient<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModbusRtuNet")
    }
}

impl<D: DataLink> RtuClient<D> {
    pub fn new(datalink: D) -> Self {
        Self::with_options(datalink, ClientOptions::default())
    }

    pub fn with_options(datalink: D, options: ClientOptions) -> Self {
        Self { datalink, options }
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    pub fn options_mut(&mut self) -> &mut ClientOptions {
        &mut self.options
    }

    pub fn codec(&self) -> WordCodec {
        self.options.codec
    }

    fn resolve(&self, expr: &str) -> Result<PointAddress, ClientError> {
        Ok(address::parse(expr, self.options.zero_based_addressing)?)
    }

    fn station_of(&self, addr: &PointAddress) -> u8 {
        addr.station.unwrap_or(self.options.station)
    }

    fn read_station_of(&self, addr: &PointAddress) -> Result<u8, ClientError> {
        let station = self.station_of(addr);
        if station == 0 {
            return Err(ClientError::InvalidRequest(
                "broadcast station cannot be read",
            ));
        }
        Ok(station)
    }

    /// Function code for a read: the `x=` override if present, else the
    /// operation's implicit code.
    fn read_function(
        addr: &PointAddress,
        implicit: FunctionCode,
    ) -> Result<FunctionCode, ClientError> {
        match addr.function {
            None => Ok(implicit),
            Some(fc) => FunctionCode::from_u8(fc)
                .map_err(|_| ClientError::Encode(EncodeError::UnsupportedFunction(fc))),
        }
    }

    /// Writes have a fixed function code; a conflicting override is an
    /// error rather than silently ignored.
    fn require_function(addr: &PointAddress, implicit: FunctionCode) -> Result<(), ClientError> {
        match addr.function {
            None => Ok(()),
            Some(fc) if fc == implicit.as_u8() => Ok(()),
            Some(fc) => Err(ClientError::Encode(EncodeError::UnsupportedFunction(fc))),
        }
    }

    async fn transact<'a>(
        &self,
        station: u8,
        request: &Request<'_>,
        response_storage: &'a mut [u8],
    ) -> Result<Response<'a>, ClientError> {
        let mut request_pdu = PduBuffer::new();
        request.encode(&mut request_pdu)?;
        let frame = RtuFrame::build(station, request_pdu.as_bytes())?;

        let expected_fc = request.function_code().as_u8();
        debug!(
            station,
            function = expected_fc,
            frame_len = frame.as_bytes().len(),
            "dispatching modbus request"
        );

        let response_len = self
            .datalink
            .exchange(frame.as_bytes(), response_storage)
            .await?;

        let (response_station, response_pdu) =
            rtu_frame::decode_response_frame(&response_storage[..response_len], expected_fc)?;
        if response_station != station {
            return Err(ClientError::InvalidResponse(
                "response from unexpected station",
            ));
        }

        let mut cursor = PduCursor::new(response_pdu);
        let response = Response::decode(&mut cursor)?;
        if !cursor.finished() {
            return Err(ClientError::InvalidResponse("trailing bytes in response"));
        }
        Ok(response)
    }

    async fn read_bit_family(
        &self,
        address: &str,
        count: u16,
        implicit: FunctionCode,
    ) -> Result<Vec<bool>, ClientError> {
        let addr = self.resolve(address)?;
        let station = self.read_station_of(&addr)?;
        let function = Self::read_function(&addr, implicit)?;
        let request = Request::ReadBits(ReadBitsRequest::new(function, addr.offset, count)?);

        let mut response_buf = [0u8; FRAME_BUF_LEN];
        let response = self.transact(station, &request, &mut response_buf).await?;
        match response {
            Response::ReadBits(data) => unpack_bits(data.bit_status, usize::from(count)).ok_or(
                ClientError::InvalidResponse("bit payload shorter than requested"),
            ),
            _ => Err(ClientError::InvalidResponse("unexpected function response")),
        }
    }

    /// Read a single coil (FC 01 unless overridden).
    pub async fn read_bit(&self, address: &str) -> Result<bool, ClientError> {
        let bits = self
            .read_bit_family(address, 1, FunctionCode::ReadCoils)
            .await?;
        Ok(bits[0])
    }

    /// Read `count` coils, unpacked LSB-first.
    pub async fn read_bits(&self, address: &str, count: u16) -> Result<Vec<bool>, ClientError> {
        self.read_bit_family(address, count, FunctionCode::ReadCoils)
            .await
    }

    /// Read a single discrete input (FC 02 unless overridden).
    pub async fn read_discrete(&self, address: &str) -> Result<bool, ClientError> {
        let bits = self
            .read_bit_family(address, 1, FunctionCode::ReadDiscreteInputs)
            .await?;
        Ok(bits[0])
    }

    pub async fn read_discretes(
        &self,
        address: &str,
        count: u16,
    ) -> Result<Vec<bool>, ClientError> {
        self.read_bit_family(address, count, FunctionCode::ReadDiscreteInputs)
            .await
    }

    /// Read `quantity` registers as their raw big-endian wire bytes.
    ///
    /// Requests larger than [`READ_CHUNK_REGISTERS`] are split into
    /// sequential exchanges with the offset advancing per chunk; a
    /// failure anywhere discards the partial payload.
    pub async fn read(&self, address: &str, quantity: u16) -> Result<Vec<u8>, ClientError> {
        let addr = self.resolve(address)?;
        let station = self.read_station_of(&addr)?;
        let function = Self::read_function(&addr, FunctionCode::ReadHoldingRegisters)?;
        if quantity == 0 {
            return Err(ClientError::Encode(EncodeError::InvalidQuantity));
        }

        let mut payload = Vec::with_capacity(usize::from(quantity) * 2);
        let mut fetched: u16 = 0;
        while fetched < quantity {
            let chunk = (quantity - fetched).min(READ_CHUNK_REGISTERS);
            let offset = addr
                .offset
                .checked_add(fetched)
                .ok_or(ClientError::Encode(EncodeError::AddressOverflow))?;
            let request =
                Request::ReadRegisters(ReadRegistersRequest::new(function, offset, chunk)?);

            let mut response_buf = [0u8; FRAME_BUF_LEN];
            let response = self.transact(station, &request, &mut response_buf).await?;
            match response {
                Response::ReadRegisters(data) => {
                    if data.register_count() != usize::from(chunk) {
                        return Err(ClientError::InvalidResponse(
                            "register payload length mismatch",
                        ));
                    }
                    payload.extend_from_slice(data.data);
                }
                _ => {
                    return Err(ClientError::InvalidResponse("unexpected function response"))
                }
            }
            fetched += chunk;
        }
        Ok(payload)
    }

    pub async fn read_u16(&self, address: &str) -> Result<u16, ClientError> {
        let bytes = self.read(address, 1).await?;
        Ok(self.options.codec.decode_u16(&bytes)?)
    }

    pub async fn read_i16(&self, address: &str) -> Result<i16, ClientError> {
        let bytes = self.read(address, 1).await?;
        Ok(self.options.codec.decode_i16(&bytes)?)
    }

    pub async fn read_u32(&self, address: &str) -> Result<u32, ClientError> {
        let bytes = self.read(address, 2).await?;
        Ok(self.options.codec.decode_u32(&bytes)?)
    }

    pub async fn read_i32(&self, address: &str) -> Result<i32, ClientError> {
        let bytes = self.read(address, 2).await?;
        Ok(self.options.codec.decode_i32(&bytes)?)
    }

    pub async fn read_f32(&self, address: &str) -> Result<f32, ClientError> {
        let bytes = self.read(address, 2).await?;
        Ok(self.options.codec.decode_f32(&bytes)?)
    }

    pub async fn read_u64(&self, address: &str) -> Result<u64, ClientError> {
        let bytes = self.read(address, 4).await?;
        Ok(self.options.codec.decode_u64(&bytes)?)
    }

    pub async fn read_i64(&self, address: &str) -> Result<i64, ClientError> {
        let bytes = self.read(address, 4).await?;
        Ok(self.options.codec.decode_i64(&bytes)?)
    }

    pub async fn read_f64(&self, address: &str) -> Result<f64, ClientError> {
        let bytes = self.read(address, 4).await?;
        Ok(self.options.codec.decode_f64(&bytes)?)
    }

    fn registers_for(count: u16, words_per_value: u16) -> Result<u16, ClientError> {
        count
            .checked_mul(words_per_value)
            .ok_or(ClientError::Encode(EncodeError::InvalidQuantity))
    }

    pub async fn read_u16_array(&self, address: &str, count: u16) -> Result<Vec<u16>, ClientError> {
        let bytes = self.read(address, count).await?;
        let codec = self.options.codec;
        bytes
            .chunks_exact(2)
            .map(|chunk| codec.decode_u16(chunk).map_err(Into::into))
            .collect()
    }

    pub async fn read_i16_array(&self, address: &str, count: u16) -> Result<Vec<i16>, ClientError> {
        let bytes = self.read(address, count).await?;
        let codec = self.options.codec;
        bytes
            .chunks_exact(2)
            .map(|chunk| codec.decode_i16(chunk).map_err(Into::into))
            .collect()
    }

    pub async fn read_u32_array(&self, address: &str, count: u16) -> Result<Vec<u32>, ClientError> {
        let bytes = self.read(address, Self::registers_for(count, 2)?).await?;
        let codec = self.options.codec;
        bytes
            .chunks_exact(4)
            .map(|chunk| codec.decode_u32(chunk).map_err(Into::into))
            .collect()
    }

    pub async fn read_i32_array(&self, address: &str, count: u16) -> Result<Vec<i32>, ClientError> {
        let bytes = self.read(address, Self::registers_for(count, 2)?).await?;
        let codec = self.options.codec;
        bytes
            .chunks_exact(4)
            .map(|chunk| codec.decode_i32(chunk).map_err(Into::into))
            .collect()
    }

    pub async fn read_f32_array(&self, address: &str, count: u16) -> Result<Vec<f32>, ClientError> {
        let bytes = self.read(address, Self::registers_for(count, 2)?).await?;
        let codec = self.options.codec;
        bytes
            .chunks_exact(4)
            .map(|chunk| codec.decode_f32(chunk).map_err(Into::into))
            .collect()
    }

    pub async fn read_u64_array(&self, address: &str, count: u16) -> Result<Vec<u64>, ClientError> {
        let bytes = self.read(address, Self::registers_for(count, 4)?).await?;
        let codec = self.options.codec;
        bytes
            .chunks_exact(8)
            .map(|chunk| codec.decode_u64(chunk).map_err(Into::into))
            .collect()
    }

    pub async fn read_i64_array(&self, address: &str, count: u16) -> Result<Vec<i64>, ClientError> {
        let bytes = self.read(address, Self::registers_for(count, 4)?).await?;
        let codec = self.options.codec;
        bytes
            .chunks_exact(8)
            .map(|chunk| codec.decode_i64(chunk).map_err(Into::into))
            .collect()
    }

    pub async fn read_f64_array(&self, address: &str, count: u16) -> Result<Vec<f64>, ClientError> {
        let bytes = self.read(address, Self::registers_for(count, 4)?).await?;
        let codec = self.options.codec;
        bytes
            .chunks_exact(8)
            .map(|chunk| codec.decode_f64(chunk).map_err(Into::into))
            .collect()
    }

    /// Read `word_count` registers and transcode them as text.
    pub async fn read_string(
        &self,
        address: &str,
        word_count: u16,
        encoding: TextEncoding,
    ) -> Result<String, ClientError> {
        let bytes = self.read(address, word_count).await?;
        Ok(self.options.codec.decode_text(&bytes, encoding))
    }

    /// Write a single coil (FC 05).
    pub async fn write_bit(&self, address: &str, value: bool) -> Result<(), ClientError> {
        let addr = self.resolve(address)?;
        Self::require_function(&addr, FunctionCode::WriteSingleCoil)?;
        let station = self.station_of(&addr);
        let request = Request::WriteSingleCoil(WriteSingleCoilRequest {
            address: addr.offset,
            value,
        });

        let mut response_buf = [0u8; FRAME_BUF_LEN];
        let response = self.transact(station, &request, &mut response_buf).await?;
        match response {
            Response::WriteSingleCoil(resp)
                if resp.address == addr.offset && resp.value == value =>
            {
                Ok(())
            }
            Response::WriteSingleCoil(_) => {
                Err(ClientError::InvalidResponse("write coil echo mismatch"))
            }
            _ => Err(ClientError::InvalidResponse("unexpected function response")),
        }
    }

    /// Write multiple coils (FC 15), packed LSB-first.
    pub async fn write_bits(&self, address: &str, values: &[bool]) -> Result<(), ClientError> {
        let addr = self.resolve(address)?;
        Self::require_function(&addr, FunctionCode::WriteMultipleCoils)?;
        let station = self.station_of(&addr);
        let request_variant = WriteMultipleCoilsRequest {
            start_address: addr.offset,
            values,
        };
        let expected_quantity = request_variant.quantity()?;
        let request = Request::WriteMultipleCoils(request_variant);

        let mut response_buf = [0u8; FRAME_BUF_LEN];
        let response = self.transact(station, &request, &mut response_buf).await?;
        match response {
            Response::WriteMultiple(resp)
                if resp.start_address == addr.offset && resp.quantity == expected_quantity =>
            {
                Ok(())
            }
            Response::WriteMultiple(_) => {
                Err(ClientError::InvalidResponse("write coils echo mismatch"))
            }
            _ => Err(ClientError::InvalidResponse("unexpected function response")),
        }
    }

    /// Write one register (FC 06) with the byte pair placed directly as
    /// `data_hi`, `data_lo`.
    pub async fn write_register_bytes(
        &self,
        address: &str,
        high: u8,
        low: u8,
    ) -> Result<(), ClientError> {
        let addr = self.resolve(address)?;
        Self::require_function(&addr, FunctionCode::WriteSingleRegister)?;
        let station = self.station_of(&addr);
        let value = u16::from_be_bytes([high, low]);
        let request = Request::WriteSingleRegister(WriteSingleRegisterRequest {
            address: addr.offset,
            value,
        });

        let mut response_buf = [0u8; FRAME_BUF_LEN];
        let response = self.transact(station, &request, &mut response_buf).await?;
        match response {
            Response::WriteSingleRegister(resp)
                if resp.address == addr.offset && resp.value == value =>
            {
                Ok(())
            }
            Response::WriteSingleRegister(_) => {
                Err(ClientError::InvalidResponse("write register echo mismatch"))
            }
            _ => Err(ClientError::InvalidResponse("unexpected function response")),
        }
    }

    /// Write one register from an unsigned value.
    ///
    /// On this path the value's low byte goes out in the `data_hi` slot
    /// and the high byte in `data_lo`. Devices in the field depend on
    /// that order; verify against your hardware before relying on it.
    pub async fn write_register(&self, address: &str, value: u16) -> Result<(), ClientError> {
        let [low, high] = value.to_le_bytes();
        self.write_register_bytes(address, low, high).await
    }

    /// Signed variant of [`write_register`](Self::write_register), with
    /// the same wire order.
    pub async fn write_register_i16(
        &self,
        address: &str,
        value: i16,
    ) -> Result<(), ClientError> {
        self.write_register(address, value as u16).await
    }

    /// Write registers (FC 16) from bytes the caller has already
    /// ordered; `data` must have even length.
    pub async fn write_bytes(&self, address: &str, data: &[u8]) -> Result<(), ClientError> {
        let addr = self.resolve(address)?;
        Self::require_function(&addr, FunctionCode::WriteMultipleRegisters)?;
        let station = self.station_of(&addr);
        let request_variant = WriteMultipleRegistersRequest {
            start_address: addr.offset,
            data,
        };
        let expected_quantity = request_variant.quantity()?;
        let request = Request::WriteMultipleRegisters(request_variant);

        let mut response_buf = [0u8; FRAME_BUF_LEN];
        let response = self.transact(station, &request, &mut response_buf).await?;
        match response {
            Response::WriteMultiple(resp)
                if resp.start_address == addr.offset && resp.quantity == expected_quantity =>
            {
                Ok(())
            }
            Response::WriteMultiple(_) => {
                Err(ClientError::InvalidResponse("write registers echo mismatch"))
            }
            _ => Err(ClientError::InvalidResponse("unexpected function response")),
        }
    }

    pub async fn write_u16s(&self, address: &str, values: &[u16]) -> Result<(), ClientError> {
        let codec = self.options.codec;
        let mut data = Vec::with_capacity(values.len() * 2);
        for value in values {
            data.extend_from_slice(&codec.encode_u16(*value));
        }
        self.write_bytes(address, &data).await
    }

    pub async fn write_i16s(&self, address: &str, values: &[i16]) -> Result<(), ClientError> {
        let codec = self.options.codec;
        let mut data = Vec::with_capacity(values.len() * 2);
        for value in values {
            data.extend_from_slice(&codec.encode_i16(*value));
        }
        self.write_bytes(address, &data).await
    }

    pub async fn write_u32s(&self, address: &str, values: &[u32]) -> Result<(), ClientError> {
        let codec = self.options.codec;
        let mut data = Vec::with_capacity(values.len() * 4);
        for value in values {
            data.extend_from_slice(&codec.encode_u32(*value));
        }
        self.write_bytes(address, &data).await
    }

    pub async fn write_i32s(&self, address: &str, values: &[i32]) -> Result<(), ClientError> {
        let codec = self.options.codec;
        let mut data = Vec::with_capacity(values.len() * 4);
        for value in values {
            data.extend_from_slice(&codec.encode_i32(*value));
        }
        self.write_bytes(address, &data).await
    }

    pub async fn write_f32s(&self, address: &str, values: &[f32]) -> Result<(), ClientError> {
        let codec = self.options.codec;
        let mut data = Vec::with_capacity(values.len() * 4);
        for value in values {
            data.extend_from_slice(&codec.encode_f32(*value));
        }
        self.write_bytes(address, &data).await
    }

    pub async fn write_u64s(&self, address: &str, values: &[u64]) -> Result<(), ClientError> {
        let codec = self.options.codec;
        let mut data = Vec::with_capacity(values.len() * 8);
        for value in values {
            data.extend_from_slice(&codec.encode_u64(*value));
        }
        self.write_bytes(address, &data).await
    }

    pub async fn write_i64s(&self, address: &str, values: &[i64]) -> Result<(), ClientError> {
        let codec = self.options.codec;
        let mut data = Vec::with_capacity(values.len() * 8);
        for value in values {
            data.extend_from_slice(&codec.encode_i64(*value));
        }
        self.write_bytes(address, &data).await
    }

    pub async fn write_f64s(&self, address: &str, values: &[f64]) -> Result<(), ClientError> {
        let codec = self.options.codec;
        let mut data = Vec::with_capacity(values.len() * 8);
        for value in values {
            data.extend_from_slice(&codec.encode_f64(*value));
        }
        self.write_bytes(address, &data).await
    }

    /// Transcode `text` through the codec and write it (FC 16).
    pub async fn write_string(
        &self,
        address: &str,
        text: &str,
        encoding: TextEncoding,
        fixed_len: Option<usize>,
    ) -> Result<(), ClientError> {
        let data = self.options.codec.encode_text(text, encoding, fixed_len);
        self.write_bytes(address, &data).await
    }
}
