use proptest::prelude::*;
use rtubus_core::address;
use rtubus_core::frame::rtu;
use rtubus_core::pdu::{PduCursor, Response};
use rtubus_core::transform::{pack_bits, unpack_bits, TextEncoding, WordCodec};

fn any_codec() -> impl Strategy<Value = WordCodec> {
    (any::<bool>(), any::<bool>(), any::<bool>())
        .prop_map(|(w, m, s)| WordCodec::new(w, m, s))
}

proptest! {
    #[test]
    fn scalar_roundtrips_hold_for_every_policy(
        codec in any_codec(),
        a in any::<u16>(),
        b in any::<i32>(),
        c in any::<u64>(),
        bits32 in any::<u32>(),
        bits64 in any::<u64>(),
    ) {
        prop_assert_eq!(codec.decode_u16(&codec.encode_u16(a)).unwrap(), a);
        prop_assert_eq!(codec.decode_i32(&codec.encode_i32(b)).unwrap(), b);
        prop_assert_eq!(codec.decode_u64(&codec.encode_u64(c)).unwrap(), c);

        // Compare floats by bit pattern so NaNs also roundtrip.
        let f = f32::from_bits(bits32);
        prop_assert_eq!(
            codec.decode_f32(&codec.encode_f32(f)).unwrap().to_bits(),
            f.to_bits()
        );
        let d = f64::from_bits(bits64);
        prop_assert_eq!(
            codec.decode_f64(&codec.encode_f64(d)).unwrap().to_bits(),
            d.to_bits()
        );
    }

    #[test]
    fn ascii_text_roundtrips_when_length_preserved(
        codec in any_codec(),
        text in "[ -~]{0,60}",
    ) {
        let bytes = codec.encode_text(&text, TextEncoding::Ascii, None);
        prop_assert_eq!(bytes.len() % 2, 0);
        prop_assert_eq!(codec.decode_text(&bytes, TextEncoding::Ascii), text);
    }

    #[test]
    fn bit_packing_roundtrips(bits in proptest::collection::vec(any::<bool>(), 1..=64)) {
        let packed = pack_bits(&bits);
        prop_assert_eq!(packed.len(), bits.len().div_ceil(8));
        prop_assert_eq!(unpack_bits(&packed, bits.len()).unwrap(), bits);
    }

    #[test]
    fn crc_append_then_verify(station in any::<u8>(), pdu in proptest::collection::vec(any::<u8>(), 2..=64)) {
        let frame = rtu::RtuFrame::build(station, &pdu).unwrap();
        prop_assert!(rtu::crc_valid(frame.as_bytes()));
    }

    #[test]
    fn crc_detects_any_single_bit_flip(
        pdu in proptest::collection::vec(any::<u8>(), 2..=32),
        flip_byte in any::<prop::sample::Index>(),
        flip_bit in 0u8..8,
    ) {
        let mut frame = rtu::RtuFrame::build(1, &pdu).unwrap().as_bytes().to_vec();

        let idx = flip_byte.index(frame.len());
        frame[idx] ^= 1 << flip_bit;
        prop_assert!(!rtu::crc_valid(&frame));
    }

    #[test]
    fn random_response_decode_does_not_panic(data in proptest::collection::vec(any::<u8>(), 0..260)) {
        let mut cursor = PduCursor::new(&data);
        let _ = Response::decode(&mut cursor);
    }

    #[test]
    fn address_offsets_parse_back(offset in 0u32..=65535) {
        let expr = offset.to_string();
        let parsed = address::parse(&expr, true).unwrap();
        prop_assert_eq!(u32::from(parsed.offset), offset);

        // Under one-based addressing the same expression lands one lower.
        if offset > 0 {
            let parsed = address::parse(&expr, false).unwrap();
            prop_assert_eq!(u32::from(parsed.offset), offset - 1);
        }
    }
}
