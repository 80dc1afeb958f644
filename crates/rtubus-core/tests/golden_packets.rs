use rtubus_core::frame::rtu;
use rtubus_core::pdu::{
    ExceptionCode, FunctionCode, PduBuffer, PduCursor, ReadRegistersRequest, Request, Response,
    WriteSingleCoilRequest,
};
use rtubus_core::transform::WordCodec;

const READ_100_FRAME: &[u8] = &[0x01, 0x03, 0x00, 0x64, 0x00, 0x01, 0xC5, 0xD5];

fn frame_for(station: u8, pdu: &[u8]) -> Vec<u8> {
    rtu::RtuFrame::build(station, pdu)
        .unwrap()
        .as_bytes()
        .to_vec()
}

#[test]
fn fc03_request_golden_frame() {
    let request = Request::ReadRegisters(
        ReadRegistersRequest::new(FunctionCode::ReadHoldingRegisters, 100, 1).unwrap(),
    );

    let mut pdu = PduBuffer::new();
    request.encode(&mut pdu).unwrap();

    let frame = frame_for(1, pdu.as_bytes());
    assert_eq!(frame, READ_100_FRAME);
}

#[test]
fn fc05_request_golden_frame() {
    let request = Request::WriteSingleCoil(WriteSingleCoilRequest {
        address: 10,
        value: true,
    });

    let mut pdu = PduBuffer::new();
    request.encode(&mut pdu).unwrap();

    let frame = frame_for(2, pdu.as_bytes());
    assert_eq!(&frame[..6], &[0x02, 0x05, 0x00, 0x0A, 0xFF, 0x00]);
    assert!(rtu::crc_valid(&frame));
}

#[test]
fn fc03_response_through_codec() {
    let frame = frame_for(1, &[0x03, 0x02, 0x12, 0x34]);
    let (station, pdu) = rtu::decode_response_frame(&frame, 0x03).unwrap();
    assert_eq!(station, 1);

    let mut cursor = PduCursor::new(pdu);
    let payload = match Response::decode(&mut cursor).unwrap() {
        Response::ReadRegisters(resp) => resp.data,
        other => panic!("unexpected response: {other:?}"),
    };

    assert_eq!(WordCodec::default().decode_i16(payload).unwrap(), 0x3412);
    assert_eq!(
        WordCodec::new(false, false, false)
            .decode_i16(payload)
            .unwrap(),
        0x1234
    );
}

#[test]
fn exception_frame_carries_code_and_description() {
    let frame = frame_for(1, &[0x83, 0x02]);
    match rtu::decode_response_frame(&frame, 0x03).unwrap_err() {
        rtu::FrameError::Exception(ex) => {
            assert_eq!(ex.exception_code, ExceptionCode::IllegalDataAddress);
            assert_eq!(ex.exception_code.as_u8(), 0x02);
            assert_eq!(ex.exception_code.description(), "Illegal data address");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn corrupted_response_fails_crc() {
    let mut frame = frame_for(1, &[0x01, 0x01, 0x01]);
    frame[3] ^= 0x40;
    assert_eq!(
        rtu::decode_response_frame(&frame, 0x01).unwrap_err(),
        rtu::FrameError::CrcMismatch
    );
}

#[test]
fn quantity_boundaries_are_validated() {
    use rtubus_core::EncodeError;

    for quantity in [0u16, 126] {
        let req =
            ReadRegistersRequest::new(FunctionCode::ReadHoldingRegisters, 0, quantity).unwrap();
        let mut pdu = PduBuffer::new();
        assert_eq!(req.encode(&mut pdu).unwrap_err(), EncodeError::InvalidQuantity);
    }

    let req = ReadRegistersRequest::new(FunctionCode::ReadHoldingRegisters, 0, 125).unwrap();
    let mut pdu = PduBuffer::new();
    req.encode(&mut pdu).unwrap();
}
