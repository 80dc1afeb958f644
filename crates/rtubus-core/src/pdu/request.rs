use crate::pdu::wire::{PduBuffer, PduCursor};
use crate::pdu::FunctionCode;
use crate::transform::pack_bits_into;
use crate::{DecodeError, EncodeError};

pub const MAX_READ_BITS: u16 = 2000;
pub const MAX_READ_REGISTERS: u16 = 125;
pub const MAX_WRITE_COILS: u16 = 1968;
pub const MAX_WRITE_REGISTERS: u16 = 123;

pub(crate) fn quantity_in_range(quantity: u16, max: u16) -> bool {
    quantity >= 1 && quantity <= max
}

/// The addressed range must stay within the 16-bit register space.
fn check_span(start_address: u16, quantity: u16) -> Result<(), EncodeError> {
    let last = u32::from(start_address) + u32::from(quantity) - 1;
    if last > 0xFFFF {
        return Err(EncodeError::AddressOverflow);
    }
    Ok(())
}

fn push_read_header(
    pdu: &mut PduBuffer,
    function: FunctionCode,
    start_address: u16,
    quantity: u16,
    max_quantity: u16,
) -> Result<(), EncodeError> {
    if !quantity_in_range(quantity, max_quantity) {
        return Err(EncodeError::InvalidQuantity);
    }
    check_span(start_address, quantity)?;
    pdu.push_u8(function.as_u8())?;
    pdu.push_word(start_address)?;
    pdu.push_word(quantity)?;
    Ok(())
}

/// Read request for coils (FC 01) or discrete inputs (FC 02).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBitsRequest {
    function: FunctionCode,
    pub start_address: u16,
    pub quantity: u16,
}

impl ReadBitsRequest {
    pub fn new(
        function: FunctionCode,
        start_address: u16,
        quantity: u16,
    ) -> Result<Self, EncodeError> {
        if !function.is_bit_read() {
            return Err(EncodeError::UnsupportedFunction(function.as_u8()));
        }
        Ok(Self {
            function,
            start_address,
            quantity,
        })
    }

    pub const fn function(&self) -> FunctionCode {
        self.function
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        push_read_header(
            pdu,
            self.function,
            self.start_address,
            self.quantity,
            MAX_READ_BITS,
        )
    }
}

/// Read request for holding registers (FC 03) or input registers (FC 04).
///
/// Accepting both codes lets a function-code override steer one typed read
/// path at either register table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRegistersRequest {
    function: FunctionCode,
    pub start_address: u16,
    pub quantity: u16,
}

impl ReadRegistersRequest {
    pub fn new(
        function: FunctionCode,
        start_address: u16,
        quantity: u16,
    ) -> Result<Self, EncodeError> {
        if !function.is_register_read() {
            return Err(EncodeError::UnsupportedFunction(function.as_u8()));
        }
        Ok(Self {
            function,
            start_address,
            quantity,
        })
    }

    pub const fn function(&self) -> FunctionCode {
        self.function
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        push_read_header(
            pdu,
            self.function,
            self.start_address,
            self.quantity,
            MAX_READ_REGISTERS,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSingleCoilRequest {
    pub address: u16,
    pub value: bool,
}

impl WriteSingleCoilRequest {
    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        pdu.push_u8(FunctionCode::WriteSingleCoil.as_u8())?;
        pdu.push_word(self.address)?;
        pdu.push_word(if self.value { 0xFF00 } else { 0x0000 })?;
        Ok(())
    }
}

/// FC 06. `value` carries the caller-supplied byte pair: the high byte of
/// `value` goes out as `data_hi`, the low byte as `data_lo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSingleRegisterRequest {
    pub address: u16,
    pub value: u16,
}

impl WriteSingleRegisterRequest {
    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        pdu.push_u8(FunctionCode::WriteSingleRegister.as_u8())?;
        pdu.push_word(self.address)?;
        pdu.push_word(self.value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMultipleCoilsRequest<'a> {
    pub start_address: u16,
    pub values: &'a [bool],
}

impl<'a> WriteMultipleCoilsRequest<'a> {
    pub fn quantity(&self) -> Result<u16, EncodeError> {
        let quantity: u16 = self
            .values
            .len()
            .try_into()
            .map_err(|_| EncodeError::InvalidQuantity)?;
        if !quantity_in_range(quantity, MAX_WRITE_COILS) {
            return Err(EncodeError::InvalidQuantity);
        }
        Ok(quantity)
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        let quantity = self.quantity()?;
        check_span(self.start_address, quantity)?;
        let byte_count = self.values.len().div_ceil(8);

        pdu.push_u8(FunctionCode::WriteMultipleCoils.as_u8())?;
        pdu.push_word(self.start_address)?;
        pdu.push_word(quantity)?;
        pdu.push_u8(byte_count as u8)?;

        let mut packed = [0u8; 246];
        pack_bits_into(self.values, &mut packed[..byte_count]);
        pdu.push_bytes(&packed[..byte_count])?;
        Ok(())
    }
}

/// FC 16. `data` is the register payload as already byte-ordered wire
/// bytes; it must have even length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMultipleRegistersRequest<'a> {
    pub start_address: u16,
    pub data: &'a [u8],
}

impl<'a> WriteMultipleRegistersRequest<'a> {
    pub fn quantity(&self) -> Result<u16, EncodeError> {
        if self.data.len() % 2 != 0 {
            return Err(EncodeError::InvalidLength);
        }
        let quantity: u16 = (self.data.len() / 2)
            .try_into()
            .map_err(|_| EncodeError::InvalidQuantity)?;
        if !quantity_in_range(quantity, MAX_WRITE_REGISTERS) {
            return Err(EncodeError::InvalidQuantity);
        }
        Ok(quantity)
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        let quantity = self.quantity()?;
        check_span(self.start_address, quantity)?;

        pdu.push_u8(FunctionCode::WriteMultipleRegisters.as_u8())?;
        pdu.push_word(self.start_address)?;
        pdu.push_word(quantity)?;
        pdu.push_u8(self.data.len() as u8)?;
        pdu.push_bytes(self.data)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    ReadBits(ReadBitsRequest),
    ReadRegisters(ReadRegistersRequest),
    WriteSingleCoil(WriteSingleCoilRequest),
    WriteSingleRegister(WriteSingleRegisterRequest),
    WriteMultipleCoils(WriteMultipleCoilsRequest<'a>),
    WriteMultipleRegisters(WriteMultipleRegistersRequest<'a>),
}

impl<'a> Request<'a> {
    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        match self {
            Self::ReadBits(req) => req.encode(pdu),
            Self::ReadRegisters(req) => req.encode(pdu),
            Self::WriteSingleCoil(req) => req.encode(pdu),
            Self::WriteSingleRegister(req) => req.encode(pdu),
            Self::WriteMultipleCoils(req) => req.encode(pdu),
            Self::WriteMultipleRegisters(req) => req.encode(pdu),
        }
    }

    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadBits(req) => req.function(),
            Self::ReadRegisters(req) => req.function(),
            Self::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleCoils(_) => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
        }
    }
}

/// Borrowed FC 15 payload as decoded off the wire: `quantity` bits packed
/// LSB-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoilWritePayload<'a> {
    pub start_address: u16,
    pub quantity: u16,
    packed: &'a [u8],
}

impl<'a> CoilWritePayload<'a> {
    /// The written bits in address order; always yields exactly
    /// `quantity` items (the byte count is validated during decode).
    pub fn bits(&self) -> impl Iterator<Item = bool> + 'a {
        let packed = self.packed;
        (0..usize::from(self.quantity))
            .map(move |i| packed.get(i / 8).is_some_and(|byte| (byte >> (i % 8)) & 1 != 0))
    }
}

/// Borrowed FC 16 payload as decoded off the wire: registers as
/// big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWritePayload<'a> {
    pub start_address: u16,
    data: &'a [u8],
}

impl<'a> RegisterWritePayload<'a> {
    pub fn count(&self) -> usize {
        self.data.len() / 2
    }

    /// The written register values in address order.
    pub fn words(&self) -> impl Iterator<Item = u16> + 'a {
        self.data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
    }
}

/// Decoded request model used by the in-memory simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedRequest<'a> {
    ReadBits(ReadBitsRequest),
    ReadRegisters(ReadRegistersRequest),
    WriteSingleCoil(WriteSingleCoilRequest),
    WriteSingleRegister(WriteSingleRegisterRequest),
    WriteMultipleCoils(CoilWritePayload<'a>),
    WriteMultipleRegisters(RegisterWritePayload<'a>),
}

impl<'a> DecodedRequest<'a> {
    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadBits(req) => req.function(),
            Self::ReadRegisters(req) => req.function(),
            Self::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleCoils(_) => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
        }
    }

    pub fn decode(cursor: &mut PduCursor<'a>) -> Result<Self, DecodeError> {
        let function = FunctionCode::from_u8(cursor.take_u8()?)?;
        match function {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                let start_address = cursor.take_word()?;
                let quantity = cursor.take_word()?;
                if !quantity_in_range(quantity, MAX_READ_BITS) {
                    return Err(DecodeError::InvalidValue);
                }
                let req = ReadBitsRequest::new(function, start_address, quantity)
                    .map_err(|_| DecodeError::InvalidFunctionCode)?;
                Ok(Self::ReadBits(req))
            }
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
                let start_address = cursor.take_word()?;
                let quantity = cursor.take_word()?;
                if !quantity_in_range(quantity, MAX_READ_REGISTERS) {
                    return Err(DecodeError::InvalidValue);
                }
                let req = ReadRegistersRequest::new(function, start_address, quantity)
                    .map_err(|_| DecodeError::InvalidFunctionCode)?;
                Ok(Self::ReadRegisters(req))
            }
            FunctionCode::WriteSingleCoil => {
                let address = cursor.take_word()?;
                let value = match cursor.take_word()? {
                    0xFF00 => true,
                    0x0000 => false,
                    _ => return Err(DecodeError::InvalidValue),
                };
                Ok(Self::WriteSingleCoil(WriteSingleCoilRequest {
                    address,
                    value,
                }))
            }
            FunctionCode::WriteSingleRegister => {
                let address = cursor.take_word()?;
                let value = cursor.take_word()?;
                Ok(Self::WriteSingleRegister(WriteSingleRegisterRequest {
                    address,
                    value,
                }))
            }
            FunctionCode::WriteMultipleCoils => {
                let start_address = cursor.take_word()?;
                let quantity = cursor.take_word()?;
                if !quantity_in_range(quantity, MAX_WRITE_COILS) {
                    return Err(DecodeError::InvalidValue);
                }
                let byte_count = usize::from(cursor.take_u8()?);
                if byte_count != usize::from(quantity).div_ceil(8) {
                    return Err(DecodeError::InvalidLength);
                }
                let packed = cursor.take_blob(byte_count)?;
                Ok(Self::WriteMultipleCoils(CoilWritePayload {
                    start_address,
                    quantity,
                    packed,
                }))
            }
            FunctionCode::WriteMultipleRegisters => {
                let start_address = cursor.take_word()?;
                let quantity = cursor.take_word()?;
                if !quantity_in_range(quantity, MAX_WRITE_REGISTERS) {
                    return Err(DecodeError::InvalidValue);
                }
                let byte_count = usize::from(cursor.take_u8()?);
                if byte_count != usize::from(quantity) * 2 {
                    return Err(DecodeError::InvalidLength);
                }
                let data = cursor.take_blob(byte_count)?;
                Ok(Self::WriteMultipleRegisters(RegisterWritePayload {
                    start_address,
                    data,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DecodedRequest, ReadBitsRequest, ReadRegistersRequest, Request, WriteMultipleCoilsRequest,
        WriteMultipleRegistersRequest,
    };
    use crate::pdu::wire::{PduBuffer, PduCursor};
    use crate::pdu::FunctionCode;
    use crate::{DecodeError, EncodeError};

    #[test]
    fn read_registers_validates_quantity() {
        for quantity in [0u16, 126] {
            let req =
                ReadRegistersRequest::new(FunctionCode::ReadHoldingRegisters, 0, quantity)
                    .unwrap();
            let mut pdu = PduBuffer::new();
            assert_eq!(
                req.encode(&mut pdu).unwrap_err(),
                EncodeError::InvalidQuantity
            );
        }
    }

    #[test]
    fn read_requests_reject_foreign_function_codes() {
        assert_eq!(
            ReadRegistersRequest::new(FunctionCode::ReadCoils, 0, 1).unwrap_err(),
            EncodeError::UnsupportedFunction(0x01)
        );
        assert_eq!(
            ReadBitsRequest::new(FunctionCode::ReadHoldingRegisters, 0, 1).unwrap_err(),
            EncodeError::UnsupportedFunction(0x03)
        );
    }

    #[test]
    fn read_requests_accept_both_codes_of_a_family() {
        for fc in [
            FunctionCode::ReadHoldingRegisters,
            FunctionCode::ReadInputRegisters,
        ] {
            let req = ReadRegistersRequest::new(fc, 0x0064, 1).unwrap();
            let mut pdu = PduBuffer::new();
            req.encode(&mut pdu).unwrap();
            assert_eq!(pdu.as_bytes(), &[fc.as_u8(), 0x00, 0x64, 0x00, 0x01]);
        }
    }

    #[test]
    fn span_overflow_is_rejected() {
        let req =
            ReadRegistersRequest::new(FunctionCode::ReadHoldingRegisters, 0xFFF0, 17).unwrap();
        let mut pdu = PduBuffer::new();
        assert_eq!(
            req.encode(&mut pdu).unwrap_err(),
            EncodeError::AddressOverflow
        );

        // Last register exactly at 0xFFFF is fine.
        let req =
            ReadRegistersRequest::new(FunctionCode::ReadHoldingRegisters, 0xFFF0, 16).unwrap();
        let mut pdu = PduBuffer::new();
        req.encode(&mut pdu).unwrap();
    }

    #[test]
    fn write_multiple_coils_packs_lsb_first() {
        let req = WriteMultipleCoilsRequest {
            start_address: 0x0013,
            values: &[true, false, true, true, false, false, true, false, true],
        };
        let mut pdu = PduBuffer::new();
        req.encode(&mut pdu).unwrap();
        assert_eq!(
            pdu.as_bytes(),
            &[0x0F, 0x00, 0x13, 0x00, 0x09, 0x02, 0b0100_1101, 0b0000_0001]
        );
    }

    #[test]
    fn write_multiple_registers_carries_raw_bytes() {
        let req = WriteMultipleRegistersRequest {
            start_address: 0x0001,
            data: &[0x12, 0x34, 0xAB, 0xCD],
        };
        let mut pdu = PduBuffer::new();
        req.encode(&mut pdu).unwrap();
        assert_eq!(
            pdu.as_bytes(),
            &[0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x12, 0x34, 0xAB, 0xCD]
        );
    }

    #[test]
    fn write_multiple_registers_rejects_odd_and_oversized_payloads() {
        let odd = WriteMultipleRegistersRequest {
            start_address: 0,
            data: &[0x12, 0x34, 0x56],
        };
        let mut pdu = PduBuffer::new();
        assert_eq!(odd.encode(&mut pdu).unwrap_err(), EncodeError::InvalidLength);

        let too_many = [0u8; 124 * 2];
        let req = WriteMultipleRegistersRequest {
            start_address: 0,
            data: &too_many,
        };
        let mut pdu = PduBuffer::new();
        assert_eq!(
            req.encode(&mut pdu).unwrap_err(),
            EncodeError::InvalidQuantity
        );
    }

    #[test]
    fn enum_dispatch_works() {
        let req = Request::ReadRegisters(
            ReadRegistersRequest::new(FunctionCode::ReadHoldingRegisters, 0x006B, 3).unwrap(),
        );
        let mut pdu = PduBuffer::new();
        req.encode(&mut pdu).unwrap();
        assert_eq!(pdu.as_bytes(), &[0x03, 0x00, 0x6B, 0x00, 0x03]);
        assert_eq!(req.function_code(), FunctionCode::ReadHoldingRegisters);
    }

    #[test]
    fn decode_fc03_request() {
        let mut cursor = PduCursor::new(&[0x03, 0x00, 0x6B, 0x00, 0x03]);
        let decoded = DecodedRequest::decode(&mut cursor).unwrap();
        match decoded {
            DecodedRequest::ReadRegisters(req) => {
                assert_eq!(req.function(), FunctionCode::ReadHoldingRegisters);
                assert_eq!(req.start_address, 0x006B);
                assert_eq!(req.quantity, 3);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(cursor.finished());
    }

    #[test]
    fn decode_fc15_request_and_bits() {
        let mut cursor =
            PduCursor::new(&[0x0F, 0x00, 0x13, 0x00, 0x09, 0x02, 0b0100_1101, 0b0000_0001]);
        let decoded = DecodedRequest::decode(&mut cursor).unwrap();
        match decoded {
            DecodedRequest::WriteMultipleCoils(payload) => {
                assert_eq!(payload.start_address, 0x0013);
                assert_eq!(payload.quantity, 9);
                let bits: Vec<bool> = payload.bits().collect();
                assert_eq!(
                    bits,
                    vec![true, false, true, true, false, false, true, false, true]
                );
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn decode_fc16_request_and_words() {
        let mut cursor = PduCursor::new(&[0x10, 0x00, 0x20, 0x00, 0x02, 0x04, 0x11, 0x11, 0x22, 0x22]);
        match DecodedRequest::decode(&mut cursor).unwrap() {
            DecodedRequest::WriteMultipleRegisters(payload) => {
                assert_eq!(payload.start_address, 0x0020);
                assert_eq!(payload.count(), 2);
                let words: Vec<u16> = payload.words().collect();
                assert_eq!(words, vec![0x1111, 0x2222]);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_invalid_fc16_byte_count() {
        let mut cursor = PduCursor::new(&[0x10, 0x00, 0x00, 0x00, 0x02, 0x03, 0x12, 0x34, 0x56]);
        assert_eq!(
            DecodedRequest::decode(&mut cursor).unwrap_err(),
            DecodeError::InvalidLength
        );
    }

    #[test]
    fn decode_rejects_invalid_single_coil_value() {
        let mut cursor = PduCursor::new(&[0x05, 0x00, 0x01, 0x12, 0x34]);
        assert_eq!(
            DecodedRequest::decode(&mut cursor).unwrap_err(),
            DecodeError::InvalidValue
        );
    }
}
