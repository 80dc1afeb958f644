use crate::pdu::wire::{PduBuffer, PduCursor};
use crate::pdu::{ExceptionResponse, FunctionCode};
use crate::{DecodeError, EncodeError};

use super::request::{quantity_in_range, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS};

/// Packed-bit payload answering FC 01 or FC 02.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBitsResponse<'a> {
    pub function: FunctionCode,
    pub bit_status: &'a [u8],
}

impl<'a> ReadBitsResponse<'a> {
    fn decode_body(function: FunctionCode, cursor: &mut PduCursor<'a>) -> Result<Self, DecodeError> {
        let byte_count = usize::from(cursor.take_u8()?);
        if byte_count == 0 {
            return Err(DecodeError::InvalidLength);
        }
        Ok(Self {
            function,
            bit_status: cursor.take_blob(byte_count)?,
        })
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        let byte_count: u8 = self
            .bit_status
            .len()
            .try_into()
            .map_err(|_| EncodeError::InvalidLength)?;
        pdu.push_u8(self.function.as_u8())?;
        pdu.push_u8(byte_count)?;
        pdu.push_bytes(self.bit_status)?;
        Ok(())
    }

    pub fn bit(&self, index: usize) -> Option<bool> {
        let byte = self.bit_status.get(index / 8)?;
        Some((byte >> (index % 8)) & 1 != 0)
    }
}

/// Register payload answering FC 03 or FC 04; `data` is the raw
/// big-endian word stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRegistersResponse<'a> {
    pub function: FunctionCode,
    pub data: &'a [u8],
}

impl<'a> ReadRegistersResponse<'a> {
    fn decode_body(function: FunctionCode, cursor: &mut PduCursor<'a>) -> Result<Self, DecodeError> {
        let byte_count = usize::from(cursor.take_u8()?);
        if byte_count == 0
            || (byte_count % 2) != 0
            || byte_count > usize::from(MAX_READ_REGISTERS) * 2
        {
            return Err(DecodeError::InvalidLength);
        }
        Ok(Self {
            function,
            data: cursor.take_blob(byte_count)?,
        })
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        if (self.data.len() % 2) != 0 {
            return Err(EncodeError::InvalidLength);
        }
        let byte_count: u8 = self
            .data
            .len()
            .try_into()
            .map_err(|_| EncodeError::InvalidLength)?;
        pdu.push_u8(self.function.as_u8())?;
        pdu.push_u8(byte_count)?;
        pdu.push_bytes(self.data)?;
        Ok(())
    }

    pub fn register_count(&self) -> usize {
        self.data.len() / 2
    }

    pub fn register(&self, index: usize) -> Option<u16> {
        self.data
            .chunks_exact(2)
            .nth(index)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
    }
}

/// FC 05 echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSingleCoilResponse {
    pub address: u16,
    pub value: bool,
}

impl WriteSingleCoilResponse {
    fn decode_body(cursor: &mut PduCursor<'_>) -> Result<Self, DecodeError> {
        let address = cursor.take_word()?;
        let value = match cursor.take_word()? {
            0xFF00 => true,
            0x0000 => false,
            _ => return Err(DecodeError::InvalidValue),
        };
        Ok(Self { address, value })
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        pdu.push_u8(FunctionCode::WriteSingleCoil.as_u8())?;
        pdu.push_word(self.address)?;
        pdu.push_word(if self.value { 0xFF00 } else { 0x0000 })?;
        Ok(())
    }
}

/// FC 06 echo; `value` is the raw echoed byte pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSingleRegisterResponse {
    pub address: u16,
    pub value: u16,
}

impl WriteSingleRegisterResponse {
    fn decode_body(cursor: &mut PduCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            address: cursor.take_word()?,
            value: cursor.take_word()?,
        })
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        pdu.push_u8(FunctionCode::WriteSingleRegister.as_u8())?;
        pdu.push_word(self.address)?;
        pdu.push_word(self.value)?;
        Ok(())
    }
}

/// FC 15 / FC 16 echo of the written range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMultipleResponse {
    pub function: FunctionCode,
    pub start_address: u16,
    pub quantity: u16,
}

impl WriteMultipleResponse {
    fn decode_body(function: FunctionCode, cursor: &mut PduCursor<'_>) -> Result<Self, DecodeError> {
        let start_address = cursor.take_word()?;
        let quantity = cursor.take_word()?;
        let max = match function {
            FunctionCode::WriteMultipleCoils => MAX_WRITE_COILS,
            _ => MAX_WRITE_REGISTERS,
        };
        if !quantity_in_range(quantity, max) {
            return Err(DecodeError::InvalidValue);
        }
        Ok(Self {
            function,
            start_address,
            quantity,
        })
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        pdu.push_u8(self.function.as_u8())?;
        pdu.push_word(self.start_address)?;
        pdu.push_word(self.quantity)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    ReadBits(ReadBitsResponse<'a>),
    ReadRegisters(ReadRegistersResponse<'a>),
    WriteSingleCoil(WriteSingleCoilResponse),
    WriteSingleRegister(WriteSingleRegisterResponse),
    WriteMultiple(WriteMultipleResponse),
    Exception(ExceptionResponse),
}

impl<'a> Response<'a> {
    pub fn decode(cursor: &mut PduCursor<'a>) -> Result<Self, DecodeError> {
        let function_byte = cursor.take_u8()?;
        if FunctionCode::is_exception(function_byte) {
            return Ok(Self::Exception(ExceptionResponse::decode(
                function_byte,
                cursor,
            )?));
        }

        let function = FunctionCode::from_u8(function_byte)?;
        match function {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => Ok(Self::ReadBits(
                ReadBitsResponse::decode_body(function, cursor)?,
            )),
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => Ok(
                Self::ReadRegisters(ReadRegistersResponse::decode_body(function, cursor)?),
            ),
            FunctionCode::WriteSingleCoil => Ok(Self::WriteSingleCoil(
                WriteSingleCoilResponse::decode_body(cursor)?,
            )),
            FunctionCode::WriteSingleRegister => Ok(Self::WriteSingleRegister(
                WriteSingleRegisterResponse::decode_body(cursor)?,
            )),
            FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => Ok(
                Self::WriteMultiple(WriteMultipleResponse::decode_body(function, cursor)?),
            ),
        }
    }

    pub fn encode(&self, pdu: &mut PduBuffer) -> Result<(), EncodeError> {
        match self {
            Self::ReadBits(resp) => resp.encode(pdu),
            Self::ReadRegisters(resp) => resp.encode(pdu),
            Self::WriteSingleCoil(resp) => resp.encode(pdu),
            Self::WriteSingleRegister(resp) => resp.encode(pdu),
            Self::WriteMultiple(resp) => resp.encode(pdu),
            Self::Exception(resp) => resp.encode(pdu),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadRegistersResponse, Response};
    use crate::pdu::wire::{PduBuffer, PduCursor};
    use crate::pdu::{ExceptionCode, FunctionCode};
    use crate::DecodeError;

    #[test]
    fn decode_fc03_payload() {
        let mut cursor = PduCursor::new(&[0x03, 0x04, 0x12, 0x34, 0xAB, 0xCD]);
        match Response::decode(&mut cursor).unwrap() {
            Response::ReadRegisters(resp) => {
                assert_eq!(resp.function, FunctionCode::ReadHoldingRegisters);
                assert_eq!(resp.register_count(), 2);
                assert_eq!(resp.register(0), Some(0x1234));
                assert_eq!(resp.register(1), Some(0xABCD));
                assert_eq!(resp.register(2), None);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(cursor.finished());
    }

    #[test]
    fn decode_fc01_payload_bits() {
        let mut cursor = PduCursor::new(&[0x01, 0x01, 0b0000_0101]);
        match Response::decode(&mut cursor).unwrap() {
            Response::ReadBits(resp) => {
                assert_eq!(resp.bit(0), Some(true));
                assert_eq!(resp.bit(1), Some(false));
                assert_eq!(resp.bit(2), Some(true));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_odd_register_byte_count() {
        let mut cursor = PduCursor::new(&[0x03, 0x03, 0x12, 0x34, 0x56]);
        assert_eq!(
            Response::decode(&mut cursor).unwrap_err(),
            DecodeError::InvalidLength
        );
    }

    #[test]
    fn decode_exception_response() {
        let mut cursor = PduCursor::new(&[0x83, 0x02]);
        match Response::decode(&mut cursor).unwrap() {
            Response::Exception(ex) => {
                assert_eq!(ex.function_code, 0x03);
                assert_eq!(ex.exception_code, ExceptionCode::IllegalDataAddress);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn encode_decode_roundtrip_fc04() {
        let resp = ReadRegistersResponse {
            function: FunctionCode::ReadInputRegisters,
            data: &[0x00, 0x2A],
        };
        let mut pdu = PduBuffer::new();
        resp.encode(&mut pdu).unwrap();
        assert_eq!(pdu.as_bytes(), &[0x04, 0x02, 0x00, 0x2A]);

        let mut cursor = PduCursor::new(pdu.as_bytes());
        let decoded = Response::decode(&mut cursor).unwrap();
        assert_eq!(decoded, Response::ReadRegisters(resp));
    }

    #[test]
    fn write_echoes_roundtrip() {
        let mut pdu = PduBuffer::new();
        let coil = super::WriteSingleCoilResponse {
            address: 0x000A,
            value: true,
        };
        coil.encode(&mut pdu).unwrap();
        assert_eq!(pdu.as_bytes(), &[0x05, 0x00, 0x0A, 0xFF, 0x00]);

        let mut pdu = PduBuffer::new();
        let multi = super::WriteMultipleResponse {
            function: FunctionCode::WriteMultipleRegisters,
            start_address: 0x0001,
            quantity: 2,
        };
        multi.encode(&mut pdu).unwrap();
        let mut cursor = PduCursor::new(pdu.as_bytes());
        assert_eq!(
            Response::decode(&mut cursor).unwrap(),
            Response::WriteMultiple(multi)
        );
    }
}
