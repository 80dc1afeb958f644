//! In-memory slave used by integration tests.
//!
//! [`InMemorySlave`] answers frames like a single device on the bus:
//! requests addressed to another station get no reply (a timeout), bad
//! request CRCs are rejected, and out-of-range point access produces a
//! proper exception frame. It is a test double, not a server.

use crate::{DataLink, DataLinkError};
use async_trait::async_trait;
use rtubus_core::frame::rtu::RtuFrame;
use rtubus_core::pdu::{
    DecodedRequest, ExceptionCode, ExceptionResponse, FunctionCode, PduBuffer, PduCursor,
};
use rtubus_core::{DecodeError, EncodeError};
use std::ops::Range;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("point address out of range")]
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBank {
    values: Vec<bool>,
}

impl BitBank {
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![false; size],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.values.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<(), SimError> {
        let slot = self.values.get_mut(index).ok_or(SimError::OutOfRange)?;
        *slot = value;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    values: Vec<u16>,
}

impl RegisterBank {
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![0u16; size],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: u16) -> Result<(), SimError> {
        let slot = self.values.get_mut(index).ok_or(SimError::OutOfRange)?;
        *slot = value;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointModel {
    pub coils: BitBank,
    pub discrete_inputs: BitBank,
    pub holding_registers: RegisterBank,
    pub input_registers: RegisterBank,
}

impl PointModel {
    pub fn new(
        coil_count: usize,
        discrete_input_count: usize,
        holding_register_count: usize,
        input_register_count: usize,
    ) -> Self {
        Self {
            coils: BitBank::new(coil_count),
            discrete_inputs: BitBank::new(discrete_input_count),
            holding_registers: RegisterBank::new(holding_register_count),
            input_registers: RegisterBank::new(input_register_count),
        }
    }
}

fn checked_range(start: u16, quantity: u16, len: usize) -> Option<Range<usize>> {
    let start = usize::from(start);
    let end = start.checked_add(usize::from(quantity))?;
    if end > len {
        return None;
    }
    Some(start..end)
}

pub struct InMemorySlave {
    station: u8,
    model: RwLock<PointModel>,
}

impl InMemorySlave {
    pub fn new(
        station: u8,
        coil_count: usize,
        discrete_input_count: usize,
        holding_register_count: usize,
        input_register_count: usize,
    ) -> Self {
        Self::with_model(
            station,
            PointModel::new(
                coil_count,
                discrete_input_count,
                holding_register_count,
                input_register_count,
            ),
        )
    }

    pub fn with_model(station: u8, model: PointModel) -> Self {
        Self {
            station,
            model: RwLock::new(model),
        }
    }

    pub fn station(&self) -> u8 {
        self.station
    }

    pub fn snapshot(&self) -> PointModel {
        self.model
            .read()
            .expect("point model lock poisoned")
            .clone()
    }

    pub fn set_coil(&self, address: u16, value: bool) -> Result<(), SimError> {
        self.model
            .write()
            .expect("point model lock poisoned")
            .coils
            .set(usize::from(address), value)
    }

    pub fn set_discrete_input(&self, address: u16, value: bool) -> Result<(), SimError> {
        self.model
            .write()
            .expect("point model lock poisoned")
            .discrete_inputs
            .set(usize::from(address), value)
    }

    pub fn set_holding_register(&self, address: u16, value: u16) -> Result<(), SimError> {
        self.model
            .write()
            .expect("point model lock poisoned")
            .holding_registers
            .set(usize::from(address), value)
    }

    pub fn set_input_register(&self, address: u16, value: u16) -> Result<(), SimError> {
        self.model
            .write()
            .expect("point model lock poisoned")
            .input_registers
            .set(usize::from(address), value)
    }

    pub fn coil(&self, address: u16) -> Option<bool> {
        self.model
            .read()
            .expect("point model lock poisoned")
            .coils
            .get(usize::from(address))
    }

    pub fn holding_register(&self, address: u16) -> Option<u16> {
        self.model
            .read()
            .expect("point model lock poisoned")
            .holding_registers
            .get(usize::from(address))
    }

    fn serve(&self, request: DecodedRequest<'_>, reply: &mut PduBuffer) -> Result<(), ServeError> {
        let mut model = self.model.write().expect("point model lock poisoned");

        match request {
            DecodedRequest::ReadBits(req) => {
                let bank = match req.function() {
                    FunctionCode::ReadCoils => &model.coils,
                    _ => &model.discrete_inputs,
                };
                let range = checked_range(req.start_address, req.quantity, bank.len())
                    .ok_or(ServeError::Exception(ExceptionCode::IllegalDataAddress))?;

                let byte_count = range.len().div_ceil(8);
                reply.push_u8(req.function().as_u8())?;
                reply.push_u8(byte_count as u8)?;
                let mut packed = [0u8; 250];
                for (i, address) in range.enumerate() {
                    if bank.get(address).unwrap_or(false) {
                        packed[i / 8] |= 1u8 << (i % 8);
                    }
                }
                reply.push_bytes(&packed[..byte_count])?;
            }
            DecodedRequest::ReadRegisters(req) => {
                let bank = match req.function() {
                    FunctionCode::ReadHoldingRegisters => &model.holding_registers,
                    _ => &model.input_registers,
                };
                let range = checked_range(req.start_address, req.quantity, bank.len())
                    .ok_or(ServeError::Exception(ExceptionCode::IllegalDataAddress))?;

                reply.push_u8(req.function().as_u8())?;
                reply.push_u8((range.len() * 2) as u8)?;
                for address in range {
                    reply.push_word(bank.get(address).unwrap_or(0))?;
                }
            }
            DecodedRequest::WriteSingleCoil(req) => {
                model
                    .coils
                    .set(usize::from(req.address), req.value)
                    .map_err(|_| ServeError::Exception(ExceptionCode::IllegalDataAddress))?;
                reply.push_u8(FunctionCode::WriteSingleCoil.as_u8())?;
                reply.push_word(req.address)?;
                reply.push_word(if req.value { 0xFF00 } else { 0x0000 })?;
            }
            DecodedRequest::WriteSingleRegister(req) => {
                model
                    .holding_registers
                    .set(usize::from(req.address), req.value)
                    .map_err(|_| ServeError::Exception(ExceptionCode::IllegalDataAddress))?;
                reply.push_u8(FunctionCode::WriteSingleRegister.as_u8())?;
                reply.push_word(req.address)?;
                reply.push_word(req.value)?;
            }
            DecodedRequest::WriteMultipleCoils(payload) => {
                let range =
                    checked_range(payload.start_address, payload.quantity, model.coils.len())
                        .ok_or(ServeError::Exception(ExceptionCode::IllegalDataAddress))?;
                for (address, value) in range.zip(payload.bits()) {
                    model
                        .coils
                        .set(address, value)
                        .map_err(|_| ServeError::Exception(ExceptionCode::IllegalDataAddress))?;
                }
                reply.push_u8(FunctionCode::WriteMultipleCoils.as_u8())?;
                reply.push_word(payload.start_address)?;
                reply.push_word(payload.quantity)?;
            }
            DecodedRequest::WriteMultipleRegisters(payload) => {
                let count = payload.count() as u16;
                let range =
                    checked_range(payload.start_address, count, model.holding_registers.len())
                        .ok_or(ServeError::Exception(ExceptionCode::IllegalDataAddress))?;
                for (address, value) in range.zip(payload.words()) {
                    model
                        .holding_registers
                        .set(address, value)
                        .map_err(|_| ServeError::Exception(ExceptionCode::IllegalDataAddress))?;
                }
                reply.push_u8(FunctionCode::WriteMultipleRegisters.as_u8())?;
                reply.push_word(payload.start_address)?;
                reply.push_word(count)?;
            }
        }
        Ok(())
    }
}

enum ServeError {
    Exception(ExceptionCode),
    Encode(EncodeError),
}

impl From<EncodeError> for ServeError {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}

fn exception_pdu(function_code: u8, code: ExceptionCode) -> Result<PduBuffer, EncodeError> {
    let mut pdu = PduBuffer::new();
    ExceptionResponse {
        function_code,
        exception_code: code,
    }
    .encode(&mut pdu)?;
    Ok(pdu)
}

#[async_trait]
impl DataLink for InMemorySlave {
    async fn exchange(
        &self,
        request_frame: &[u8],
        response_frame: &mut [u8],
    ) -> Result<usize, DataLinkError> {
        if !self.verify_received(request_frame) {
            return Err(DataLinkError::InvalidRequest("request frame crc mismatch"));
        }
        let station = request_frame[0];
        if station != self.station {
            // Nothing on the bus answers a foreign station.
            return Err(DataLinkError::Timeout);
        }
        let request_pdu = &request_frame[1..request_frame.len() - 2];

        let decoded = {
            let mut cursor = PduCursor::new(request_pdu);
            DecodedRequest::decode(&mut cursor)
        };

        let reply = match decoded {
            Ok(request) => {
                debug!(
                    station,
                    function = request.function_code().as_u8(),
                    "serving request"
                );
                let mut reply = PduBuffer::new();
                match self.serve(request, &mut reply) {
                    Ok(()) => reply,
                    Err(ServeError::Exception(code)) => exception_pdu(request_pdu[0], code)?,
                    Err(ServeError::Encode(encode_err)) => return Err(encode_err.into()),
                }
            }
            Err(DecodeError::InvalidFunctionCode) => {
                exception_pdu(request_pdu[0] & 0x7F, ExceptionCode::IllegalFunction)?
            }
            Err(_) => exception_pdu(request_pdu[0] & 0x7F, ExceptionCode::IllegalDataValue)?,
        };

        let frame = RtuFrame::build(station, reply.as_bytes())?;
        let bytes = frame.as_bytes();
        if bytes.len() > response_frame.len() {
            return Err(DataLinkError::ResponseBufferTooSmall {
                needed: bytes.len(),
                available: response_frame.len(),
            });
        }
        response_frame[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }
}
