pub mod exception;
pub mod function_code;
pub mod request;
pub mod response;
pub mod wire;

pub use exception::{ExceptionCode, ExceptionResponse};
pub use function_code::FunctionCode;
pub use request::*;
pub use response::*;
pub use wire::{PduBuffer, PduCursor, MAX_PDU_LEN};
