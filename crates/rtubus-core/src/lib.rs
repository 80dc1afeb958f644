//! Modbus RTU protocol encoding in pure Rust.
//!
//! `rtubus-core` provides zero-copy, `no_std`-compatible construction and
//! validation of Modbus RTU frames, together with the byte-order transform
//! engine and the address-expression parser used by the client crate.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod address;
pub mod error;
pub mod frame;
pub mod pdu;
pub mod transform;

pub use error::{DecodeError, EncodeError};
