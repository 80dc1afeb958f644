//! Transport abstraction for the rtubus client.
//!
//! A [`DataLink`] exchanges one complete RTU frame for another; all
//! protocol knowledge beyond "a frame ends when its CRC checks out"
//! stays in `rtubus-core` and the client crate.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use rtubus_core::frame::rtu as rtu_frame;
use rtubus_core::EncodeError;
use thiserror::Error;

pub mod rtu;
pub mod sim;

pub use rtu::{RtuTransport, RtuTransportConfig};
pub use sim::InMemorySlave;

#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("request timed out")]
    Timeout,
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("response buffer too small (needed {needed}, available {available})")]
    ResponseBufferTooSmall { needed: usize, available: usize },
}

/// Synchronous request/response exchange of RTU frames.
///
/// Implementations own the timeout and any inter-frame silence handling;
/// the protocol layer above has no timers of its own.
#[async_trait]
pub trait DataLink: Send + Sync {
    /// Send a complete request frame and write the slave's reply frame
    /// (station byte through CRC trailer) into `response_frame`.
    ///
    /// Returns the number of response bytes written.
    async fn exchange(
        &self,
        request_frame: &[u8],
        response_frame: &mut [u8],
    ) -> Result<usize, DataLinkError>;

    /// Pre-check that a received byte run forms a complete frame.
    fn verify_received(&self, frame: &[u8]) -> bool {
        rtu_frame::crc_valid(frame)
    }
}
