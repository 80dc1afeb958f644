use crate::{DataLink, DataLinkError};
use async_trait::async_trait;
use rtubus_core::frame::rtu as rtu_frame;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Instant};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::trace;

/// Scan for a CRC-terminated frame anywhere in `buffer`, allowing resync
/// past leading line noise.
fn locate_frame(buffer: &[u8]) -> Option<(usize, usize)> {
    if buffer.len() < rtu_frame::MIN_FRAME_LEN {
        return None;
    }
    for start in 0..=buffer.len() - rtu_frame::MIN_FRAME_LEN {
        if rtu_frame::crc_valid(&buffer[start..]) {
            return Some((start, buffer.len() - start));
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct RtuTransportConfig {
    pub response_timeout: Duration,
    /// Minimum silence enforced between the end of one exchange and the
    /// start of the next (the bus's 3.5-character idle requirement).
    pub inter_frame_delay: Option<Duration>,
    pub max_frame_len: usize,
    pub parity: Parity,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for RtuTransportConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(500),
            inter_frame_delay: None,
            max_frame_len: 256,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

/// Serial RTU transport. One exchange at a time: the port is guarded by
/// a mutex held for the full request/response roundtrip.
#[derive(Debug)]
pub struct RtuTransport {
    stream: Arc<Mutex<SerialStream>>,
    last_exchange: Mutex<Option<Instant>>,
    config: RtuTransportConfig,
}

impl RtuTransport {
    pub fn open(
        path: &str,
        baud_rate: u32,
        config: RtuTransportConfig,
    ) -> Result<Self, DataLinkError> {
        let builder = tokio_serial::new(path, baud_rate)
            .parity(config.parity)
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control);
        let stream = builder.open_native_async().map_err(|err| {
            DataLinkError::Io(std::io::Error::other(format!(
                "failed to open serial port '{path}': {err}"
            )))
        })?;
        Ok(Self::from_stream(stream, config))
    }

    pub fn from_stream(stream: SerialStream, config: RtuTransportConfig) -> Self {
        Self {
            stream: Arc::new(Mutex::new(stream)),
            last_exchange: Mutex::new(None),
            config,
        }
    }

    async fn wait_frame_gap(&self) {
        let Some(gap) = self.config.inter_frame_delay else {
            return;
        };
        let last = self.last_exchange.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < gap {
                sleep(gap - elapsed).await;
            }
        }
    }

    async fn mark_exchange_done(&self) {
        *self.last_exchange.lock().await = Some(Instant::now());
    }
}

#[async_trait]
impl DataLink for RtuTransport {
    async fn exchange(
        &self,
        request_frame: &[u8],
        response_frame: &mut [u8],
    ) -> Result<usize, DataLinkError> {
        if request_frame.len() < rtu_frame::MIN_FRAME_LEN {
            return Err(DataLinkError::InvalidRequest("request frame too short"));
        }
        if self.config.max_frame_len < rtu_frame::MIN_FRAME_LEN {
            return Err(DataLinkError::InvalidRequest(
                "max frame length below minimum frame size",
            ));
        }

        let mut stream = self.stream.lock().await;
        self.wait_frame_gap().await;

        trace!(len = request_frame.len(), "sending rtu request frame");
        stream.write_all(request_frame).await?;
        stream.flush().await?;

        let deadline = Instant::now() + self.config.response_timeout;
        let mut buffer = vec![0u8; self.config.max_frame_len];
        let mut len = 0usize;

        let result = loop {
            if len == self.config.max_frame_len {
                // Drop the oldest byte so scanning can resync past noise.
                buffer.copy_within(1..self.config.max_frame_len, 0);
                len -= 1;
            }

            let now = Instant::now();
            let Some(remaining) = deadline.checked_duration_since(now) else {
                break Err(DataLinkError::Timeout);
            };

            let n = match timeout(remaining, stream.read(&mut buffer[len..len + 1])).await {
                Ok(Ok(n)) => n,
                Ok(Err(err)) => break Err(DataLinkError::Io(err)),
                Err(_) => break Err(DataLinkError::Timeout),
            };
            if n == 0 {
                break Err(DataLinkError::ConnectionClosed);
            }
            len += n;

            if let Some((start, frame_len)) = locate_frame(&buffer[..len]) {
                if frame_len > response_frame.len() {
                    break Err(DataLinkError::ResponseBufferTooSmall {
                        needed: frame_len,
                        available: response_frame.len(),
                    });
                }
                response_frame[..frame_len].copy_from_slice(&buffer[start..start + frame_len]);
                trace!(frame_len, skipped = start, "received rtu response frame");
                break Ok(frame_len);
            }
        };

        self.mark_exchange_done().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::locate_frame;
    use rtubus_core::frame::rtu::RtuFrame;

    fn sample_frame() -> Vec<u8> {
        RtuFrame::build(1, &[0x03, 0x02, 0x00, 0x2A])
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn locates_frame_after_leading_noise() {
        let mut noisy = vec![0x55, 0xAA];
        noisy.extend_from_slice(&sample_frame());

        let (start, len) = locate_frame(&noisy).expect("frame should be found");
        assert_eq!(start, 2);
        assert_eq!(&noisy[start..start + len], sample_frame().as_slice());
    }

    #[test]
    fn partial_frame_is_not_matched() {
        let frame = sample_frame();
        assert!(locate_frame(&frame[..frame.len() - 1]).is_none());
        assert!(locate_frame(&[]).is_none());
    }
}
