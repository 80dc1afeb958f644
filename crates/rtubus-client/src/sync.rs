use crate::{ClientError, ClientOptions, RtuClient};
use rtubus_core::transform::TextEncoding;
use rtubus_datalink::{DataLink, DataLinkError, RtuTransport, RtuTransportConfig};
use thiserror::Error;
use tokio::runtime::Runtime;

#[derive(Debug, Error)]
pub enum SyncClientError {
    #[error("runtime init error: {0}")]
    RuntimeInit(std::io::Error),
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
}

/// Blocking facade over [`RtuClient`] for callers without an async
/// runtime of their own.
pub struct SyncRtuClient<D: DataLink = RtuTransport> {
    runtime: Runtime,
    client: RtuClient<D>,
}

impl SyncRtuClient<RtuTransport> {
    /// Open a serial port with default transport and client settings.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SyncClientError> {
        Self::open_with(
            path,
            baud_rate,
            RtuTransportConfig::default(),
            ClientOptions::default(),
        )
    }

    pub fn open_with(
        path: &str,
        baud_rate: u32,
        transport_config: RtuTransportConfig,
        options: ClientOptions,
    ) -> Result<Self, SyncClientError> {
        let transport = RtuTransport::open(path, baud_rate, transport_config)?;
        Self::with_datalink(transport, options)
    }
}

impl<D: DataLink> SyncRtuClient<D> {
    pub fn with_datalink(datalink: D, options: ClientOptions) -> Result<Self, SyncClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(SyncClientError::RuntimeInit)?;
        Ok(Self {
            runtime,
            client: RtuClient::with_options(datalink, options),
        })
    }

    pub fn options(&self) -> ClientOptions {
        self.client.options()
    }

    pub fn options_mut(&mut self) -> &mut ClientOptions {
        self.client.options_mut()
    }

    pub fn read_bit(&self, address: &str) -> Result<bool, SyncClientError> {
        self.runtime
            .block_on(self.client.read_bit(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_bits(&self, address: &str, count: u16) -> Result<Vec<bool>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_bits(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_discrete(&self, address: &str) -> Result<bool, SyncClientError> {
        self.runtime
            .block_on(self.client.read_discrete(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_discretes(&self, address: &str, count: u16) -> Result<Vec<bool>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_discretes(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read(&self, address: &str, quantity: u16) -> Result<Vec<u8>, SyncClientError> {
        self.runtime
            .block_on(self.client.read(address, quantity))
            .map_err(SyncClientError::Client)
    }

    pub fn read_u16(&self, address: &str) -> Result<u16, SyncClientError> {
        self.runtime
            .block_on(self.client.read_u16(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_i16(&self, address: &str) -> Result<i16, SyncClientError> {
        self.runtime
            .block_on(self.client.read_i16(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_u32(&self, address: &str) -> Result<u32, SyncClientError> {
        self.runtime
            .block_on(self.client.read_u32(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_i32(&self, address: &str) -> Result<i32, SyncClientError> {
        self.runtime
            .block_on(self.client.read_i32(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_f32(&self, address: &str) -> Result<f32, SyncClientError> {
        self.runtime
            .block_on(self.client.read_f32(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_u64(&self, address: &str) -> Result<u64, SyncClientError> {
        self.runtime
            .block_on(self.client.read_u64(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_i64(&self, address: &str) -> Result<i64, SyncClientError> {
        self.runtime
            .block_on(self.client.read_i64(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_f64(&self, address: &str) -> Result<f64, SyncClientError> {
        self.runtime
            .block_on(self.client.read_f64(address))
            .map_err(SyncClientError::Client)
    }

    pub fn read_u16_array(&self, address: &str, count: u16) -> Result<Vec<u16>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_u16_array(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_i16_array(&self, address: &str, count: u16) -> Result<Vec<i16>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_i16_array(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_u32_array(&self, address: &str, count: u16) -> Result<Vec<u32>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_u32_array(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_i32_array(&self, address: &str, count: u16) -> Result<Vec<i32>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_i32_array(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_f32_array(&self, address: &str, count: u16) -> Result<Vec<f32>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_f32_array(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_u64_array(&self, address: &str, count: u16) -> Result<Vec<u64>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_u64_array(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_i64_array(&self, address: &str, count: u16) -> Result<Vec<i64>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_i64_array(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_f64_array(&self, address: &str, count: u16) -> Result<Vec<f64>, SyncClientError> {
        self.runtime
            .block_on(self.client.read_f64_array(address, count))
            .map_err(SyncClientError::Client)
    }

    pub fn read_string(
        &self,
        address: &str,
        word_count: u16,
        encoding: TextEncoding,
    ) -> Result<String, SyncClientError> {
        self.runtime
            .block_on(self.client.read_string(address, word_count, encoding))
            .map_err(SyncClientError::Client)
    }

    pub fn write_bit(&self, address: &str, value: bool) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_bit(address, value))
            .map_err(SyncClientError::Client)
    }

    pub fn write_bits(&self, address: &str, values: &[bool]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_bits(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_register_bytes(
        &self,
        address: &str,
        high: u8,
        low: u8,
    ) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_register_bytes(address, high, low))
            .map_err(SyncClientError::Client)
    }

    pub fn write_register(&self, address: &str, value: u16) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_register(address, value))
            .map_err(SyncClientError::Client)
    }

    pub fn write_register_i16(&self, address: &str, value: i16) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_register_i16(address, value))
            .map_err(SyncClientError::Client)
    }

    pub fn write_bytes(&self, address: &str, data: &[u8]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_bytes(address, data))
            .map_err(SyncClientError::Client)
    }

    pub fn write_u16s(&self, address: &str, values: &[u16]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_u16s(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_i16s(&self, address: &str, values: &[i16]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_i16s(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_u32s(&self, address: &str, values: &[u32]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_u32s(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_i32s(&self, address: &str, values: &[i32]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_i32s(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_f32s(&self, address: &str, values: &[f32]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_f32s(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_u64s(&self, address: &str, values: &[u64]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_u64s(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_i64s(&self, address: &str, values: &[i64]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_i64s(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_f64s(&self, address: &str, values: &[f64]) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_f64s(address, values))
            .map_err(SyncClientError::Client)
    }

    pub fn write_string(
        &self,
        address: &str,
        text: &str,
        encoding: TextEncoding,
        fixed_len: Option<usize>,
    ) -> Result<(), SyncClientError> {
        self.runtime
            .block_on(self.client.write_string(address, text, encoding, fixed_len))
            .map_err(SyncClientError::Client)
    }
}
