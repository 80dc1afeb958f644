use clap::Args;
use rtubus_client::{ClientOptions, RtuClient};
use rtubus_core::transform::WordCodec;
use rtubus_datalink::{DataLinkError, RtuTransport, RtuTransportConfig};
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct SerialConnectionArgs {
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub port: String,
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,
    /// Response timeout in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub timeout: u64,
    #[arg(long, default_value_t = 1)]
    pub station: u8,
    /// Treat caller-visible offsets as starting at 1.
    #[arg(long, default_value_t = false)]
    pub one_based: bool,
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub word_swap: bool,
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub multi_word_swap: bool,
}

pub fn build_client(
    args: &SerialConnectionArgs,
) -> Result<RtuClient<RtuTransport>, DataLinkError> {
    let config = RtuTransportConfig {
        response_timeout: Duration::from_millis(args.timeout),
        ..RtuTransportConfig::default()
    };
    let transport = RtuTransport::open(&args.port, args.baud, config)?;

    let options = ClientOptions::default()
        .with_station(args.station)
        .with_zero_based_addressing(!args.one_based)
        .with_codec(WordCodec::new(args.word_swap, args.multi_word_swap, false));

    Ok(RtuClient::with_options(transport, options))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

pub fn parse_bool(input: &str) -> Result<bool, String> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(format!("invalid bool value: {input}")),
    }
}
