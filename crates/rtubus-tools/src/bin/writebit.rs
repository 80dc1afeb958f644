use clap::Parser;
use rtubus_tools::common::{build_client, init_tracing, parse_bool, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "writebit", about = "Write a single coil (FC05)")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    /// Address expression, e.g. "10" or "s=3;10".
    #[arg(long)]
    address: String,
    /// Coil state: on/off, true/false, 1/0.
    #[arg(long, value_parser = parse_bool)]
    value: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let client = build_client(&args.conn)?;

    client.write_bit(&args.address, args.value).await?;
    println!(
        "coil {} set {}",
        args.address,
        if args.value { "ON" } else { "OFF" }
    );
    Ok(())
}
