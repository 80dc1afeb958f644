use clap::Parser;
use rtubus_tools::common::{build_client, init_tracing, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "readbits", about = "Read coils (FC01) or discrete inputs via x=2")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    /// Address expression, e.g. "10" or "s=3;x=2;10".
    #[arg(long)]
    address: String,
    #[arg(long, default_value_t = 1)]
    count: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let client = build_client(&args.conn)?;

    let bits = client.read_bits(&args.address, args.count).await?;
    for (idx, bit) in bits.iter().enumerate() {
        println!("bit[{idx}] = {}", if *bit { "ON" } else { "OFF" });
    }
    Ok(())
}
