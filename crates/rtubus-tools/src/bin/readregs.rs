use clap::Parser;
use rtubus_tools::common::{build_client, init_tracing, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "readregs", about = "Read holding registers (FC03)")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    /// Address expression, e.g. "100" or "s=3;x=4;100".
    #[arg(long)]
    address: String,
    #[arg(long, default_value_t = 1)]
    quantity: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let client = build_client(&args.conn)?;

    let values = client.read_u16_array(&args.address, args.quantity).await?;
    for (idx, value) in values.iter().enumerate() {
        println!("reg[{idx}] = {value} (0x{value:04X})");
    }
    Ok(())
}
