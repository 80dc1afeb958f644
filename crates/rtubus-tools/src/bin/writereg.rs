use clap::Parser;
use rtubus_tools::common::{build_client, init_tracing, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "writereg", about = "Write holding registers (FC16)")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    /// Address expression, e.g. "100" or "s=3;100".
    #[arg(long)]
    address: String,
    /// One or more register values.
    #[arg(long, required = true, num_args = 1..)]
    value: Vec<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let client = build_client(&args.conn)?;

    client.write_u16s(&args.address, &args.value).await?;
    println!("wrote {} register(s) at {}", args.value.len(), args.address);
    Ok(())
}
