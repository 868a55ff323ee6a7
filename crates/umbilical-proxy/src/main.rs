//! Fan-out proxy binary.
//!
//! # Usage
//!
//! ```bash
//! # Software clients on 3000, hardware endpoint on 3001
//! umbilical-proxy --tcp-address 127.0.0.1 --tcp-port 3000
//! ```

use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use umbilical_proxy::Proxy;

/// Fan-out relay between station software clients and hardware.
#[derive(Parser, Debug)]
#[command(name = "umbilical-proxy")]
#[command(about = "TCP fan-out relay for the ground station link")]
#[command(version)]
struct Args {
    /// Address both listeners bind to
    #[arg(long, default_value = "127.0.0.1")]
    tcp_address: String,

    /// Software-side port; the hardware side listens on port + 1
    #[arg(long, default_value = "3000")]
    tcp_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let address: IpAddr = args.tcp_address.parse()?;
    let software_addr = SocketAddr::new(address, args.tcp_port);
    let hardware_addr = SocketAddr::new(address, args.tcp_port + 1);

    tracing::info!("umbilical proxy starting");

    let mut software = Proxy::bind("software", software_addr, true).await?;
    let mut hardware = Proxy::bind("hardware", hardware_addr, false).await?;

    software.register_listener(hardware.forward_handle());
    hardware.register_listener(software.forward_handle());

    tokio::try_join!(software.serve(), hardware.serve())?;

    Ok(())
}
