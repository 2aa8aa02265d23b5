//! B-route smart meter reader.
//!
//! Opens the Wi-SUN modem's serial port, authenticates the B-route
//! credentials, joins the meter's PAN and then polls one instantaneous
//! measurement forever. Any transport or protocol failure ends the process
//! with a diagnostic.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio_serial::SerialPortBuilderExt;

use bmeter_echonet::{EPC_INSTANT_CURRENTS, EPC_INSTANT_POWER};
use bmeter_skstack::{Joiner, NetworkParams, SkClient, SkConfig};

mod poller;

const BAUD_RATE: u32 = 115200;
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// ECHONET Lite UDP port (3610).
const METER_UDP_PORT: u16 = 0x0E1A;

/// Reads instantaneous measurements from a low-voltage smart meter over the
/// Wi-SUN B-route service.
#[derive(Parser, Debug)]
#[command(name = "bmeter", version, about)]
struct Cli {
    /// Serial device of the Wi-SUN modem
    #[arg(short = 'd', long)]
    device: String,

    /// Route-B authentication ID
    #[arg(short = 'u', long = "id")]
    route_b_id: String,

    /// Route-B password
    #[arg(short = 'p', long)]
    password: String,

    /// Channel to use, skipping the scan (requires --panid and --ipaddr too)
    #[arg(long)]
    channel: Option<String>,

    /// PAN id to use, skipping the scan
    #[arg(long = "panid")]
    pan_id: Option<String>,

    /// Peer IPv6 address to use, skipping the scan
    #[arg(long = "ipaddr")]
    addr: Option<String>,

    /// Poll instantaneous currents instead of instantaneous power
    #[arg(long)]
    currents: bool,

    /// Echo every line exchanged with the modem
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("Opening serial port: {}", cli.device);
    let port = tokio_serial::new(&cli.device, BAUD_RATE)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .open_native_async()
        .with_context(|| format!("opening {}", cli.device))?;
    let (reader, writer) = tokio::io::split(port);

    let mut client = SkClient::new(reader, writer, SkConfig::default());
    client.authenticate(&cli.route_b_id, &cli.password).await?;

    let presupplied = match (cli.channel, cli.pan_id, cli.addr) {
        (Some(channel), Some(pan_id), Some(addr)) => Some(NetworkParams {
            channel,
            pan_id,
            addr,
        }),
        _ => None,
    };

    info!("Starting PANA");
    let mut joiner = Joiner::new(&mut client);
    let params = joiner.establish(presupplied).await?;
    info!("PANA completed");

    let epc = if cli.currents {
        EPC_INSTANT_CURRENTS
    } else {
        EPC_INSTANT_POWER
    };
    poller::run(&mut client, &params, epc, POLL_INTERVAL, METER_UDP_PORT).await?;
    Ok(())
}
