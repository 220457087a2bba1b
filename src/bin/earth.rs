// src/bin/earth.rs

//! Remote viewer: connects to the simulation server and draws the world
//! from the event stream in the terminal.
//!
//! Logs go to stderr, redirect it to keep the screen clean:
//! `cargo run --bin earth 2>earth.log`

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};

use homerun::display::TerminalDisplay;
use homerun::network::{DEFAULT_PORT, decode_event};
use homerun::presenter::{Presenter, SimulationEvent};

#[derive(Parser, Debug)]
#[command(name = "earth", version)]
#[command(about = "Watch a running homerun simulation")]
struct Cli {
    /// Address of the simulation server
    #[arg(long, env = "HOMERUN_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port of the simulation server
    #[arg(long, env = "HOMERUN_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds the final screen stays up after the run ends
    #[arg(long, default_value_t = 5)]
    linger: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    homerun::logging::init("homerun=info,earth=info");

    let cli = Cli::parse();

    // NOTE - Connect to simulation server
    let stream = TcpStream::connect((cli.host.as_str(), cli.port))
        .await
        .with_context(|| {
            format!(
                "cannot reach the simulation server at {}:{}, start it with: cargo run --bin simulation",
                cli.host, cli.port
            )
        })?;
    info!(host = %cli.host, port = cli.port, "connected");

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let mut display = TerminalDisplay::new("HOMERUN - remote view");

    // NOTE - Main loop: one JSON event per line
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .context("connection to the server lost")?;
        if read == 0 {
            info!("server closed the connection");
            break;
        }

        let event = match decode_event(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "skipping corrupted message");
                continue;
            }
        };
        display.notify(&event);

        if matches!(event, SimulationEvent::RunFinished { .. }) {
            tokio::time::sleep(Duration::from_secs(cli.linger)).await;
            break;
        }
    }

    let delivered = display.view().delivered();
    drop(display);
    println!();
    info!(delivered, "viewer closed");
    Ok(())
}
