// Simulation server
// Runs the collection on its own thread and streams every event over TCP to
// the connected viewers (`earth` binary). With `--local-view` the run is also
// drawn in this terminal; logs go to stderr either way.

use std::io::stdout;

use anyhow::{Context, anyhow};
use tokio::sync::mpsc;
use tracing::{error, info};

use homerun::config::SimulationConfig;
use homerun::display::{TerminalDisplay, render_summary};
use homerun::network::{ChannelPresenter, EVENT_BUFFER, EventServer, SimulationThread};
use homerun::presenter::{Fanout, Paced, SimulationEvent};
use homerun::station::Station;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    homerun::logging::init("homerun=info,simulation=info");

    // === PHASE 1: CONFIGURATION AND WORLD ===

    let config = SimulationConfig::from_cli().context("invalid configuration")?;
    let grid = config
        .world_generator()
        .generate(&config.layout)
        .context("world generation failed")?;
    info!(size = config.layout.size, home = ?config.layout.home, "world generated");

    // === PHASE 2: SERVER ===

    let server = EventServer::bind(("127.0.0.1", config.port))
        .await
        .with_context(|| format!("cannot listen on port {}", config.port))?;
    info!(addr = %server.local_addr()?, "waiting for viewers, start one with: cargo run --bin earth");

    // === PHASE 3: SIMULATION THREAD ===

    // Channel between the simulation thread and the broadcaster
    let (event_tx, event_rx) = mpsc::channel::<SimulationEvent>(EVENT_BUFFER);
    let mut presenters = Fanout::new().with(ChannelPresenter::new(event_tx));
    if config.local_view {
        presenters = presenters.with(TerminalDisplay::new("HOMERUN - simulation server"));
    }
    let facing = config.facing;
    let delay = config.step_delay;
    let mut simulation = SimulationThread::spawn(move || {
        let mut station = Station::new(grid, facing);
        station.run(&mut Paced::new(presenters, delay))
    });

    // === PHASE 4: BROADCAST UNTIL CTRL+C OR FAILURE ===

    let shutdown = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "cannot listen for ctrl+c");
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            // already logged by the simulation thread
            _ = simulation.failure() => {}
        }
    };
    server.run(event_rx, shutdown).await?;

    if !simulation.is_finished() {
        info!("stopped before every marker was collected");
        return Ok(());
    }
    let report = simulation
        .join()
        .map_err(|_| anyhow!("simulation thread panicked"))?
        .context("collection run failed")?;
    render_summary(&report, &mut stdout())?;
    Ok(())
}
