// Local run: generates a world and lets the robot collect the markers in the
// terminal. Logs go to stderr, redirect it for a clean screen:
//     cargo run -- --seed 7 2>homerun.log

use std::time::Duration;

use anyhow::Context;
use tracing::info;

use homerun::config::SimulationConfig;
use homerun::display::TerminalDisplay;
use homerun::presenter::Paced;
use homerun::station::Station;

fn main() -> anyhow::Result<()> {
    homerun::logging::init("homerun=info");

    // NOTE - Configuration is checked before anything is created
    let config = SimulationConfig::from_cli().context("invalid configuration")?;
    info!(?config, "starting local run");

    let grid = config
        .world_generator()
        .generate(&config.layout)
        .context("world generation failed")?;

    let mut station = Station::new(grid, config.facing);
    let mut presenter = Paced::new(
        TerminalDisplay::new("HOMERUN - marker collection"),
        config.step_delay,
    );
    let report = station.run(&mut presenter).context("collection run failed")?;

    // NOTE - Leave the final screen visible for a moment
    std::thread::sleep(Duration::from_secs(1));
    drop(presenter);
    println!();
    info!(
        delivered = report.collected.len(),
        unreachable = report.unreachable,
        "run complete"
    );
    Ok(())
}
