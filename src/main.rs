use anyhow::Context;
use pendantlink::{
    init_logging, BridgeConfig, Collaborators, DryRunMachine, SessionSupervisor, SystemClock,
    SystemPorts, Units, BUILD_DATE, VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DRY_RUN_FEED_RATE: f64 = 1000.0;
const DRY_RUN_JOB_ROWS: u64 = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("pendantlink {} ({})", VERSION, BUILD_DATE);

    let config_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => BridgeConfig::default_path()?,
    };
    let config = BridgeConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let profile = config.to_profile();
    tracing::info!(?profile, "Bridge configured");

    let machine = Arc::new(DryRunMachine::new(Units::MM, DRY_RUN_FEED_RATE, DRY_RUN_JOB_ROWS));
    let collaborators = Arc::new(Collaborators::with(machine.clone(), machine.clone()));

    let supervisor = SessionSupervisor::new(
        profile,
        Box::new(SystemPorts::new(config.usb_only)),
        collaborators,
        Arc::new(SystemClock),
    );
    let handle = supervisor.handle();
    let worker = supervisor.spawn().context("starting session worker")?;

    let streamer = {
        let machine = machine.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(200));
            loop {
                ticker.tick().await;
                machine.stream_row();
            }
        })
    };

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    tracing::info!("Shutting down");

    streamer.abort();
    handle.shutdown();
    tokio::task::spawn_blocking(move || worker.join())
        .await?
        .map_err(|_| anyhow::anyhow!("session worker panicked"))?;

    Ok(())
}
