mod clock;
mod config;
mod monitors;
mod scheduler;
mod shutdown;
mod store;
mod style;
mod transition;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use clock::SystemClock;
use store::XfconfStore;
use transition::Transitioner;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Arc::new(config::Config::from_cli(config::Cli::parse())?);

    log::info!("Starting wallfade v{}", env!("CARGO_PKG_VERSION"));
    log::info!("  wallpaper directory: {}", config.img_dir.display());
    log::info!("  idle timeout: {}s", config.timeout.as_secs());
    log::info!(
        "  transition: {}s at {} fps",
        config.duration,
        config.fps
    );
    match config.backup {
        Some(ref backup) => log::info!("  backup picture: {}", backup.display()),
        None => log::info!("  backup picture: not configured"),
    }

    let shutdown = shutdown::ShutdownFlag::default();

    // The signal task only requests shutdown; the loop notices the flag,
    // in-flight transitions cut their frame sequence short, and run()
    // returns once everything has drained.
    let signals = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown::wait_for_signal().await {
            log::error!("Signal handler setup failed: {e:#}");
        }
        signals.request();
    });

    let engine = Arc::new(Transitioner::new(
        XfconfStore,
        SystemClock,
        config.clone(),
        shutdown.clone(),
    ));

    let result = scheduler::run(engine, config.clone(), shutdown.clone()).await;

    // No transition is running past this point, so the backup is the last
    // mutation the store sees.
    shutdown.request();
    shutdown::apply_backup(XfconfStore, monitors::list_monitors, config.backup.clone()).await;

    if let Err(ref e) = result {
        log::error!("Exiting after fatal error: {e:#}");
    }
    result
}
