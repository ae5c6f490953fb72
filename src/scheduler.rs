use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::clock::Clock;
use crate::config::Config;
use crate::monitors::{self, MonitorMap};
use crate::shutdown::ShutdownFlag;
use crate::store::WallpaperStore;
use crate::transition::{Outcome, Transitioner};

/// Upper bound on concurrently transitioning monitors.
const THREAD_LIMIT: usize = 8;

fn worker_cap(monitor_count: usize) -> usize {
    THREAD_LIMIT.min(monitor_count)
}

/// Run transitions until shutdown is requested: enumerate monitors, fan out
/// one engine run per monitor, wait for every run to finish, sleep, repeat.
/// Per-monitor skips stay local; rendering and I/O faults end the loop.
///
/// Returns only once every in-flight run has drained, so the caller can
/// apply the backup wallpaper without racing a transition.
pub async fn run<S, C>(
    engine: Arc<Transitioner<S, C>>,
    config: Arc<Config>,
    shutdown: ShutdownFlag,
) -> Result<()>
where
    S: WallpaperStore + 'static,
    C: Clock + 'static,
{
    loop {
        let monitors = tokio::task::spawn_blocking(monitors::list_monitors)
            .await
            .context("monitor query task panicked")??;

        if monitors.is_empty() {
            log::debug!("no connected monitors this cycle");
        } else {
            run_iteration(&engine, monitors).await?;
        }

        if shutdown.is_requested() {
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep(config.timeout) => {}
            () = shutdown.wait() => return Ok(()),
        }
    }
}

/// One loop iteration: fan out over `monitors` with a bounded worker cap and
/// block until every run has finished.
async fn run_iteration<S, C>(engine: &Arc<Transitioner<S, C>>, monitors: MonitorMap) -> Result<()>
where
    S: WallpaperStore + 'static,
    C: Clock + 'static,
{
    let semaphore = Arc::new(Semaphore::new(worker_cap(monitors.len())));
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    for (name, resolution) in monitors {
        let engine = engine.clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let monitor = name.clone();
            let outcome = tokio::task::spawn_blocking(move || engine.run(&monitor, resolution))
                .await
                .context("transition task panicked")?;

            match outcome? {
                Outcome::Completed { path } => {
                    log::info!("{name}: transitioned to {}", path.display());
                }
                Outcome::Skipped(reason) => {
                    log::debug!("{name}: transition skipped ({reason})");
                }
            }
            Ok(())
        });
    }

    // Barrier: drain every run even after a failure, so no blocking worker
    // survives into the next iteration or the shutdown sequence.
    let mut failure = None;
    while let Some(joined) = tasks.join_next().await {
        match joined.context("transition task panicked").and_then(|res| res) {
            Ok(()) => {}
            Err(e) if failure.is_none() => failure = Some(e),
            Err(e) => log::error!("additional transition failure: {e:#}"),
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
