use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::monitors::MonitorMap;
use crate::store::WallpaperStore;

/// Cooperative shutdown request shared between the signal task, the
/// scheduler loop, and in-flight transitions. Once requested, transitions
/// stop applying frames and the loop returns, so the backup wallpaper is
/// applied strictly after the last store mutation.
#[derive(Clone, Default)]
pub struct ShutdownFlag {
    inner: Arc<FlagInner>,
}

#[derive(Default)]
struct FlagInner {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownFlag {
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

/// Resolve once a termination signal arrives. The handler itself does
/// nothing beyond requesting the shutdown sequence in `main`.
pub async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            log::info!("Received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            log::info!("Received SIGINT, shutting down");
        }
    }

    Ok(())
}

/// Force the backup wallpaper onto every connected monitor, re-enumerated
/// fresh because the set may have changed since the last iteration.
///
/// Best-effort: failures are logged, never propagated, so the process can
/// still exit. Setting an already-set wallpaper is a no-op for the store,
/// which makes a repeated invocation harmless.
pub async fn apply_backup<S, L>(store: S, list_monitors: L, backup: Option<PathBuf>)
where
    S: WallpaperStore + Clone + 'static,
    L: FnOnce() -> Result<MonitorMap> + Send + 'static,
{
    let Some(backup) = backup else { return };

    log::info!("Restoring backup wallpaper {}", backup.display());

    let monitors = match tokio::task::spawn_blocking(list_monitors).await {
        Ok(Ok(monitors)) => monitors,
        Ok(Err(e)) => {
            log::warn!("Could not enumerate monitors for backup: {e:#}");
            return;
        }
        Err(e) => {
            log::warn!("Monitor query task panicked: {e}");
            return;
        }
    };

    let mut tasks = JoinSet::new();
    for name in monitors.into_keys() {
        let store = store.clone();
        let backup = backup.clone();
        tasks.spawn_blocking(move || {
            if let Err(e) = store.set_image(&name, &backup) {
                log::warn!("Failed to restore backup on {name}: {e:#}");
            }
        });
    }

    while tasks.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitors::Resolution;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CountingStore {
        sets: Arc<Mutex<Vec<(String, PathBuf)>>>,
    }

    impl WallpaperStore for CountingStore {
        fn current_image(&self, _monitor: &str) -> Option<PathBuf> {
            None
        }

        fn current_style(&self, _monitor: &str) -> Option<i32> {
            None
        }

        fn set_image(&self, monitor: &str, path: &Path) -> Result<()> {
            self.sets
                .lock()
                .unwrap()
                .push((monitor.to_string(), path.to_path_buf()));
            Ok(())
        }
    }

    fn two_monitors() -> Result<MonitorMap> {
        let resolution = Resolution {
            width: 1920,
            height: 1080,
        };
        Ok(HashMap::from([
            ("eDP1".to_string(), resolution),
            ("HDMI1".to_string(), resolution),
        ]))
    }

    #[tokio::test]
    async fn test_shutdown_flag_reports_request() {
        let flag = ShutdownFlag::default();
        assert!(!flag.is_requested());

        flag.request();
        assert!(flag.is_requested());

        // Already requested: resolves immediately.
        flag.wait().await;
    }

    #[tokio::test]
    async fn test_wait_resolves_on_later_request() {
        let flag = ShutdownFlag::default();
        let waiter = tokio::spawn({
            let flag = flag.clone();
            async move { flag.wait().await }
        });

        tokio::task::yield_now().await;
        flag.request();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_backup_configured_is_a_noop() {
        let store = CountingStore::default();
        apply_backup(store.clone(), two_monitors, None).await;
        assert!(store.sets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backup_applied_once_per_monitor() {
        let store = CountingStore::default();
        let backup = PathBuf::from("/wallpapers/backup.jpg");

        apply_backup(store.clone(), two_monitors, Some(backup.clone())).await;

        let mut sets = store.sets.lock().unwrap().clone();
        sets.sort();
        assert_eq!(
            sets,
            vec![
                ("HDMI1".to_string(), backup.clone()),
                ("eDP1".to_string(), backup),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_invocation_is_harmless() {
        let store = CountingStore::default();
        let backup = PathBuf::from("/wallpapers/backup.jpg");

        apply_backup(store.clone(), two_monitors, Some(backup.clone())).await;
        apply_backup(store.clone(), two_monitors, Some(backup)).await;

        assert_eq!(store.sets.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_monitor_query_failure_is_swallowed() {
        let store = CountingStore::default();
        apply_backup(
            store.clone(),
            || Err(anyhow!("display gone")),
            Some(PathBuf::from("/wallpapers/backup.jpg")),
        )
        .await;
        assert!(store.sets.lock().unwrap().is_empty());
    }
}
