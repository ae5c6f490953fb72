use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

const CHANNEL: &str = "xfce4-desktop";

fn image_property(monitor: &str) -> String {
    format!("/backdrop/screen0/monitor{monitor}/workspace0/last-image")
}

fn style_property(monitor: &str) -> String {
    format!("/backdrop/screen0/monitor{monitor}/workspace0/image-style")
}

/// Per-monitor wallpaper settings held by the desktop.
///
/// Reads return `None` whenever the property cannot be fetched; the caller
/// skips that monitor for the current cycle. The store is the sole source of
/// truth for what is currently displayed, so nothing is cached here.
pub trait WallpaperStore: Send + Sync {
    /// Path of the image currently shown on `monitor`.
    fn current_image(&self, monitor: &str) -> Option<PathBuf>;

    /// Style code currently applied on `monitor`.
    fn current_style(&self, monitor: &str) -> Option<i32>;

    /// Point `monitor` at a new image.
    fn set_image(&self, monitor: &str, path: &Path) -> Result<()>;
}

/// Wallpaper store backed by `xfconf-query` on the `xfce4-desktop` channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct XfconfStore;

impl XfconfStore {
    fn query(property: &str) -> Option<String> {
        let output = Command::new("xfconf-query")
            .args(["--channel", CHANNEL, "--property", property])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() { None } else { Some(value) }
    }
}

impl WallpaperStore for XfconfStore {
    fn current_image(&self, monitor: &str) -> Option<PathBuf> {
        Self::query(&image_property(monitor)).map(PathBuf::from)
    }

    fn current_style(&self, monitor: &str) -> Option<i32> {
        Self::query(&style_property(monitor))?.parse().ok()
    }

    fn set_image(&self, monitor: &str, path: &Path) -> Result<()> {
        let status = Command::new("xfconf-query")
            .args(["--channel", CHANNEL, "--property", &image_property(monitor), "--set"])
            .arg(path)
            .status()
            .context("run xfconf-query")?;

        if !status.success() {
            log::warn!("xfconf-query exited with {status} while setting wallpaper on {monitor}");
        }

        Ok(())
    }
}
