use anyhow::{Context, Result};
use image::RgbImage;
use rand::seq::IndexedRandom;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::Config;
use crate::monitors::Resolution;
use crate::shutdown::ShutdownFlag;
use crate::store::WallpaperStore;
use crate::style::Style;

/// Result of one per-monitor transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The monitor now displays the chosen candidate's canonical path.
    Completed { path: PathBuf },
    /// The monitor was left untouched for this cycle.
    Skipped(SkipReason),
}

/// Non-fatal conditions that skip a monitor for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The current wallpaper path could not be read.
    NoCurrentWallpaper,
    /// The candidate pool is empty after excluding the current image.
    NoCandidate,
    /// The current style code could not be read.
    NoStyle,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NoCurrentWallpaper => "current wallpaper unknown",
            Self::NoCandidate => "no replacement candidate",
            Self::NoStyle => "current style unknown",
        };
        f.write_str(reason)
    }
}

/// Drives one monitor from its current wallpaper to a randomly chosen
/// replacement through a timed sequence of blended frames.
pub struct Transitioner<S, C> {
    store: S,
    clock: C,
    config: Arc<Config>,
    shutdown: ShutdownFlag,
}

impl<S: WallpaperStore, C: Clock> Transitioner<S, C> {
    pub fn new(store: S, clock: C, config: Arc<Config>, shutdown: ShutdownFlag) -> Self {
        Self {
            store,
            clock,
            config,
            shutdown,
        }
    }

    /// Perform a transition on `monitor`. Skip conditions are reported as
    /// [`Outcome::Skipped`]; rendering and I/O faults propagate.
    pub fn run(&self, monitor: &str, resolution: Resolution) -> Result<Outcome> {
        let Some(current) = self.store.current_image(monitor) else {
            return Ok(Outcome::Skipped(SkipReason::NoCurrentWallpaper));
        };

        // Avoid transitioning into the wallpaper already on screen.
        let Some(candidate) = choose_candidate(&self.config.img_dir, &current)? else {
            return Ok(Outcome::Skipped(SkipReason::NoCandidate));
        };

        let Some(style_code) = self.store.current_style(monitor) else {
            return Ok(Outcome::Skipped(SkipReason::NoStyle));
        };
        let style = Style::from_code(style_code)?;

        // Both images are adapted with the current style so the blend is
        // visually coherent.
        let bg = style.apply(
            &image::open(&current)
                .with_context(|| format!("open current wallpaper {}", current.display()))?,
            resolution,
        )?;
        let fg = style.apply(
            &image::open(&candidate)
                .with_context(|| format!("open candidate {}", candidate.display()))?,
            resolution,
        )?;

        let total = frame_count(self.config.duration, self.config.fps);
        if total == 0 {
            self.store.set_image(monitor, &candidate)?;
            return Ok(Outcome::Completed { path: candidate });
        }
        let wait = Duration::from_secs_f64(self.config.duration / f64::from(total));

        // One uniquely named directory per (monitor, transition), so
        // concurrent renders and successive iterations never collide.
        let frames_dir = tempfile::Builder::new()
            .prefix(&format!("wallfade-{monitor}-"))
            .tempdir()
            .context("create frame directory")?;

        let mut frames = Vec::with_capacity(total as usize);
        for i in 1..=total {
            let ratio = i as f32 / total as f32;
            let frame = blend(&bg, &fg, ratio)?;
            let path = frames_dir.path().join(format!("frame-{i:04}.jpg"));
            frame
                .save(&path)
                .with_context(|| format!("write frame {i} for {monitor}"))?;
            frames.push(path);
        }

        for path in &frames {
            // A shutdown request ends the sequence early: the canonical
            // candidate below is still set, so the backup wallpaper applied
            // afterwards is the last mutation the store sees.
            if self.shutdown.is_requested() {
                break;
            }
            self.clock.sleep(wait);
            self.store.set_image(monitor, path)?;
        }

        // End on the canonical file, never a temp artifact.
        self.store.set_image(monitor, &candidate)?;

        frames_dir
            .close()
            .with_context(|| format!("remove transition frames for {monitor}"))?;

        Ok(Outcome::Completed { path: candidate })
    }
}

/// Number of blended frames for a transition.
fn frame_count(duration: f64, fps: u32) -> u32 {
    (duration * f64::from(fps)).round() as u32
}

/// Draw a replacement uniformly from the regular files in `dir`, excluding
/// the file name currently displayed. The pool is re-read on every call.
fn choose_candidate(dir: &Path, current: &Path) -> Result<Option<PathBuf>> {
    let current_name = current.file_name();
    let mut pool = Vec::new();

    for entry in
        fs::read_dir(dir).with_context(|| format!("read wallpaper directory {}", dir.display()))?
    {
        let path = entry.context("read directory entry")?.path();
        // is_file follows symlinks, so a symlink to an image still counts.
        if !path.is_file() {
            continue;
        }
        if path.file_name() == current_name {
            continue;
        }
        pool.push(path);
    }

    Ok(pool.choose(&mut rand::rng()).cloned())
}

/// Linear interpolation of two equally sized frames. A ratio of 1.0
/// reproduces `fg` bit for bit.
fn blend(bg: &RgbImage, fg: &RgbImage, ratio: f32) -> Result<RgbImage> {
    debug_assert_eq!(bg.dimensions(), fg.dimensions());

    let mut data = Vec::with_capacity(bg.as_raw().len());
    for (&old, &new) in bg.as_raw().iter().zip(fg.as_raw()) {
        let old = f32::from(old);
        let new = f32::from(new);
        data.push((old + (new - old) * ratio) as u8);
    }

    RgbImage::from_raw(bg.width(), bg.height(), data).context("blend buffer size mismatch")
}
