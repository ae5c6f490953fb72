use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line options for the daemon.
#[derive(Parser, Debug)]
#[command(name = "wallfade")]
#[command(about = "Smooth crossfade wallpaper transitions for Xfce", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory of wallpapers to cycle through
    #[arg(value_name = "IMG_DIR")]
    pub img_dir: PathBuf,

    /// Idle period between transitions, in seconds
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,

    /// Duration of one transition, in seconds
    #[arg(long, default_value_t = 1.0)]
    pub duration: f64,

    /// Frames per second during a transition
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Picture applied to every monitor when the daemon exits
    #[arg(long, value_name = "FILE")]
    pub backup: Option<PathBuf>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory whose regular files form the candidate pool.
    pub img_dir: PathBuf,

    /// Idle period between two loop iterations.
    pub timeout: Duration,

    /// Duration of one transition, in seconds.
    pub duration: f64,

    /// Frames per second during a transition.
    pub fps: u32,

    /// Wallpaper forced onto every monitor at process exit, if configured.
    pub backup: Option<PathBuf>,
}

impl Config {
    /// Validate the parsed command line and build the runtime configuration.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if !cli.img_dir.is_dir() {
            bail!("{} is not a directory", cli.img_dir.display());
        }

        if !cli.duration.is_finite() || cli.duration <= 0.0 {
            bail!("transition duration must be positive, got {}", cli.duration);
        }

        if cli.fps == 0 {
            bail!("fps must be at least 1");
        }

        if let Some(ref backup) = cli.backup {
            let meta = backup
                .metadata()
                .with_context(|| format!("backup picture {} not accessible", backup.display()))?;
            if !meta.is_file() {
                bail!("backup picture {} is not a regular file", backup.display());
            }
        }

        Ok(Self {
            img_dir: cli.img_dir,
            timeout: Duration::from_secs(cli.timeout),
            duration: cli.duration,
            fps: cli.fps,
            backup: cli.backup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(img_dir: PathBuf) -> Cli {
        Cli {
            img_dir,
            timeout: 600,
            duration: 1.0,
            fps: 30,
            backup: None,
        }
    }

    #[test]
    fn test_accepts_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_cli(cli(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.fps, 30);
        assert!(config.backup.is_none());
    }

    #[test]
    fn test_rejects_missing_directory() {
        assert!(Config::from_cli(cli(PathBuf::from("/nonexistent/wallpapers"))).is_err());
    }

    #[test]
    fn test_rejects_bad_timing() {
        let dir = tempfile::tempdir().unwrap();

        let mut bad_fps = cli(dir.path().to_path_buf());
        bad_fps.fps = 0;
        assert!(Config::from_cli(bad_fps).is_err());

        let mut bad_duration = cli(dir.path().to_path_buf());
        bad_duration.duration = -0.5;
        assert!(Config::from_cli(bad_duration).is_err());
    }

    #[test]
    fn test_rejects_missing_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut with_backup = cli(dir.path().to_path_buf());
        with_backup.backup = Some(dir.path().join("missing.jpg"));
        assert!(Config::from_cli(with_backup).is_err());
    }
}
