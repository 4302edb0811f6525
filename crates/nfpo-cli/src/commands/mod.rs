//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::debug;

use nfpo_core::{NfConfig, PipelineObserver};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nfpo")
        .join("config.json")
}

/// Load the configuration from `--config`, then the default location, then defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<NfConfig> {
    let config = match config_path {
        Some(path) => NfConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Using config file {}", path.display());
                NfConfig::from_file(&path)?
            } else {
                NfConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

/// Forwards pipeline messages to a progress bar.
pub struct BarObserver<'a> {
    bar: &'a ProgressBar,
}

impl<'a> BarObserver<'a> {
    pub fn new(bar: &'a ProgressBar) -> Self {
        Self { bar }
    }
}

impl PipelineObserver for BarObserver<'_> {
    fn progress(&self, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current.saturating_sub(1) as u64);
    }

    fn message(&self, text: &str) {
        debug!("{}", text);
        self.bar.set_message(text.to_string());
    }
}
