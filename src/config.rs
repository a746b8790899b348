use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;

pub static CONFIG: OnceLock<Config> = OnceLock::new();

static DEFAULT_CONFIG: OnceLock<Config> = OnceLock::new();

/// Knobs shared by every subcommand.
#[derive(Debug, Clone)]
#[derive(clap::Parser)]
pub struct Config {
    /// Width of rendered figures in pixels
    #[clap(long, default_value = "1000")]
    pub figure_width: u32,

    /// Height of rendered figures in pixels
    #[clap(long, default_value = "600")]
    pub figure_height: u32,

    /// Decimal places kept in summary tables
    #[clap(long, default_value = "5")]
    pub precision: u32,

    /// Log debug messages
    #[clap(short, long)]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            figure_width: 1000,
            figure_height: 600,
            precision: 5,
            verbose: false,
        }
    }
}

/// The config set by the binary, or the defaults when nothing set one.
pub fn get() -> &'static Config {
    CONFIG
        .get()
        .unwrap_or_else(|| DEFAULT_CONFIG.get_or_init(Config::default))
}

/// How a tracker was restarted during an experiment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub reinit_strategy: String,
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Config file not found at {}", path.display()))?;
        // an empty document is a valid config with every field defaulted
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// A single initialisation means nothing was ever re-initialised.
    pub fn is_one_init(&self) -> bool {
        self.reinit_strategy == "one_init"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_experiment_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "reinit_strategy: one_init\nother_key: 3").unwrap();
        let config = ExperimentConfig::load(file.path()).unwrap();
        assert!(config.is_one_init());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed: 1").unwrap();
        let config = ExperimentConfig::load(file.path()).unwrap();
        assert!(!config.is_one_init());

        assert!(ExperimentConfig::load(Path::new("/nonexistent/config.yaml")).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = get();
        assert!(config.figure_width > 0 && config.figure_height > 0);
    }
}
