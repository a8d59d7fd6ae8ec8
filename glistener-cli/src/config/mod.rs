use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

static CONFIG_PATH: OnceCell<PathBuf> = OnceCell::new();

/// Sampling delay used when neither the command line nor the config file sets one
pub const DEFAULT_DELAY_SECS: u64 = 1;

/// Optional settings read from the config file. Command line flags win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Delay between samples, in seconds
    pub delay: Option<u64>,

    /// Path to the nvidia-smi binary
    pub nvidia_smi: Option<PathBuf>,
}

/// Get the config file path
pub fn get_config_path() -> PathBuf {
    CONFIG_PATH.get().cloned().unwrap_or_else(default_config_path)
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glistener")
        .join("config.toml")
}

/// Set custom config path
pub fn set_config_path(path: &str) {
    let _ = CONFIG_PATH.set(PathBuf::from(path));
}

/// Check if config exists
pub fn config_exists() -> bool {
    get_config_path().exists()
}

/// Load configuration. A missing default file yields the defaults, a missing
/// file given with `--config` is an error.
pub fn load_config() -> Result<ListenerConfig> {
    let config_path = get_config_path();

    if !config_path.exists() {
        if CONFIG_PATH.get().is_some() {
            return Err(anyhow::anyhow!(
                "Configuration file not found at {}",
                config_path.display()
            ));
        }
        return Ok(ListenerConfig::default());
    }

    load_config_from(&config_path)
}

/// Load configuration from a specific file
pub fn load_config_from(path: &Path) -> Result<ListenerConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: ListenerConfig =
        toml::from_str(&contents).with_context(|| format!("invalid config {}", path.display()))?;

    tracing::debug!("Loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}
