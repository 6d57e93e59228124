use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per module fetch (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            // Infinite or out-of-range values fall back to the default delay.
            base_delay: Duration::try_from_secs_f64(self.base_delay_secs.max(0.0))
                .unwrap_or(RetryPolicy::default().base_delay),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/tfmod/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfmodConfig {
    /// Upper bound on fetches running at once inside a batch (None = available parallelism).
    #[serde(default)]
    pub max_parallel_fetches: Option<usize>,
    /// When false, remote modules are never downloaded; loaders report "not loaded".
    pub download_external_modules: bool,
    /// Directory (relative to the scanned root) that receives fetched modules.
    pub external_modules_dir: String,
    /// Per-module fetch timeout in seconds (None = wait forever).
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
    /// Git executable used for checkouts.
    pub git_binary: String,
    /// Host used for registry addresses without an explicit host. May carry a
    /// scheme (`http://mirror:8080`); plain hosts are reached over https.
    pub registry_host: String,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for TfmodConfig {
    fn default() -> Self {
        Self {
            max_parallel_fetches: None,
            download_external_modules: true,
            external_modules_dir: ".external_modules".to_string(),
            fetch_timeout_secs: None,
            git_binary: "git".to_string(),
            registry_host: "registry.terraform.io".to_string(),
            retry: None,
        }
    }
}

impl TfmodConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tfmod")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from an explicit file. The file must exist.
pub fn load_from_path(path: &Path) -> Result<TfmodConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: TfmodConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TfmodConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TfmodConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}
