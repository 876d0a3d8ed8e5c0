//! Configuration for the shop engine.
//!
//! TOML-backed with sensible defaults; every field may be omitted. The
//! embedding host loads one of these at startup and hands the values to
//! [`crate::shop::ShopService`] construction.
//!
//! ```toml
//! data_dir = "data/shops"
//! pending_timeout_secs = 60
//! recognized_currency_kinds = ["emerald", "gold_ingot"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the sled database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Seconds a pending command waits for its follow-up interaction.
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,
    /// Item kinds accepted as currency. Empty accepts everything.
    #[serde(default)]
    pub recognized_currency_kinds: Vec<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/shops")
}

fn default_pending_timeout_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            pending_timeout_secs: default_pending_timeout_secs(),
            recognized_currency_kinds: Vec::new(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("reading config file {}", path.as_ref().display()))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw).context("parsing config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pending_timeout_secs == 0 {
            return Err(anyhow!("pending_timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    pub fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }
}
