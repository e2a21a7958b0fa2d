//! Application configuration.

use crate::error::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Relay configuration, loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Shared ingestion secret; empty accepts any sender.
    #[serde(default)]
    pub shared_secret: String,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub mailbox: MailboxSettings,
    #[serde(default)]
    pub symbols: SymbolTableSettings,
    #[serde(default)]
    pub pairings: PairingSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

/// Liveness sweep tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Sweep cadence in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Heartbeat staleness before an Online account goes Offline.
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_heartbeat_timeout_secs() -> u64 {
    30
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
        }
    }
}

/// Mailbox tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxSettings {
    /// Maximum commands per account.
    #[serde(default = "default_mailbox_capacity")]
    pub capacity: usize,
    /// Command max age in seconds before the sweep drops it.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Expiry sweep cadence in seconds.
    #[serde(default = "default_expiry_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_mailbox_capacity() -> usize {
    1000
}

fn default_max_age_secs() -> u64 {
    300
}

fn default_expiry_interval_secs() -> u64 {
    60
}

impl Default for MailboxSettings {
    fn default() -> Self {
        Self {
            capacity: default_mailbox_capacity(),
            max_age_secs: default_max_age_secs(),
            sweep_interval_secs: default_expiry_interval_secs(),
        }
    }
}

/// Symbol table locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolTableSettings {
    /// Local base alias table, tried first.
    #[serde(default = "default_base_mappings_path")]
    pub base_mappings_path: Option<String>,
    /// Remote fallback for the base table; fetched with a short timeout
    /// and skipped on failure.
    #[serde(default)]
    pub base_mappings_url: Option<String>,
    /// Persisted user-curated mappings.
    #[serde(default = "default_custom_mappings_path")]
    pub custom_mappings_path: String,
}

fn default_base_mappings_path() -> Option<String> {
    Some("data/symbol_mappings.json".to_string())
}

fn default_custom_mappings_path() -> String {
    "data/custom_symbol_mappings.json".to_string()
}

impl Default for SymbolTableSettings {
    fn default() -> Self {
        Self {
            base_mappings_path: default_base_mappings_path(),
            base_mappings_url: None,
            custom_mappings_path: default_custom_mappings_path(),
        }
    }
}

/// Pairing store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingSettings {
    #[serde(default = "default_pairings_path")]
    pub path: String,
}

fn default_pairings_path() -> String {
    "data/copy_pairs.json".to_string()
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            path: default_pairings_path(),
        }
    }
}

/// Outcome history tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

fn default_history_capacity() -> usize {
    500
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

impl RelayConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from a TOML file if it exists, else built-in defaults.
    pub fn load_or_default(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            info!(%path, "No config file, using defaults");
            Ok(Self::default())
        }
    }
}
