//! Per-account lifecycle state.

use chrono::{DateTime, Utc};
use mirror_core::AccountId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a terminal account.
///
/// `Paused` is sticky: only an explicit resume leaves it, and the liveness
/// sweep must never overwrite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Registered but no broker catalog received yet; cannot trade.
    WaitingForActivation,
    /// Terminal is connected and heartbeating.
    Online,
    /// Heartbeats went stale.
    Offline,
    /// Operator paused the account; wins over automatic transitions.
    Paused,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForActivation => "WaitingForActivation",
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Paused => "Paused",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user-curated symbol override for an account.
///
/// Checked before any automatic mapping; the first entry whose `source`
/// matches the signal's symbol (case-insensitively) wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolMapping {
    #[serde(alias = "from")]
    pub source: String,
    #[serde(alias = "to")]
    pub target: String,
}

/// Persisted record for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account: AccountId,
    pub nickname: String,
    pub status: AccountStatus,
    /// Broker name, known once the first catalog report arrives.
    pub broker: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Set by the first catalog report and never cleared afterwards.
    pub symbol_data_received: bool,
    /// Ordered user-curated symbol overrides.
    pub symbol_mappings: Vec<SymbolMapping>,
    pub created_at: DateTime<Utc>,
}

impl AccountRecord {
    pub fn new(account: AccountId, nickname: impl Into<String>) -> Self {
        Self {
            account,
            nickname: nickname.into(),
            status: AccountStatus::WaitingForActivation,
            broker: None,
            last_heartbeat: None,
            symbol_data_received: false,
            symbol_mappings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the terminal is currently considered connected.
    pub fn is_alive(&self) -> bool {
        self.status == AccountStatus::Online
    }

    /// Heartbeat staleness relative to `now`; `None` before any heartbeat.
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_heartbeat.map(|hb| now - hb)
    }
}
