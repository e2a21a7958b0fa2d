//! Master-side trading signals.
//!
//! A `Signal` is one trading event reported by a master terminal. The wire
//! shape follows what master EAs actually send: `event` names like
//! `deal_add`, a `type` field for direction, and `tp`/`sl` shorthand.

use crate::decimal::{Price, Volume};
use crate::error::CoreError;
use crate::AccountId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of trading event reported by a master terminal.
///
/// Master EAs report the MT5-style event names; both the deal- and
/// order-level variants of each map to the same kind here. Anything
/// unrecognized parses to `Unknown` rather than failing the whole
/// payload, so the fan-out can record a per-slave failure for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// New position opened (`deal_add` / `order_add`).
    Open,
    /// Position closed, fully or partially (`deal_close` / `position_close`).
    Close,
    /// Stop-loss / take-profit changed (`position_modify` / `modify`).
    Modify,
    /// Unrecognized event name.
    Unknown,
}

impl SignalEvent {
    /// Parse a wire event name.
    pub fn from_wire(event: &str) -> Self {
        match event.trim().to_ascii_lowercase().as_str() {
            "deal_add" | "order_add" => Self::Open,
            "deal_close" | "position_close" => Self::Close,
            "position_modify" | "modify" => Self::Modify,
            _ => Self::Unknown,
        }
    }

    /// Canonical wire name for serialization.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Open => "deal_add",
            Self::Close => "deal_close",
            Self::Modify => "position_modify",
            Self::Unknown => "unknown",
        }
    }
}

impl Serialize for SignalEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for SignalEvent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}

impl fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::Modify => write!(f, "modify"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Trade direction.
///
/// Masters send `BUY`/`SELL`; lowercase spellings are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeDirection {
    #[serde(rename = "BUY", alias = "buy", alias = "Buy")]
    Buy,
    #[serde(rename = "SELL", alias = "sell", alias = "Sell")]
    Sell,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(CoreError::InvalidDirection(other.to_string())),
        }
    }
}

/// One trading event from a master terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Source (master) account.
    pub account: AccountId,
    /// Event kind.
    pub event: SignalEvent,
    /// Instrument symbol as the master's broker names it.
    pub symbol: String,
    /// Direction; masters send this as `type`.
    #[serde(default, rename = "type")]
    pub direction: Option<TradeDirection>,
    /// Traded volume in lots. For close events, a positive value marks a
    /// partial close.
    #[serde(default)]
    pub volume: Option<Volume>,
    /// Execution price, if reported.
    #[serde(default)]
    pub price: Option<Price>,
    /// Take-profit level.
    #[serde(default, rename = "tp", alias = "take_profit")]
    pub take_profit: Option<Price>,
    /// Stop-loss level.
    #[serde(default, rename = "sl", alias = "stop_loss")]
    pub stop_loss: Option<Price>,
    /// Master-side order id, used for correlation on close/modify.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Free-form comment from the master terminal.
    #[serde(default)]
    pub comment: Option<String>,
}

impl Signal {
    /// Whether this is a close event carrying a positive volume,
    /// i.e. a partial close.
    pub fn is_partial_close(&self) -> bool {
        self.event == SignalEvent::Close && self.volume.map(|v| v.is_positive()).unwrap_or(false)
    }
}
