//! Slave-facing commands and the mailbox wire shapes.
//!
//! A `Command` is the broker-agnostic instruction derived from one signal
//! for one slave. It only ever lives inside a mailbox entry
//! (`QueuedCommand`), which adds the queue id, timestamp, and
//! acknowledgment flag.

use crate::decimal::{Price, Volume};
use crate::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Action a slave terminal must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    /// Open a buy position.
    Buy,
    /// Open a sell position.
    Sell,
    /// Close part of a position; `volume` carries how much.
    Close,
    /// Close the position whose comment carries the correlation tag.
    CloseByComment,
    /// Close every position on the symbol.
    CloseAll,
    /// Update SL/TP on the position matched by correlation tag.
    ModifyByComment,
}

impl fmt::Display for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Close => "close",
            Self::CloseByComment => "close_by_comment",
            Self::CloseAll => "close_all",
            Self::ModifyByComment => "modify_by_comment",
        };
        write!(f, "{s}")
    }
}

/// Broker-agnostic instruction for one slave account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Target (slave) account.
    pub account: AccountId,
    /// What to do.
    pub action: CommandAction,
    /// Symbol in the slave broker's naming.
    pub symbol: String,
    /// Volume in lots, where the action needs one.
    #[serde(default)]
    pub volume: Option<Volume>,
    /// Limit/entry price, if any.
    #[serde(default)]
    pub price: Option<Price>,
    /// Take-profit level.
    #[serde(default)]
    pub take_profit: Option<Price>,
    /// Stop-loss level.
    #[serde(default)]
    pub stop_loss: Option<Price>,
    /// Correlation comment; ties slave positions back to master orders.
    pub comment: String,
}

/// Unique mailbox entry identifier.
///
/// Every enqueue must produce a distinct id so acknowledgments from
/// polling terminals are unambiguous across retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(String);

impl QueueId {
    /// Create a new unique queue id.
    ///
    /// Format: `{account}_{uuid_short}`
    pub fn new(account: &AccountId) -> Self {
        let uuid_short = &Uuid::new_v4().simple().to_string()[..12];
        Self(format!("{account}_{uuid_short}"))
    }

    /// Create from an existing string (for parsing acknowledgments).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for QueueId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

/// A command held in a per-account mailbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedCommand {
    /// Unique queue id, generated on enqueue.
    pub queue_id: QueueId,
    /// When the command entered the mailbox.
    pub enqueued_at: DateTime<Utc>,
    /// Whether a poller has acknowledged this command.
    pub acknowledged: bool,
    /// The command itself.
    #[serde(flatten)]
    pub command: Command,
}

impl QueuedCommand {
    /// Age of this entry relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.enqueued_at
    }
}

/// Poll response shape handed to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub account: AccountId,
    pub commands: Vec<QueuedCommand>,
    pub count: usize,
}

/// Acknowledgment request shape consumed from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckRequest {
    pub queue_id: QueueId,
    #[serde(default = "default_ack_success")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_ack_success() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_id_unique_and_prefixed() {
        let account = AccountId::new("222222");
        let a = QueueId::new(&account);
        let b = QueueId::new(&account);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("222222_"));
    }

    #[test]
    fn test_command_action_wire_names() {
        assert_eq!(
            serde_json::to_string(&CommandAction::CloseByComment).unwrap(),
            r#""close_by_comment""#
        );
        assert_eq!(CommandAction::ModifyByComment.to_string(), "modify_by_comment");
    }

    #[test]
    fn test_ack_request_defaults() {
        let ack: AckRequest = serde_json::from_str(r#"{"queue_id":"1_abc"}"#).unwrap();
        assert!(ack.success);
        assert!(ack.error.is_none());
    }
}
