//! Per-slave fan-out outcomes.
//!
//! Every (signal, slave) pair produces exactly one recorded outcome;
//! nothing is dropped without at least one entry.

use crate::decimal::Volume;
use crate::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result class for one (signal, slave) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// A command was enqueued onto the slave's mailbox.
    Dispatched,
    /// The signal was a deliberate no-op for this slave.
    Skipped,
    /// Translation, conversion, or eligibility failed for this slave.
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatched => write!(f, "dispatched"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Recorded outcome for one (signal, slave) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaveOutcome {
    pub master: AccountId,
    pub slave: AccountId,
    /// Textual action ("buy", "close_by_comment", or the raw event for
    /// failures before conversion).
    pub action: String,
    /// Master-side symbol.
    pub symbol: String,
    /// Slave-side volume, when one was computed.
    pub volume: Option<Volume>,
    pub status: OutcomeStatus,
    /// Specific reason: why it failed or was skipped, or what was sent.
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

impl SlaveOutcome {
    pub fn new(
        master: AccountId,
        slave: AccountId,
        action: impl Into<String>,
        symbol: impl Into<String>,
        volume: Option<Volume>,
        status: OutcomeStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            master,
            slave,
            action: action.into(),
            symbol: symbol.into(),
            volume,
            status,
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Aggregate result of fanning one signal out to its slaves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutReport {
    pub dispatched: usize,
    pub failed: usize,
    pub skipped: usize,
    /// One entry per considered pairing, in processing order.
    pub outcomes: Vec<SlaveOutcome>,
}

impl FanoutReport {
    /// Overall success: at least one command reached a mailbox.
    pub fn success(&self) -> bool {
        self.dispatched > 0
    }

    /// Record an outcome and bump the matching counter.
    pub fn record(&mut self, outcome: SlaveOutcome) {
        match outcome.status {
            OutcomeStatus::Dispatched => self.dispatched += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: OutcomeStatus) -> SlaveOutcome {
        SlaveOutcome::new(
            AccountId::new("1"),
            AccountId::new("2"),
            "buy",
            "EURUSD",
            None,
            status,
            "test",
        )
    }

    #[test]
    fn test_report_counts_and_success() {
        let mut report = FanoutReport::default();
        assert!(!report.success());

        report.record(outcome(OutcomeStatus::Dispatched));
        report.record(outcome(OutcomeStatus::Failed));
        report.record(outcome(OutcomeStatus::Skipped));

        assert_eq!(report.dispatched, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.success());
    }
}
