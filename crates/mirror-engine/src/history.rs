//! Bounded in-memory copy-outcome history.

use mirror_core::SlaveOutcome;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Ring of the most recent per-slave outcomes.
///
/// Backs the operator-facing history view; the aggregate counts the
/// ingestion layer sees come from the fan-out report instead.
pub struct CopyHistory {
    entries: Mutex<VecDeque<SlaveOutcome>>,
    capacity: usize,
}

impl CopyHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Append an outcome, evicting the oldest entry when full.
    pub fn record(&self, outcome: SlaveOutcome) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(outcome);
    }

    /// The latest `limit` outcomes, newest first.
    pub fn recent(&self, limit: usize) -> Vec<SlaveOutcome> {
        let entries = self.entries.lock();
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for CopyHistory {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::{AccountId, OutcomeStatus};

    fn outcome(reason: &str) -> SlaveOutcome {
        SlaveOutcome::new(
            AccountId::new("1"),
            AccountId::new("2"),
            "buy",
            "EURUSD",
            None,
            OutcomeStatus::Dispatched,
            reason,
        )
    }

    #[test]
    fn test_capacity_bound() {
        let history = CopyHistory::new(3);
        for i in 0..5 {
            history.record(outcome(&format!("r{i}")));
        }
        assert_eq!(history.len(), 3);

        let recent = history.recent(10);
        assert_eq!(recent[0].reason, "r4");
        assert_eq!(recent[2].reason, "r2");
    }

    #[test]
    fn test_recent_limit() {
        let history = CopyHistory::default();
        for i in 0..10 {
            history.record(outcome(&format!("r{i}")));
        }
        assert_eq!(history.recent(4).len(), 4);
    }
}
