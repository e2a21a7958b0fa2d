//! Prometheus metrics for the relay.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally: a registration
//! failure means duplicate metric names, a fatal configuration error that
//! should crash at startup. These panics only occur during static
//! initialization, never at runtime.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge, TextEncoder,
};

/// Signals accepted into fan-out.
pub static SIGNALS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("mirror_signals_total", "Total signals processed").unwrap()
});

/// Signals rejected before any per-slave work.
/// Labels: reason (unknown_key/master_gate)
pub static SIGNALS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mirror_signals_rejected_total",
        "Signals rejected before fan-out",
        &["reason"]
    )
    .unwrap()
});

/// Per-slave outcomes by status.
/// Labels: status (dispatched/skipped/failed)
pub static SLAVE_OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mirror_slave_outcomes_total",
        "Per-slave fan-out outcomes",
        &["status"]
    )
    .unwrap()
});

/// Commands delivered to polling terminals.
pub static COMMANDS_DELIVERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mirror_commands_delivered_total",
        "Commands handed to polling terminals"
    )
    .unwrap()
});

/// Unacknowledged commands currently sitting in mailboxes.
/// Refreshed from mailbox stats when metrics are rendered.
pub static MAILBOX_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "mirror_mailbox_pending_commands",
        "Unacknowledged commands across all mailboxes"
    )
    .unwrap()
});

/// Commands dropped by the mailbox expiry sweep since startup.
pub static COMMANDS_EXPIRED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "mirror_commands_expired",
        "Commands dropped past max age since startup"
    )
    .unwrap()
});

/// Render all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    Ok(encoder.encode_to_string(&families)?)
}
