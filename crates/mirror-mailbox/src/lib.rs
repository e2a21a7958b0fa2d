//! Per-account command mailbox.
//!
//! Slave terminals cannot be pushed to; they poll. Each account gets an
//! independent bounded, insertion-ordered inbox of pending commands.
//! Delivery is at-least-once: a poll with auto-acknowledge marks commands
//! delivered as a side effect, and a terminal crash between poll and
//! execution can duplicate work, which the correlation comment absorbs.

pub mod mailbox;
pub mod sweep;

pub use mailbox::{CommandMailbox, MailboxConfig, MailboxStats};
pub use sweep::spawn_expiry_sweep;
