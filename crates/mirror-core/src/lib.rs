//! Core domain types for the mirror trade relay.
//!
//! This crate provides the types shared by every component:
//! - `AccountId`: terminal account identifier
//! - `Volume`, `Price`: precision-safe numeric types
//! - `Signal`, `Command`: the input event and output instruction
//! - `Pairing`, `PairSettings`: master/slave relationship and copy settings
//! - `SlaveOutcome`, `FanoutReport`: recorded per-slave results

pub mod account;
pub mod command;
pub mod decimal;
pub mod error;
pub mod outcome;
pub mod pairing;
pub mod signal;

pub use account::AccountId;
pub use command::{AckRequest, Command, CommandAction, PollResponse, QueueId, QueuedCommand};
pub use decimal::{Price, Volume};
pub use error::{CoreError, Result};
pub use outcome::{FanoutReport, OutcomeStatus, SlaveOutcome};
pub use pairing::{PairSettings, PairStatus, Pairing, VolumeMode};
pub use signal::{Signal, SignalEvent, TradeDirection};
