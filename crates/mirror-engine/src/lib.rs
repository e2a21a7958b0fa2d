//! Signal processing engine.
//!
//! Takes one master signal and fans it out to every subscribed, eligible
//! slave: resolves the pairings under the subscription key, gates on the
//! master's liveness, translates the symbol and volume into each slave
//! broker's conventions, converts the event into a command, and enqueues
//! it onto the slave's mailbox. Each slave is processed independently; one
//! slave's failure never aborts its siblings, and every outcome is
//! recorded.

pub mod convert;
pub mod engine;
pub mod history;
pub mod translate;
pub mod volume;

pub use convert::{build_command, ConvertError, Conversion};
pub use engine::{SignalEngine, SignalRejected};
pub use history::CopyHistory;
pub use translate::{SignalTranslator, TranslateError};
pub use volume::compute_volume;
