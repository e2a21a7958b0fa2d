//! Account lifecycle, liveness, and broker catalog.
//!
//! Tracks every known terminal account through its lifecycle
//! (WaitingForActivation → Online ⇄ Offline, with a sticky operator-driven
//! Paused state), stores the broker catalog each terminal reports, and
//! gates dispatch through `can_receive_orders`.

pub mod account;
pub mod catalog;
pub mod error;
pub mod registry;
pub mod sweep;

pub use account::{AccountRecord, AccountStatus, SymbolMapping};
pub use catalog::{BrokerCatalog, CatalogReport, SymbolEntry};
pub use error::{RegistryError, RegistryResult};
pub use registry::{AccountRegistry, OrderGate};
pub use sweep::spawn_liveness_sweep;
