//! Error types for mirror-pairing.

use mirror_core::AccountId;
use thiserror::Error;

/// Pairing directory errors.
#[derive(Debug, Error)]
pub enum PairingError {
    #[error("Account {0} cannot copy to itself")]
    SelfCopy(AccountId),

    #[error("Pairing {master}->{slave} already exists under this key")]
    Duplicate { master: AccountId, slave: AccountId },

    #[error("Pairing {0} not found")]
    UnknownPairing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pairing file parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pairing operations.
pub type PairingResult<T> = std::result::Result<T, PairingError>;
