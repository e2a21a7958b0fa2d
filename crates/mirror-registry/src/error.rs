//! Error types for mirror-registry.

use mirror_core::AccountId;
use thiserror::Error;

/// Registry error types.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Account {0} is not registered")]
    UnknownAccount(AccountId),

    #[error("Account {0} is already registered")]
    AlreadyRegistered(AccountId),

    #[error("Account {account} cannot move from {from} to {to}")]
    InvalidTransition {
        account: AccountId,
        from: &'static str,
        to: &'static str,
    },
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
