//! Error types for mirror-symbols.

use thiserror::Error;

/// Symbol table errors.
///
/// Resolution itself never fails (an unresolvable symbol is `None`);
/// these cover loading and persisting the mapping tables.
#[derive(Debug, Error)]
pub enum SymbolsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mapping file parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base mapping fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// Result type alias for symbol table operations.
pub type Result<T> = std::result::Result<T, SymbolsError>;
