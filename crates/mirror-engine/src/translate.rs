//! Per-slave symbol translation.

use mirror_core::AccountId;
use mirror_registry::AccountRegistry;
use mirror_symbols::{normalize_symbol, SymbolResolver};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Translation failure: non-retryable, scoped to one (signal, slave) pair.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Symbol {symbol} not available for account {account}")]
    NotAvailable { symbol: String, account: AccountId },
}

/// Picks the slave-broker symbol for one signal.
///
/// The account's own curated overrides win; after that, either the
/// auto-map ladder (exact, case-insensitive, normalized, then the full
/// resolver cascade) or the resolver alone, depending on the pairing's
/// `auto_map_symbol` setting.
pub struct SignalTranslator {
    registry: Arc<AccountRegistry>,
    resolver: Arc<SymbolResolver>,
}

impl SignalTranslator {
    pub fn new(registry: Arc<AccountRegistry>, resolver: Arc<SymbolResolver>) -> Self {
        Self { registry, resolver }
    }

    /// Translate `symbol` for one target account.
    ///
    /// An account with no reported catalog has no constraint list; table
    /// mappings still apply but nothing can be validated against the
    /// broker's offerings.
    pub fn translate_for_account(
        &self,
        symbol: &str,
        account: &AccountId,
        auto_map: bool,
    ) -> Result<String, TranslateError> {
        let available = self.registry.catalog().available_symbols(account);
        if available.is_empty() {
            debug!(%account, "No catalog for account, translating unconstrained");
        }

        if let Some(mapped) = self.user_mapping(symbol, account, &available) {
            return Ok(mapped);
        }

        let resolved = if auto_map {
            self.auto_map(symbol, &available)
        } else {
            self.resolver.resolve(symbol, &available)
        };

        resolved.ok_or_else(|| {
            warn!(%symbol, %account, "Translation failed");
            TranslateError::NotAvailable {
                symbol: symbol.to_string(),
                account: account.clone(),
            }
        })
    }

    /// First matching user-curated override, validated against the
    /// catalog (case-adjusted to the broker's spelling when needed).
    fn user_mapping(
        &self,
        symbol: &str,
        account: &AccountId,
        available: &[String],
    ) -> Option<String> {
        let mappings = self.registry.symbol_mappings(account);
        let mapping = mappings
            .iter()
            .find(|m| m.source.eq_ignore_ascii_case(symbol))?;

        if available.is_empty() || available.iter().any(|s| s == &mapping.target) {
            debug!(%symbol, target = %mapping.target, %account, "User mapping applied");
            return Some(mapping.target.clone());
        }
        if let Some(adjusted) = available
            .iter()
            .find(|s| s.eq_ignore_ascii_case(&mapping.target))
        {
            debug!(%symbol, target = %adjusted, %account, "User mapping applied (case-adjusted)");
            return Some(adjusted.clone());
        }

        warn!(
            %symbol,
            target = %mapping.target,
            %account,
            "User-mapped symbol not offered by broker, falling through"
        );
        None
    }

    fn auto_map(&self, symbol: &str, available: &[String]) -> Option<String> {
        if available.iter().any(|s| s == symbol) {
            return Some(symbol.to_string());
        }
        if let Some(candidate) = available.iter().find(|s| s.eq_ignore_ascii_case(symbol)) {
            return Some(candidate.clone());
        }
        let normalized = normalize_symbol(symbol);
        if !normalized.is_empty() {
            if let Some(candidate) = available
                .iter()
                .find(|s| normalize_symbol(s) == normalized)
            {
                return Some(candidate.clone());
            }
        }
        self.resolver.resolve(symbol, available)
    }
}
