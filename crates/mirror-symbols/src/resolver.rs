//! The symbol resolution cascade.

use crate::normalize::normalize_symbol;
use crate::similarity::similarity;
use crate::tables::CANONICAL_VARIANTS;
use crate::error::Result;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Confident fuzzy-match threshold.
const FUZZY_THRESHOLD: f64 = 0.55;
/// Last-resort fuzzy threshold; matches are logged as low-confidence.
const FUZZY_THRESHOLD_LOW: f64 = 0.45;

/// Stateless-per-call symbol resolver with cached results.
///
/// Holds three mapping tables: user-curated mappings (highest priority,
/// persisted), the shared base table (loaded at startup), and the built-in
/// canonical-instrument table. Resolution results, including misses, are
/// cached per (symbol, candidate set); any custom-mapping change clears
/// the whole cache.
pub struct SymbolResolver {
    base: RwLock<HashMap<String, String>>,
    custom: RwLock<HashMap<String, String>>,
    cache: DashMap<String, Option<String>>,
    custom_path: Option<PathBuf>,
}

impl SymbolResolver {
    pub fn new() -> Self {
        Self {
            base: RwLock::new(HashMap::new()),
            custom: RwLock::new(HashMap::new()),
            cache: DashMap::new(),
            custom_path: None,
        }
    }

    /// Persist custom mappings to `path`, loading any existing file now.
    pub fn with_custom_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, String>>(&content) {
                Ok(mappings) => {
                    info!(path = %path.display(), count = mappings.len(), "Loaded custom symbol mappings");
                    *self.custom.write() = mappings;
                }
                Err(err) => warn!(path = %path.display(), %err, "Custom mapping file unreadable"),
            },
            Err(_) => debug!(path = %path.display(), "No custom mapping file yet"),
        }
        self.custom_path = Some(path);
        self
    }

    /// Install the shared base alias table (see [`crate::tables::load_base_mappings`]).
    pub fn set_base_mappings(&self, mappings: HashMap<String, String>) {
        *self.base.write() = mappings;
        self.cache.clear();
    }

    /// Resolve `symbol` against the candidate list.
    ///
    /// An empty `available` list means no constraint: table lookups still
    /// apply but nothing can be validated or fuzzily matched against.
    /// Returns `None` when no strategy produces a candidate.
    pub fn resolve(&self, symbol: &str, available: &[String]) -> Option<String> {
        if symbol.is_empty() {
            return None;
        }

        let cache_key = Self::cache_key(symbol, available);
        if let Some(hit) = self.cache.get(&cache_key) {
            return hit.clone();
        }

        let resolved = self.resolve_uncached(symbol, available);
        self.cache.insert(cache_key, resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, symbol: &str, available: &[String]) -> Option<String> {
        // 1) Exact, case-sensitive.
        if available.iter().any(|s| s == symbol) {
            debug!(%symbol, "Exact match");
            return Some(symbol.to_string());
        }

        // 2) User-curated mapping.
        if let Some(target) = self.custom.read().get(symbol) {
            if let Some(validated) = Self::validated(target, available) {
                debug!(%symbol, target = %validated, "Custom mapping");
                return Some(validated);
            }
        }

        // 3) Shared base table.
        if let Some(target) = self.base.read().get(symbol) {
            if let Some(validated) = Self::validated(target, available) {
                debug!(%symbol, target = %validated, "Base mapping");
                return Some(validated);
            }
        }

        // 4) Built-in canonical-instrument variants.
        if let Some(candidate) = Self::canonical_match(symbol, available) {
            debug!(%symbol, %candidate, "Canonical variant match");
            return Some(candidate);
        }

        // 5) Case-insensitive exact.
        if let Some(candidate) = available
            .iter()
            .find(|s| s.eq_ignore_ascii_case(symbol))
        {
            debug!(%symbol, %candidate, "Case-insensitive match");
            return Some(candidate.clone());
        }

        // 6) Normalized equality.
        let normalized = normalize_symbol(symbol);
        if !normalized.is_empty() {
            if let Some(candidate) = available
                .iter()
                .find(|s| normalize_symbol(s) == normalized)
            {
                debug!(%symbol, %candidate, "Normalized match");
                return Some(candidate.clone());
            }
        }

        // 7) Fuzzy, confident threshold.
        if let Some((candidate, score)) = Self::fuzzy_best(symbol, available, FUZZY_THRESHOLD) {
            debug!(%symbol, %candidate, score, "Fuzzy match");
            return Some(candidate);
        }

        // 8) Fuzzy, low-confidence fallback.
        if let Some((candidate, score)) = Self::fuzzy_best(symbol, available, FUZZY_THRESHOLD_LOW) {
            warn!(%symbol, %candidate, score, "Low-confidence fuzzy match");
            return Some(candidate);
        }

        warn!(%symbol, "No mapping found");
        None
    }

    /// A mapping target is usable if there is no constraint list or the
    /// target appears in it; the broker's own casing wins.
    fn validated(target: &str, available: &[String]) -> Option<String> {
        if available.is_empty() {
            return Some(target.to_string());
        }
        available
            .iter()
            .find(|s| s.eq_ignore_ascii_case(target))
            .cloned()
    }

    fn canonical_match(symbol: &str, available: &[String]) -> Option<String> {
        let variants = CANONICAL_VARIANTS.get(symbol.to_ascii_uppercase().as_str())?;
        for candidate in available {
            if variants.iter().any(|v| v.eq_ignore_ascii_case(candidate)) {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Best fuzzy candidate strictly above `threshold`; ties broken by
    /// scan order. Scores both the raw and normalized forms.
    fn fuzzy_best(symbol: &str, available: &[String], threshold: f64) -> Option<(String, f64)> {
        let normalized = normalize_symbol(symbol);
        let mut best: Option<(String, f64)> = None;

        for candidate in available {
            let raw = similarity(symbol, candidate);
            let norm = similarity(&normalized, &normalize_symbol(candidate));
            let score = raw.max(norm);

            if score >= threshold && best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                best = Some((candidate.clone(), score));
            }
        }

        best
    }

    fn cache_key(symbol: &str, available: &[String]) -> String {
        let mut sorted: Vec<&str> = available.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        format!("{symbol}|{}", sorted.join(","))
    }

    /// Add a user-curated mapping and persist it. Invalidates the cache.
    pub fn add_custom_mapping(&self, source: impl Into<String>, target: impl Into<String>) -> Result<()> {
        let source = source.into();
        let target = target.into();
        {
            let mut custom = self.custom.write();
            custom.insert(source.clone(), target.clone());
            self.persist_custom(&custom)?;
        }
        self.cache.clear();
        info!(%source, %target, "Added custom symbol mapping");
        Ok(())
    }

    /// Remove a user-curated mapping. Returns whether it existed.
    pub fn remove_custom_mapping(&self, source: &str) -> Result<bool> {
        let removed = {
            let mut custom = self.custom.write();
            let removed = custom.remove(source).is_some();
            if removed {
                self.persist_custom(&custom)?;
            }
            removed
        };
        if removed {
            self.cache.clear();
            info!(%source, "Removed custom symbol mapping");
        }
        Ok(removed)
    }

    fn persist_custom(&self, custom: &HashMap<String, String>) -> Result<()> {
        let Some(path) = &self.custom_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(custom)?)?;
        Ok(())
    }

    /// Number of cached resolution results.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_beats_fuzzy() {
        let resolver = SymbolResolver::new();
        for symbol in ["EURUSD", "XAUUSDm", "US500", "BTCUSD.cash"] {
            let avail = available(&[symbol]);
            assert_eq!(resolver.resolve(symbol, &avail).as_deref(), Some(symbol));
        }
    }

    #[test]
    fn test_suffix_normalization_resolves() {
        let resolver = SymbolResolver::new();
        let avail = available(&["XAUUSD", "EURUSD"]);
        assert_eq!(
            resolver.resolve("XAUUSDm", &avail).as_deref(),
            Some("XAUUSD")
        );
    }

    #[test]
    fn test_semantic_alias_resolves_despite_low_edit_similarity() {
        let resolver = SymbolResolver::new();
        let avail = available(&["SP500"]);
        assert_eq!(resolver.resolve("US500", &avail).as_deref(), Some("SP500"));
    }

    #[test]
    fn test_unresolvable_symbol_is_none() {
        let resolver = SymbolResolver::new();
        let avail = available(&["EURUSD"]);
        assert_eq!(resolver.resolve("ZZZNOPE", &avail), None);
    }

    #[test]
    fn test_case_insensitive_match() {
        let resolver = SymbolResolver::new();
        let avail = available(&["XauUsd"]);
        assert_eq!(resolver.resolve("XAUUSD", &avail).as_deref(), Some("XauUsd"));
    }

    #[test]
    fn test_custom_mapping_wins_and_invalidates_cache() {
        let resolver = SymbolResolver::new();
        let avail = available(&["GC.fut", "ZB.fut"]);

        // Without the mapping there is no plausible candidate.
        assert_eq!(resolver.resolve("XAUUSD", &avail), None);
        assert!(resolver.cache_len() > 0);

        resolver.add_custom_mapping("XAUUSD", "GC.fut").unwrap();
        assert_eq!(resolver.cache_len(), 0);
        assert_eq!(
            resolver.resolve("XAUUSD", &avail).as_deref(),
            Some("GC.fut")
        );
    }

    #[test]
    fn test_custom_mapping_target_must_be_available() {
        let resolver = SymbolResolver::new();
        resolver.add_custom_mapping("GOLD", "XAUUSD.x").unwrap();

        // Target not offered by this broker: falls through the cascade,
        // which still finds XAUUSD via the canonical table.
        let avail = available(&["XAUUSD"]);
        assert_eq!(resolver.resolve("GOLD", &avail).as_deref(), Some("XAUUSD"));
    }

    #[test]
    fn test_misses_are_cached() {
        let resolver = SymbolResolver::new();
        let avail = available(&["EURUSD"]);
        assert_eq!(resolver.resolve("ZZZNOPE", &avail), None);
        let after_first = resolver.cache_len();
        assert_eq!(resolver.resolve("ZZZNOPE", &avail), None);
        assert_eq!(resolver.cache_len(), after_first);
    }

    #[test]
    fn test_base_mapping_applies() {
        let resolver = SymbolResolver::new();
        let mut base = HashMap::new();
        base.insert("WTI".to_string(), "USOIL.cash".to_string());
        resolver.set_base_mappings(base);

        let avail = available(&["USOIL.cash", "EURUSD"]);
        assert_eq!(
            resolver.resolve("WTI", &avail).as_deref(),
            Some("USOIL.cash")
        );
    }

    #[test]
    fn test_no_constraint_list_allows_table_targets() {
        let resolver = SymbolResolver::new();
        resolver.add_custom_mapping("GOLD", "XAUUSD").unwrap();
        assert_eq!(resolver.resolve("GOLD", &[]).as_deref(), Some("XAUUSD"));
    }
}
