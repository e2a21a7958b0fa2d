//! Broker catalog store.
//!
//! Terminals report their broker's tradable symbols (with contract sizes
//! and volume limits) and the account balance. The store is read-mostly:
//! translation and volume calculation consult it on every fan-out.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mirror_core::{AccountId, Volume};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One tradable symbol as the broker defines it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolEntry {
    #[serde(alias = "name")]
    pub symbol: String,
    #[serde(default)]
    pub contract_size: Option<Decimal>,
    #[serde(default)]
    pub volume_min: Option<Volume>,
    #[serde(default)]
    pub volume_max: Option<Volume>,
    #[serde(default)]
    pub volume_step: Option<Volume>,
}

/// A full catalog report from one terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogReport {
    pub broker: String,
    #[serde(default)]
    pub balance: Option<Decimal>,
    pub symbols: Vec<SymbolEntry>,
}

#[derive(Debug, Clone)]
struct AccountCatalog {
    broker: String,
    balance: Option<Decimal>,
    symbols: Vec<SymbolEntry>,
    updated_at: DateTime<Utc>,
}

/// Per-account broker catalogs.
#[derive(Default)]
pub struct BrokerCatalog {
    entries: DashMap<AccountId, AccountCatalog>,
}

impl BrokerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) an account's catalog.
    pub fn store(&self, account: &AccountId, report: CatalogReport) {
        self.entries.insert(
            account.clone(),
            AccountCatalog {
                broker: report.broker,
                balance: report.balance,
                symbols: report.symbols,
                updated_at: Utc::now(),
            },
        );
    }

    /// Update only the balance, keeping the symbol list.
    pub fn update_balance(&self, account: &AccountId, balance: Decimal) {
        if let Some(mut entry) = self.entries.get_mut(account) {
            entry.balance = Some(balance);
            entry.updated_at = Utc::now();
        }
    }

    /// All symbols the account's broker offers. Empty when no catalog has
    /// been reported, which callers treat as "no constraint".
    pub fn available_symbols(&self, account: &AccountId) -> Vec<String> {
        self.entries
            .get(account)
            .map(|c| c.symbols.iter().map(|s| s.symbol.clone()).collect())
            .unwrap_or_default()
    }

    /// Catalog entry for one symbol, exact name match.
    pub fn symbol_entry(&self, account: &AccountId, symbol: &str) -> Option<SymbolEntry> {
        self.entries
            .get(account)?
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .cloned()
    }

    /// Contract size for a symbol, when the broker reported one.
    pub fn contract_size(&self, account: &AccountId, symbol: &str) -> Option<Decimal> {
        self.symbol_entry(account, symbol)?.contract_size
    }

    pub fn balance(&self, account: &AccountId) -> Option<Decimal> {
        self.entries.get(account)?.balance
    }

    pub fn broker_name(&self, account: &AccountId) -> Option<String> {
        self.entries.get(account).map(|c| c.broker.clone())
    }

    pub fn last_updated(&self, account: &AccountId) -> Option<DateTime<Utc>> {
        self.entries.get(account).map(|c| c.updated_at)
    }

    pub fn remove(&self, account: &AccountId) {
        self.entries.remove(account);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn report() -> CatalogReport {
        CatalogReport {
            broker: "XM Global".to_string(),
            balance: Some(dec!(10000)),
            symbols: vec![
                SymbolEntry {
                    symbol: "EURUSD".to_string(),
                    contract_size: Some(dec!(100000)),
                    volume_min: Some(Volume::new(dec!(0.01))),
                    volume_max: Some(Volume::new(dec!(100))),
                    volume_step: Some(Volume::new(dec!(0.01))),
                },
                SymbolEntry {
                    symbol: "XAUUSD".to_string(),
                    contract_size: Some(dec!(100)),
                    volume_min: None,
                    volume_max: None,
                    volume_step: None,
                },
            ],
        }
    }

    #[test]
    fn test_store_and_lookup() {
        let catalog = BrokerCatalog::new();
        let account = AccountId::new("222222");
        catalog.store(&account, report());

        assert_eq!(catalog.available_symbols(&account).len(), 2);
        assert_eq!(catalog.contract_size(&account, "XAUUSD"), Some(dec!(100)));
        assert_eq!(catalog.balance(&account), Some(dec!(10000)));
        assert_eq!(catalog.broker_name(&account).as_deref(), Some("XM Global"));
    }

    #[test]
    fn test_missing_account_is_unconstrained() {
        let catalog = BrokerCatalog::new();
        let account = AccountId::new("404");
        assert!(catalog.available_symbols(&account).is_empty());
        assert!(catalog.symbol_entry(&account, "EURUSD").is_none());
        assert!(catalog.balance(&account).is_none());
    }

    #[test]
    fn test_balance_update_keeps_symbols() {
        let catalog = BrokerCatalog::new();
        let account = AccountId::new("222222");
        catalog.store(&account, report());
        catalog.update_balance(&account, dec!(8500));

        assert_eq!(catalog.balance(&account), Some(dec!(8500)));
        assert_eq!(catalog.available_symbols(&account).len(), 2);
    }

    #[test]
    fn test_symbol_entry_wire_alias() {
        let entry: SymbolEntry = serde_json::from_str(
            r#"{"name": "EURUSD", "contract_size": 100000, "volume_min": "0.01"}"#,
        )
        .unwrap();
        assert_eq!(entry.symbol, "EURUSD");
        assert_eq!(entry.contract_size, Some(dec!(100000)));
    }
}
