//! The account registry.

use crate::account::{AccountRecord, AccountStatus, SymbolMapping};
use crate::catalog::{BrokerCatalog, CatalogReport};
use crate::error::{RegistryError, RegistryResult};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use mirror_core::AccountId;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// Verdict of the dispatch gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderGate {
    Pass,
    /// Blocked with the reason recorded against the outcome.
    Block(String),
}

impl OrderGate {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// The blocking reason, or empty for a pass.
    pub fn reason(&self) -> &str {
        match self {
            Self::Pass => "",
            Self::Block(reason) => reason,
        }
    }
}

/// Registry of terminal accounts and their broker catalogs.
///
/// Each record is individually locked through the map; status transitions
/// happen under that per-record lock so a sweep-driven Online→Offline can
/// never interleave with a heartbeat-driven Offline→Online into an
/// inconsistent state.
pub struct AccountRegistry {
    records: DashMap<AccountId, AccountRecord>,
    catalog: BrokerCatalog,
    shared_secret: RwLock<String>,
}

impl AccountRegistry {
    pub fn new(shared_secret: impl Into<String>) -> Self {
        Self {
            records: DashMap::new(),
            catalog: BrokerCatalog::new(),
            shared_secret: RwLock::new(shared_secret.into()),
        }
    }

    /// Register a new account in WaitingForActivation.
    pub fn register(&self, account: AccountId, nickname: impl Into<String>) -> RegistryResult<()> {
        if self.records.contains_key(&account) {
            return Err(RegistryError::AlreadyRegistered(account));
        }
        info!(%account, "Registered account");
        self.records
            .insert(account.clone(), AccountRecord::new(account, nickname));
        Ok(())
    }

    /// Record a heartbeat.
    ///
    /// Brings an Offline account back Online. Never activates a waiting
    /// account (that takes a catalog report) and never resumes a paused
    /// one.
    pub fn heartbeat(&self, account: &AccountId) -> RegistryResult<()> {
        let mut record = self
            .records
            .get_mut(account)
            .ok_or_else(|| RegistryError::UnknownAccount(account.clone()))?;

        record.last_heartbeat = Some(Utc::now());
        if record.status == AccountStatus::Offline {
            info!(%account, "Account back online");
            record.status = AccountStatus::Online;
        }
        Ok(())
    }

    /// Ingest a broker catalog report.
    ///
    /// This is the sole activation trigger: it sets the monotonic
    /// symbol-data flag, records the broker name, and moves the account
    /// Online unless it is paused.
    pub fn catalog_report(&self, account: &AccountId, report: CatalogReport) -> RegistryResult<()> {
        let mut record = self
            .records
            .get_mut(account)
            .ok_or_else(|| RegistryError::UnknownAccount(account.clone()))?;

        record.broker = Some(report.broker.clone());
        record.last_heartbeat = Some(Utc::now());
        if !record.symbol_data_received {
            info!(%account, broker = %report.broker, symbols = report.symbols.len(), "Account activated");
            record.symbol_data_received = true;
        }
        if record.status != AccountStatus::Paused {
            record.status = AccountStatus::Online;
        }
        drop(record);

        self.catalog.store(account, report);
        Ok(())
    }

    /// Operator pause. Reachable from Online or Offline only.
    pub fn pause(&self, account: &AccountId) -> RegistryResult<()> {
        let mut record = self
            .records
            .get_mut(account)
            .ok_or_else(|| RegistryError::UnknownAccount(account.clone()))?;

        match record.status {
            AccountStatus::Online | AccountStatus::Offline => {
                warn!(%account, "Account paused");
                record.status = AccountStatus::Paused;
                Ok(())
            }
            from => Err(RegistryError::InvalidTransition {
                account: account.clone(),
                from: from.as_str(),
                to: AccountStatus::Paused.as_str(),
            }),
        }
    }

    /// Operator resume; the only way out of Paused, always to Online.
    pub fn resume(&self, account: &AccountId) -> RegistryResult<()> {
        let mut record = self
            .records
            .get_mut(account)
            .ok_or_else(|| RegistryError::UnknownAccount(account.clone()))?;

        match record.status {
            AccountStatus::Paused => {
                info!(%account, "Account resumed");
                record.status = AccountStatus::Online;
                Ok(())
            }
            from => Err(RegistryError::InvalidTransition {
                account: account.clone(),
                from: from.as_str(),
                to: AccountStatus::Online.as_str(),
            }),
        }
    }

    /// Delete the account record and its catalog.
    ///
    /// Pairings referencing the account are cascaded by the owner of the
    /// pairing directory.
    pub fn delete(&self, account: &AccountId) -> RegistryResult<()> {
        self.records
            .remove(account)
            .ok_or_else(|| RegistryError::UnknownAccount(account.clone()))?;
        self.catalog.remove(account);
        info!(%account, "Account deleted");
        Ok(())
    }

    /// Dispatch gate: may this account be sent (or send) orders?
    pub fn can_receive_orders(&self, account: &AccountId) -> OrderGate {
        let Some(record) = self.records.get(account) else {
            return OrderGate::Block("not registered".to_string());
        };
        if !record.symbol_data_received {
            return OrderGate::Block("not activated".to_string());
        }
        if record.status == AccountStatus::Paused {
            return OrderGate::Block("paused".to_string());
        }
        OrderGate::Pass
    }

    /// One pass of the liveness sweep: Online accounts whose heartbeat is
    /// older than `staleness` go Offline. Paused and waiting accounts are
    /// untouched.
    pub fn sweep_liveness(&self, staleness: Duration) -> usize {
        let now = Utc::now();
        let mut transitioned = 0;

        for mut entry in self.records.iter_mut() {
            if entry.status != AccountStatus::Online {
                continue;
            }
            let stale = match entry.heartbeat_age(now) {
                Some(age) => age > staleness,
                None => true,
            };
            if stale {
                warn!(account = %entry.account, "Heartbeat stale, marking offline");
                entry.status = AccountStatus::Offline;
                transitioned += 1;
            }
        }

        if transitioned > 0 {
            debug!(transitioned, "Liveness sweep complete");
        }
        transitioned
    }

    /// Validate the shared ingestion secret. An empty stored secret
    /// accepts anything.
    pub fn validate_secret(&self, provided: &str) -> bool {
        let stored = self.shared_secret.read();
        stored.is_empty() || *stored == provided
    }

    pub fn set_shared_secret(&self, secret: impl Into<String>) {
        *self.shared_secret.write() = secret.into();
    }

    /// Replace an account's user-curated symbol overrides.
    pub fn set_symbol_mappings(
        &self,
        account: &AccountId,
        mappings: Vec<SymbolMapping>,
    ) -> RegistryResult<()> {
        let mut record = self
            .records
            .get_mut(account)
            .ok_or_else(|| RegistryError::UnknownAccount(account.clone()))?;
        record.symbol_mappings = mappings;
        Ok(())
    }

    pub fn symbol_mappings(&self, account: &AccountId) -> Vec<SymbolMapping> {
        self.records
            .get(account)
            .map(|r| r.symbol_mappings.clone())
            .unwrap_or_default()
    }

    pub fn exists(&self, account: &AccountId) -> bool {
        self.records.contains_key(account)
    }

    pub fn is_alive(&self, account: &AccountId) -> bool {
        self.records.get(account).map(|r| r.is_alive()).unwrap_or(false)
    }

    pub fn status(&self, account: &AccountId) -> Option<AccountStatus> {
        self.records.get(account).map(|r| r.status)
    }

    pub fn record(&self, account: &AccountId) -> Option<AccountRecord> {
        self.records.get(account).map(|r| r.clone())
    }

    pub fn catalog(&self) -> &BrokerCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SymbolEntry;

    fn catalog_report() -> CatalogReport {
        CatalogReport {
            broker: "TestBroker".to_string(),
            balance: None,
            symbols: vec![SymbolEntry {
                symbol: "EURUSD".to_string(),
                contract_size: None,
                volume_min: None,
                volume_max: None,
                volume_step: None,
            }],
        }
    }

    fn registered(registry: &AccountRegistry, id: &str) -> AccountId {
        let account = AccountId::new(id);
        registry.register(account.clone(), "").unwrap();
        account
    }

    #[test]
    fn test_fresh_account_cannot_receive_orders() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");

        assert_eq!(registry.status(&account), Some(AccountStatus::WaitingForActivation));
        assert_eq!(
            registry.can_receive_orders(&account),
            OrderGate::Block("not activated".to_string())
        );
    }

    #[test]
    fn test_heartbeat_alone_never_activates() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");

        registry.heartbeat(&account).unwrap();
        assert_eq!(registry.status(&account), Some(AccountStatus::WaitingForActivation));
        assert!(!registry.can_receive_orders(&account).is_pass());
    }

    #[test]
    fn test_catalog_report_activates() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");

        registry.catalog_report(&account, catalog_report()).unwrap();
        assert_eq!(registry.status(&account), Some(AccountStatus::Online));
        assert!(registry.can_receive_orders(&account).is_pass());
        assert_eq!(
            registry.record(&account).unwrap().broker.as_deref(),
            Some("TestBroker")
        );
    }

    #[test]
    fn test_sweep_marks_stale_online_accounts_offline() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");
        registry.catalog_report(&account, catalog_report()).unwrap();

        // Zero tolerance: any heartbeat age counts as stale.
        let transitioned = registry.sweep_liveness(Duration::zero());
        assert_eq!(transitioned, 1);
        assert_eq!(registry.status(&account), Some(AccountStatus::Offline));
    }

    #[test]
    fn test_heartbeat_revives_offline_account() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");
        registry.catalog_report(&account, catalog_report()).unwrap();
        registry.sweep_liveness(Duration::zero());
        assert_eq!(registry.status(&account), Some(AccountStatus::Offline));

        registry.heartbeat(&account).unwrap();
        assert_eq!(registry.status(&account), Some(AccountStatus::Online));
    }

    #[test]
    fn test_pause_is_sticky_against_sweep_and_heartbeat() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");
        registry.catalog_report(&account, catalog_report()).unwrap();

        registry.pause(&account).unwrap();
        assert_eq!(registry.status(&account), Some(AccountStatus::Paused));

        // Stale heartbeat sweep must not demote a paused account.
        registry.sweep_liveness(Duration::zero());
        assert_eq!(registry.status(&account), Some(AccountStatus::Paused));

        // Heartbeats and catalog reports must not resume it either.
        registry.heartbeat(&account).unwrap();
        registry.catalog_report(&account, catalog_report()).unwrap();
        assert_eq!(registry.status(&account), Some(AccountStatus::Paused));
        assert_eq!(
            registry.can_receive_orders(&account),
            OrderGate::Block("paused".to_string())
        );

        registry.resume(&account).unwrap();
        assert_eq!(registry.status(&account), Some(AccountStatus::Online));
    }

    #[test]
    fn test_pause_requires_activation() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");
        assert!(matches!(
            registry.pause(&account),
            Err(RegistryError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_symbol_data_flag_survives_sweep() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");
        registry.catalog_report(&account, catalog_report()).unwrap();
        registry.sweep_liveness(Duration::zero());

        assert!(registry.record(&account).unwrap().symbol_data_received);
        // Offline but activated: the gate only checks activation and pause.
        assert!(registry.can_receive_orders(&account).is_pass());
    }

    #[test]
    fn test_shared_secret() {
        let registry = AccountRegistry::new("");
        assert!(registry.validate_secret("anything"));

        registry.set_shared_secret("s3cret");
        assert!(registry.validate_secret("s3cret"));
        assert!(!registry.validate_secret("wrong"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");
        assert!(matches!(
            registry.register(account, ""),
            Err(RegistryError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_delete_removes_record_and_catalog() {
        let registry = AccountRegistry::new("");
        let account = registered(&registry, "1");
        registry.catalog_report(&account, catalog_report()).unwrap();

        registry.delete(&account).unwrap();
        assert!(!registry.exists(&account));
        assert!(registry.catalog().available_symbols(&account).is_empty());
        assert!(matches!(
            registry.heartbeat(&account),
            Err(RegistryError::UnknownAccount(_))
        ));
    }
}
