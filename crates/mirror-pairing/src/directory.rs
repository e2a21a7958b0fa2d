//! The pairing directory.

use crate::error::{PairingError, PairingResult};
use chrono::Utc;
use mirror_core::{AccountId, PairSettings, PairStatus, Pairing};
use parking_lot::RwLock;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Directory of master→slave pairings.
///
/// Lookups iterate the whole collection, so a single reader/writer lock
/// over the vector is the right shape here (unlike the per-account
/// mailbox arena). The collection is small: one entry per copy
/// relationship.
pub struct PairingDirectory {
    pairings: RwLock<Vec<Pairing>>,
    path: Option<PathBuf>,
}

impl PairingDirectory {
    pub fn new() -> Self {
        Self {
            pairings: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Persist to `path`, loading any existing file now.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<Pairing>>(&content) {
                Ok(pairings) => {
                    info!(path = %path.display(), count = pairings.len(), "Loaded pairings");
                    *self.pairings.write() = pairings;
                }
                Err(err) => warn!(path = %path.display(), %err, "Pairing file unreadable"),
            },
            Err(_) => debug!(path = %path.display(), "No pairing file yet"),
        }
        self.path = Some(path);
        self
    }

    /// All pairings registered under a subscription key.
    pub fn find_by_subscription_key(&self, key: &str) -> Vec<Pairing> {
        self.pairings
            .read()
            .iter()
            .filter(|p| p.subscription_key == key)
            .cloned()
            .collect()
    }

    /// The pairing for a (key, master) combination, if any.
    pub fn find_by_master_and_key(&self, key: &str, master: &AccountId) -> Option<Pairing> {
        self.pairings
            .read()
            .iter()
            .find(|p| p.subscription_key == key && &p.master_account == master)
            .cloned()
    }

    /// Create a pairing under a fresh subscription key.
    pub fn create(
        &self,
        master: AccountId,
        slave: AccountId,
        settings: PairSettings,
    ) -> PairingResult<Pairing> {
        self.create_with_key(master, slave, Self::generate_key(), settings)
    }

    /// Create a pairing under an existing subscription key, so several
    /// slaves can share one master feed.
    pub fn create_with_key(
        &self,
        master: AccountId,
        slave: AccountId,
        subscription_key: String,
        settings: PairSettings,
    ) -> PairingResult<Pairing> {
        if master == slave {
            return Err(PairingError::SelfCopy(master));
        }

        let mut pairings = self.pairings.write();
        let duplicate = pairings.iter().any(|p| {
            p.master_account == master
                && p.slave_account == slave
                && p.subscription_key == subscription_key
        });
        if duplicate {
            return Err(PairingError::Duplicate { master, slave });
        }

        let now = Utc::now();
        let pairing = Pairing {
            id: format!("pair_{}", Uuid::new_v4().simple()),
            master_account: master,
            slave_account: slave,
            subscription_key,
            status: PairStatus::Active,
            settings,
            created_at: now,
            updated_at: now,
        };
        pairings.push(pairing.clone());
        self.persist(&pairings)?;

        info!(
            id = %pairing.id,
            master = %pairing.master_account,
            slave = %pairing.slave_account,
            "Created pairing"
        );
        Ok(pairing)
    }

    /// Replace a pairing's settings.
    pub fn update_settings(&self, id: &str, settings: PairSettings) -> PairingResult<()> {
        self.mutate(id, |pairing| {
            pairing.settings = settings;
        })
    }

    /// Flip active/inactive. Returns the new status.
    pub fn toggle(&self, id: &str) -> PairingResult<PairStatus> {
        let mut new_status = PairStatus::Active;
        self.mutate(id, |pairing| {
            pairing.status = match pairing.status {
                PairStatus::Active => PairStatus::Inactive,
                PairStatus::Inactive => PairStatus::Active,
            };
            new_status = pairing.status;
        })?;
        Ok(new_status)
    }

    /// Remove one pairing by id.
    pub fn remove(&self, id: &str) -> PairingResult<()> {
        let mut pairings = self.pairings.write();
        let before = pairings.len();
        pairings.retain(|p| p.id != id);
        if pairings.len() == before {
            return Err(PairingError::UnknownPairing(id.to_string()));
        }
        self.persist(&pairings)?;
        info!(%id, "Removed pairing");
        Ok(())
    }

    /// Remove every pairing that references the account, as master or
    /// slave. Called when an account is deleted. Returns how many went.
    pub fn remove_for_account(&self, account: &AccountId) -> PairingResult<usize> {
        let mut pairings = self.pairings.write();
        let before = pairings.len();
        pairings.retain(|p| &p.master_account != account && &p.slave_account != account);
        let removed = before - pairings.len();
        if removed > 0 {
            self.persist(&pairings)?;
            info!(%account, removed, "Cascaded pairing removal");
        }
        Ok(removed)
    }

    pub fn all(&self) -> Vec<Pairing> {
        self.pairings.read().clone()
    }

    pub fn len(&self) -> usize {
        self.pairings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.read().is_empty()
    }

    fn mutate(&self, id: &str, f: impl FnOnce(&mut Pairing)) -> PairingResult<()> {
        let mut pairings = self.pairings.write();
        let pairing = pairings
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PairingError::UnknownPairing(id.to_string()))?;
        f(pairing);
        pairing.updated_at = Utc::now();
        self.persist(&pairings)
    }

    fn persist(&self, pairings: &[Pairing]) -> PairingResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(pairings)?)?;
        Ok(())
    }

    fn generate_key() -> String {
        format!("ctk_{}", Uuid::new_v4().simple())
    }
}

impl Default for PairingDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_with_pair() -> (PairingDirectory, Pairing) {
        let directory = PairingDirectory::new();
        let pairing = directory
            .create(
                AccountId::new("111111"),
                AccountId::new("222222"),
                PairSettings::default(),
            )
            .unwrap();
        (directory, pairing)
    }

    #[test]
    fn test_create_and_find_by_key() {
        let (directory, pairing) = directory_with_pair();

        let found = directory.find_by_subscription_key(&pairing.subscription_key);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, pairing.id);
        assert!(directory.find_by_subscription_key("ctk_other").is_empty());
    }

    #[test]
    fn test_find_by_master_and_key() {
        let (directory, pairing) = directory_with_pair();

        let found = directory
            .find_by_master_and_key(&pairing.subscription_key, &AccountId::new("111111"))
            .unwrap();
        assert_eq!(found.id, pairing.id);

        assert!(directory
            .find_by_master_and_key(&pairing.subscription_key, &AccountId::new("999999"))
            .is_none());
    }

    #[test]
    fn test_many_pairings_share_one_key() {
        let (directory, pairing) = directory_with_pair();
        directory
            .create_with_key(
                AccountId::new("111111"),
                AccountId::new("333333"),
                pairing.subscription_key.clone(),
                PairSettings::default(),
            )
            .unwrap();

        assert_eq!(
            directory.find_by_subscription_key(&pairing.subscription_key).len(),
            2
        );
    }

    #[test]
    fn test_self_copy_rejected() {
        let directory = PairingDirectory::new();
        let result = directory.create(
            AccountId::new("111111"),
            AccountId::new("111111"),
            PairSettings::default(),
        );
        assert!(matches!(result, Err(PairingError::SelfCopy(_))));
    }

    #[test]
    fn test_triple_uniqueness() {
        let (directory, pairing) = directory_with_pair();
        let result = directory.create_with_key(
            AccountId::new("111111"),
            AccountId::new("222222"),
            pairing.subscription_key.clone(),
            PairSettings::default(),
        );
        assert!(matches!(result, Err(PairingError::Duplicate { .. })));

        // Same accounts under a different key are fine.
        assert!(directory
            .create(
                AccountId::new("111111"),
                AccountId::new("222222"),
                PairSettings::default(),
            )
            .is_ok());
    }

    #[test]
    fn test_toggle() {
        let (directory, pairing) = directory_with_pair();

        assert_eq!(directory.toggle(&pairing.id).unwrap(), PairStatus::Inactive);
        assert_eq!(directory.toggle(&pairing.id).unwrap(), PairStatus::Active);
        assert!(matches!(
            directory.toggle("pair_missing"),
            Err(PairingError::UnknownPairing(_))
        ));
    }

    #[test]
    fn test_remove_for_account_cascades() {
        let (directory, _) = directory_with_pair();
        directory
            .create(
                AccountId::new("222222"),
                AccountId::new("333333"),
                PairSettings::default(),
            )
            .unwrap();

        // 222222 appears once as slave and once as master.
        let removed = directory.remove_for_account(&AccountId::new("222222")).unwrap();
        assert_eq!(removed, 2);
        assert!(directory.is_empty());
    }

    #[test]
    fn test_update_settings() {
        let (directory, pairing) = directory_with_pair();
        let mut settings = PairSettings::default();
        settings.auto_map_symbol = false;
        directory.update_settings(&pairing.id, settings).unwrap();

        let found = directory.find_by_subscription_key(&pairing.subscription_key);
        assert!(!found[0].settings.auto_map_symbol);
    }
}
