//! The fan-out orchestrator.

use crate::convert::{build_command, Conversion};
use crate::history::CopyHistory;
use crate::translate::SignalTranslator;
use crate::volume::compute_volume;
use mirror_core::{
    AccountId, FanoutReport, OutcomeStatus, Pairing, Signal, SignalEvent, SlaveOutcome, Volume,
};
use mirror_mailbox::CommandMailbox;
use mirror_pairing::PairingDirectory;
use mirror_registry::{AccountRegistry, AccountStatus, OrderGate};
use mirror_symbols::SymbolResolver;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Whole-signal rejection: nothing was built for any slave.
#[derive(Debug, Error)]
pub enum SignalRejected {
    #[error("No pairings for subscription key")]
    UnknownKey,

    #[error("Master {account} cannot send signals: {reason}")]
    MasterNotEligible { account: AccountId, reason: String },
}

/// The signal processing engine.
///
/// Owns no state of its own; it orchestrates the registry, pairing
/// directory, resolver, and mailboxes, and records every per-slave
/// outcome into the history.
pub struct SignalEngine {
    registry: Arc<AccountRegistry>,
    directory: Arc<PairingDirectory>,
    mailbox: Arc<CommandMailbox>,
    history: Arc<CopyHistory>,
    translator: SignalTranslator,
}

impl SignalEngine {
    pub fn new(
        registry: Arc<AccountRegistry>,
        directory: Arc<PairingDirectory>,
        resolver: Arc<SymbolResolver>,
        mailbox: Arc<CommandMailbox>,
        history: Arc<CopyHistory>,
    ) -> Self {
        let translator = SignalTranslator::new(registry.clone(), resolver);
        Self {
            registry,
            directory,
            mailbox,
            history,
            translator,
        }
    }

    /// Fan one signal out to every eligible slave under the key.
    ///
    /// The master gate runs before any per-slave work; after that each
    /// pairing is processed independently and a failure for one slave
    /// never aborts its siblings. Overall success means at least one
    /// command was dispatched.
    pub fn process_signal(
        &self,
        subscription_key: &str,
        signal: &Signal,
    ) -> Result<FanoutReport, SignalRejected> {
        let pairings = self.directory.find_by_subscription_key(subscription_key);
        if pairings.is_empty() {
            warn!(key = %redact(subscription_key), "Signal for unknown subscription key");
            return Err(SignalRejected::UnknownKey);
        }

        if let OrderGate::Block(reason) = self.registry.can_receive_orders(&signal.account) {
            warn!(master = %signal.account, %reason, "Rejecting signal at master gate");
            for pairing in pairings
                .iter()
                .filter(|p| p.master_account == signal.account)
            {
                self.history.record(SlaveOutcome::new(
                    signal.account.clone(),
                    pairing.slave_account.clone(),
                    signal.event.to_string(),
                    signal.symbol.clone(),
                    signal.volume,
                    OutcomeStatus::Failed,
                    format!("master account {reason}"),
                ));
            }
            return Err(SignalRejected::MasterNotEligible {
                account: signal.account.clone(),
                reason,
            });
        }

        let mut report = FanoutReport::default();
        for pairing in &pairings {
            let outcome = match self.check_eligibility(pairing, signal) {
                Some(excluded) => excluded,
                None => self.process_slave(pairing, signal),
            };
            self.history.record(outcome.clone());
            report.record(outcome);
        }

        info!(
            master = %signal.account,
            event = %signal.event,
            symbol = %signal.symbol,
            dispatched = report.dispatched,
            failed = report.failed,
            skipped = report.skipped,
            "Signal processed"
        );
        Ok(report)
    }

    /// Eligibility filter. Returns the recorded exclusion, or `None` when
    /// the pairing should be processed.
    fn check_eligibility(&self, pairing: &Pairing, signal: &Signal) -> Option<SlaveOutcome> {
        let exclusion = |status: OutcomeStatus, reason: &str| {
            Some(SlaveOutcome::new(
                signal.account.clone(),
                pairing.slave_account.clone(),
                signal.event.to_string(),
                signal.symbol.clone(),
                signal.volume,
                status,
                reason,
            ))
        };

        if pairing.master_account != signal.account {
            return exclusion(OutcomeStatus::Skipped, "master account mismatch");
        }
        if !pairing.is_active() {
            return exclusion(OutcomeStatus::Skipped, "pairing inactive");
        }

        let slave = &pairing.slave_account;
        if !self.registry.exists(slave) {
            return exclusion(OutcomeStatus::Failed, "slave account not registered");
        }
        if self.registry.status(slave) == Some(AccountStatus::Paused) {
            return exclusion(OutcomeStatus::Failed, "slave account paused");
        }
        if !self.registry.is_alive(slave) {
            return exclusion(OutcomeStatus::Failed, "slave offline");
        }

        None
    }

    /// Translate, size, convert, and enqueue for one eligible pairing.
    /// Every failure path resolves to a recorded outcome.
    fn process_slave(&self, pairing: &Pairing, signal: &Signal) -> SlaveOutcome {
        let master = &signal.account;
        let slave = &pairing.slave_account;
        let settings = &pairing.settings;

        let slave_symbol = match self.translator.translate_for_account(
            &signal.symbol,
            slave,
            settings.auto_map_symbol,
        ) {
            Ok(symbol) => symbol,
            Err(err) => {
                return SlaveOutcome::new(
                    master.clone(),
                    slave.clone(),
                    signal.event.to_string(),
                    signal.symbol.clone(),
                    signal.volume,
                    OutcomeStatus::Failed,
                    err.to_string(),
                );
            }
        };

        let volume = self.slave_volume(pairing, signal, &slave_symbol);

        match build_command(signal, settings, slave, &slave_symbol, volume) {
            Ok(Conversion::Command(command)) => {
                let action = command.action.to_string();
                let queue_id = self.mailbox.enqueue(slave, command);
                SlaveOutcome::new(
                    master.clone(),
                    slave.clone(),
                    action,
                    signal.symbol.clone(),
                    volume,
                    OutcomeStatus::Dispatched,
                    format!("enqueued as {queue_id}"),
                )
            }
            Ok(Conversion::Skip(reason)) => SlaveOutcome::new(
                master.clone(),
                slave.clone(),
                signal.event.to_string(),
                signal.symbol.clone(),
                volume,
                OutcomeStatus::Skipped,
                reason,
            ),
            Err(err) => SlaveOutcome::new(
                master.clone(),
                slave.clone(),
                signal.event.to_string(),
                signal.symbol.clone(),
                volume,
                OutcomeStatus::Failed,
                err.to_string(),
            ),
        }
    }

    /// Slave-side volume where the event needs one: opens and partial
    /// closes. Full closes and modifies act on the whole position.
    fn slave_volume(&self, pairing: &Pairing, signal: &Signal, slave_symbol: &str) -> Option<Volume> {
        let needs_volume = match signal.event {
            SignalEvent::Open => true,
            SignalEvent::Close => signal.is_partial_close(),
            _ => false,
        };
        if !needs_volume {
            return None;
        }

        Some(compute_volume(
            signal.volume.unwrap_or(Volume::ZERO),
            &pairing.settings,
            &signal.account,
            &signal.symbol,
            &pairing.slave_account,
            slave_symbol,
            self.registry.catalog(),
            signal.is_partial_close(),
        ))
    }

    pub fn history(&self) -> &CopyHistory {
        &self.history
    }
}

/// Keys are bearer credentials; log only a prefix.
fn redact(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}...")
}
