//! Application wiring and lifecycle.

use crate::config::RelayConfig;
use crate::error::AppResult;
use mirror_core::{AccountId, AckRequest, FanoutReport, PollResponse, Signal};
use mirror_engine::{CopyHistory, SignalEngine, SignalRejected};
use mirror_mailbox::{spawn_expiry_sweep, CommandMailbox, MailboxConfig};
use mirror_pairing::PairingDirectory;
use mirror_registry::{spawn_liveness_sweep, AccountRegistry, CatalogReport, RegistryResult};
use mirror_symbols::{tables, SymbolResolver};
use mirror_telemetry::metrics;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The assembled relay.
///
/// Owns every component plus the background sweeps. The external
/// transport calls into the public methods; everything else is internal.
pub struct Application {
    config: RelayConfig,
    registry: Arc<AccountRegistry>,
    directory: Arc<PairingDirectory>,
    resolver: Arc<SymbolResolver>,
    mailbox: Arc<CommandMailbox>,
    engine: SignalEngine,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Application {
    pub fn new(config: RelayConfig) -> Self {
        let registry = Arc::new(AccountRegistry::new(config.shared_secret.clone()));
        let directory = Arc::new(PairingDirectory::new().with_path(&config.pairings.path));
        let resolver = Arc::new(
            SymbolResolver::new().with_custom_path(&config.symbols.custom_mappings_path),
        );
        let mailbox = Arc::new(CommandMailbox::new(MailboxConfig {
            capacity: config.mailbox.capacity,
            max_age: Duration::from_secs(config.mailbox.max_age_secs),
            sweep_interval: Duration::from_secs(config.mailbox.sweep_interval_secs),
        }));
        let history = Arc::new(CopyHistory::new(config.history.capacity));

        let engine = SignalEngine::new(
            registry.clone(),
            directory.clone(),
            resolver.clone(),
            mailbox.clone(),
            history,
        );

        Self {
            config,
            registry,
            directory,
            resolver,
            mailbox,
            engine,
            shutdown: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Load startup tables and spawn the background sweeps.
    pub async fn start(&mut self) {
        let base = tables::load_base_mappings(
            self.config.symbols.base_mappings_path.as_deref().map(Path::new),
            self.config.symbols.base_mappings_url.as_deref(),
        )
        .await;
        if base.is_empty() {
            warn!("Running without a base symbol mapping table");
        }
        self.resolver.set_base_mappings(base);

        self.tasks.push(spawn_liveness_sweep(
            self.registry.clone(),
            Duration::from_secs(self.config.registry.sweep_interval_secs),
            Duration::from_secs(self.config.registry.heartbeat_timeout_secs),
            self.shutdown.clone(),
        ));
        self.tasks.push(spawn_expiry_sweep(
            self.mailbox.clone(),
            self.shutdown.clone(),
        ));

        info!(
            pairings = self.directory.len(),
            "Relay started"
        );
    }

    /// Run until ctrl-c, then shut down cleanly.
    pub async fn run(mut self) -> AppResult<()> {
        self.start().await;

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
        self.stop().await;
        Ok(())
    }

    /// Cancel the sweeps and wait for them to exit.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!("Relay stopped");
    }

    // ------------------------------------------------------------------
    // Transport-facing surface
    // ------------------------------------------------------------------

    /// Process one master signal under a subscription key.
    pub fn process_signal(
        &self,
        subscription_key: &str,
        signal: &Signal,
    ) -> Result<FanoutReport, SignalRejected> {
        metrics::SIGNALS_TOTAL.inc();
        match self.engine.process_signal(subscription_key, signal) {
            Ok(report) => {
                for outcome in &report.outcomes {
                    metrics::SLAVE_OUTCOMES_TOTAL
                        .with_label_values(&[&outcome.status.to_string()])
                        .inc();
                }
                Ok(report)
            }
            Err(err) => {
                let reason = match &err {
                    SignalRejected::UnknownKey => "unknown_key",
                    SignalRejected::MasterNotEligible { .. } => "master_gate",
                };
                metrics::SIGNALS_REJECTED_TOTAL
                    .with_label_values(&[reason])
                    .inc();
                Err(err)
            }
        }
    }

    /// Terminal heartbeat.
    pub fn heartbeat(&self, account: &AccountId) -> RegistryResult<()> {
        self.registry.heartbeat(account)
    }

    /// Terminal broker-catalog report; activates waiting accounts.
    pub fn catalog_report(&self, account: &AccountId, report: CatalogReport) -> RegistryResult<()> {
        self.registry.catalog_report(account, report)
    }

    /// Terminal poll for pending commands. Polling doubles as a
    /// heartbeat for registered accounts.
    pub fn poll_commands(&self, account: &AccountId, limit: usize) -> PollResponse {
        if self.registry.exists(account) {
            let _ = self.registry.heartbeat(account);
        }

        let commands = self.mailbox.poll(account, limit, true);
        metrics::COMMANDS_DELIVERED_TOTAL.inc_by(commands.len() as u64);
        PollResponse {
            account: account.clone(),
            count: commands.len(),
            commands,
        }
    }

    /// Terminal acknowledgment for one command.
    pub fn acknowledge(&self, account: &AccountId, ack: &AckRequest) -> bool {
        if !ack.success {
            warn!(
                %account,
                queue_id = %ack.queue_id,
                error = ack.error.as_deref().unwrap_or("unknown"),
                "Terminal reported command failure"
            );
        }
        self.mailbox.acknowledge(account, &ack.queue_id)
    }

    /// Delete an account: registry record, catalog, pairings in either
    /// role, and any pending commands.
    pub fn delete_account(&self, account: &AccountId) -> RegistryResult<()> {
        self.registry.delete(account)?;
        match self.directory.remove_for_account(account) {
            Ok(removed) if removed > 0 => {
                info!(%account, removed, "Cascaded pairing removal")
            }
            Ok(_) => {}
            Err(err) => warn!(%account, %err, "Pairing cascade failed"),
        }
        self.mailbox.purge(account);
        Ok(())
    }

    /// Validate the shared ingestion secret.
    pub fn validate_secret(&self, provided: &str) -> bool {
        self.registry.validate_secret(provided)
    }

    /// Render Prometheus metrics, refreshing mailbox gauges first.
    pub fn metrics_text(&self) -> AppResult<String> {
        let stats = self.mailbox.stats();
        metrics::MAILBOX_PENDING.set(self.mailbox.total_pending() as i64);
        metrics::COMMANDS_EXPIRED.set(
            stats.expired.load(std::sync::atomic::Ordering::Relaxed) as i64,
        );
        Ok(mirror_telemetry::gather_metrics()?)
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    pub fn directory(&self) -> &Arc<PairingDirectory> {
        &self.directory
    }

    pub fn resolver(&self) -> &Arc<SymbolResolver> {
        &self.resolver
    }

    pub fn mailbox(&self) -> &Arc<CommandMailbox> {
        &self.mailbox
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }
}
