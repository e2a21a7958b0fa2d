//! Background liveness sweep.

use crate::registry::AccountRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawn the periodic liveness sweep.
///
/// Every `cadence`, Online accounts whose heartbeat is older than
/// `staleness` are marked Offline. The task exits promptly when
/// `shutdown` is cancelled.
pub fn spawn_liveness_sweep(
    registry: Arc<AccountRegistry>,
    cadence: Duration,
    staleness: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let staleness = chrono::Duration::from_std(staleness)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        let mut interval = tokio::time::interval(cadence);
        // The first tick fires immediately; skip it so a fleet of fresh
        // accounts is not swept before their first heartbeat window.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Liveness sweep shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let transitioned = registry.sweep_liveness(staleness);
                    if transitioned > 0 {
                        debug!(transitioned, "Accounts marked offline");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_task_stops_on_cancellation() {
        let registry = Arc::new(AccountRegistry::new(""));
        let shutdown = CancellationToken::new();
        let handle = spawn_liveness_sweep(
            registry,
            Duration::from_secs(3600),
            Duration::from_secs(30),
            shutdown.clone(),
        );

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep did not stop")
            .unwrap();
    }
}
