//! Background expiry sweep.

use crate::mailbox::CommandMailbox;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawn the periodic mailbox expiry sweep.
///
/// Cadence and max age come from the mailbox's own config. The task
/// exits promptly when `shutdown` is cancelled.
pub fn spawn_expiry_sweep(
    mailbox: Arc<CommandMailbox>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(mailbox.config().sweep_interval);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Mailbox expiry sweep shutting down");
                    break;
                }
                _ = interval.tick() => {
                    mailbox.expire_older_than(mailbox.config().max_age);
                }
            }
        }
    })
}
