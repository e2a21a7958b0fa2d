//! The mailbox arena.

use chrono::Utc;
use dashmap::DashMap;
use mirror_core::{AccountId, Command, QueueId, QueuedCommand};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Mailbox tuning.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    /// Maximum entries per account; oldest evicted on overflow.
    pub capacity: usize,
    /// Entries older than this are dropped by the expiry sweep,
    /// acknowledged or not.
    pub max_age: Duration,
    /// Expiry sweep cadence.
    pub sweep_interval: Duration,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            max_age: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Delivery counters.
#[derive(Debug, Default)]
pub struct MailboxStats {
    pub added: AtomicU64,
    pub delivered: AtomicU64,
    pub acknowledged: AtomicU64,
    pub expired: AtomicU64,
    pub evicted: AtomicU64,
}

impl MailboxStats {
    pub fn snapshot(&self) -> (u64, u64, u64, u64, u64) {
        (
            self.added.load(Ordering::Relaxed),
            self.delivered.load(Ordering::Relaxed),
            self.acknowledged.load(Ordering::Relaxed),
            self.expired.load(Ordering::Relaxed),
            self.evicted.load(Ordering::Relaxed),
        )
    }
}

type Queue = Arc<Mutex<VecDeque<QueuedCommand>>>;

/// Concurrent per-account command inboxes.
///
/// One queue per account, each behind its own lock: operations on the
/// same account serialize, operations on different accounts never
/// contend. The map itself is only touched to look up or create a
/// queue handle.
pub struct CommandMailbox {
    queues: DashMap<AccountId, Queue>,
    config: MailboxConfig,
    stats: MailboxStats,
}

impl CommandMailbox {
    pub fn new(config: MailboxConfig) -> Self {
        Self {
            queues: DashMap::new(),
            config,
            stats: MailboxStats::default(),
        }
    }

    fn queue(&self, account: &AccountId) -> Queue {
        self.queues
            .entry(account.clone())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone()
    }

    /// Enqueue a command, stamping a fresh queue id and timestamp.
    ///
    /// On overflow the oldest entry is evicted regardless of ack state;
    /// availability for new commands beats completeness of old ones.
    pub fn enqueue(&self, account: &AccountId, command: Command) -> QueueId {
        let queue = self.queue(account);
        let queue_id = QueueId::new(account);
        let entry = QueuedCommand {
            queue_id: queue_id.clone(),
            enqueued_at: Utc::now(),
            acknowledged: false,
            command,
        };

        let mut guard = queue.lock();
        if guard.len() >= self.config.capacity {
            if let Some(evicted) = guard.pop_front() {
                warn!(%account, queue_id = %evicted.queue_id, "Mailbox full, evicting oldest");
                self.stats.evicted.fetch_add(1, Ordering::Relaxed);
            }
        }
        guard.push_back(entry);
        drop(guard);

        self.stats.added.fetch_add(1, Ordering::Relaxed);
        debug!(%account, %queue_id, "Command enqueued");
        queue_id
    }

    /// Return up to `limit` unacknowledged commands in insertion order.
    ///
    /// With `auto_ack` (terminal polling), returned commands are marked
    /// acknowledged as a side effect; with it off (status views), repeated
    /// polls keep seeing the same entries.
    pub fn poll(&self, account: &AccountId, limit: usize, auto_ack: bool) -> Vec<QueuedCommand> {
        let Some(queue) = self.queues.get(account).map(|q| q.clone()) else {
            return Vec::new();
        };

        let mut guard = queue.lock();
        let mut delivered = Vec::new();
        for entry in guard.iter_mut() {
            if delivered.len() >= limit {
                break;
            }
            if entry.acknowledged {
                continue;
            }
            if auto_ack {
                entry.acknowledged = true;
            }
            delivered.push(entry.clone());
        }
        drop(guard);

        if !delivered.is_empty() {
            self.stats
                .delivered
                .fetch_add(delivered.len() as u64, Ordering::Relaxed);
            if auto_ack {
                self.stats
                    .acknowledged
                    .fetch_add(delivered.len() as u64, Ordering::Relaxed);
            }
            debug!(%account, count = delivered.len(), auto_ack, "Commands polled");
        }
        delivered
    }

    /// Acknowledge one command by queue id. Returns whether it was found
    /// and not yet acknowledged.
    pub fn acknowledge(&self, account: &AccountId, queue_id: &QueueId) -> bool {
        let Some(queue) = self.queues.get(account).map(|q| q.clone()) else {
            return false;
        };

        let mut guard = queue.lock();
        for entry in guard.iter_mut() {
            if &entry.queue_id == queue_id && !entry.acknowledged {
                entry.acknowledged = true;
                self.stats.acknowledged.fetch_add(1, Ordering::Relaxed);
                debug!(%account, %queue_id, "Command acknowledged");
                return true;
            }
        }
        false
    }

    /// Number of unacknowledged commands for the account.
    pub fn size(&self, account: &AccountId) -> usize {
        self.queues
            .get(account)
            .map(|q| q.lock().iter().filter(|c| !c.acknowledged).count())
            .unwrap_or(0)
    }

    /// Drop everything for the account; returns how many entries went.
    pub fn purge(&self, account: &AccountId) -> usize {
        let Some(queue) = self.queues.get(account).map(|q| q.clone()) else {
            return 0;
        };
        let mut guard = queue.lock();
        let count = guard.len();
        guard.clear();
        if count > 0 {
            info!(%account, count, "Mailbox purged");
        }
        count
    }

    /// Drop entries older than `max_age` across all accounts, regardless
    /// of ack state. Returns the number expired.
    pub fn expire_older_than(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let max_age = chrono::Duration::from_std(max_age)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        let mut total = 0;

        for entry in self.queues.iter() {
            let queue = entry.value().clone();
            let mut guard = queue.lock();
            let before = guard.len();
            guard.retain(|cmd| cmd.age(now) < max_age);
            total += before - guard.len();
        }

        if total > 0 {
            self.stats.expired.fetch_add(total as u64, Ordering::Relaxed);
            info!(expired = total, "Expired stale commands");
        }
        total
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    pub fn stats(&self) -> &MailboxStats {
        &self.stats
    }

    /// Unacknowledged commands across every account.
    pub fn total_pending(&self) -> usize {
        self.queues
            .iter()
            .map(|entry| entry.value().lock().iter().filter(|c| !c.acknowledged).count())
            .sum()
    }
}

impl Default for CommandMailbox {
    fn default() -> Self {
        Self::new(MailboxConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::{CommandAction, Volume};
    use rust_decimal_macros::dec;

    fn command(account: &AccountId, volume: rust_decimal::Decimal) -> Command {
        Command {
            account: account.clone(),
            action: CommandAction::Buy,
            symbol: "EURUSD".to_string(),
            volume: Some(Volume::new(volume)),
            price: None,
            take_profit: None,
            stop_loss: None,
            comment: "COPY_order_1".to_string(),
        }
    }

    fn mailbox() -> CommandMailbox {
        CommandMailbox::new(MailboxConfig {
            capacity: 5,
            max_age: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        })
    }

    #[test]
    fn test_poll_auto_ack_consumes() {
        let mailbox = mailbox();
        let account = AccountId::new("222222");
        mailbox.enqueue(&account, command(&account, dec!(0.1)));

        let polled = mailbox.poll(&account, 1, true);
        assert_eq!(polled.len(), 1);
        assert!(polled[0].acknowledged);

        // A repeat poll sees nothing.
        assert!(mailbox.poll(&account, 1, true).is_empty());
        assert_eq!(mailbox.size(&account), 0);
    }

    #[test]
    fn test_poll_without_auto_ack_keeps_visibility() {
        let mailbox = mailbox();
        let account = AccountId::new("222222");
        mailbox.enqueue(&account, command(&account, dec!(0.1)));

        assert_eq!(mailbox.poll(&account, 10, false).len(), 1);
        assert_eq!(mailbox.poll(&account, 10, false).len(), 1);
        assert_eq!(mailbox.size(&account), 1);
    }

    #[test]
    fn test_poll_respects_limit_and_order() {
        let mailbox = mailbox();
        let account = AccountId::new("222222");
        for i in 1..=3 {
            mailbox.enqueue(&account, command(&account, rust_decimal::Decimal::from(i)));
        }

        let first = mailbox.poll(&account, 2, true);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].command.volume.unwrap().inner(), dec!(1));
        assert_eq!(first[1].command.volume.unwrap().inner(), dec!(2));

        let rest = mailbox.poll(&account, 2, true);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].command.volume.unwrap().inner(), dec!(3));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mailbox = mailbox();
        let account = AccountId::new("222222");
        for i in 1..=7 {
            mailbox.enqueue(&account, command(&account, rust_decimal::Decimal::from(i)));
        }

        let pending = mailbox.poll(&account, 100, false);
        assert_eq!(pending.len(), 5);
        // 1 and 2 were evicted.
        assert_eq!(pending[0].command.volume.unwrap().inner(), dec!(3));
        assert_eq!(mailbox.stats().evicted.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_acknowledge_by_id() {
        let mailbox = mailbox();
        let account = AccountId::new("222222");
        let id = mailbox.enqueue(&account, command(&account, dec!(0.1)));

        assert!(mailbox.acknowledge(&account, &id));
        // Second ack of the same id reports not-found.
        assert!(!mailbox.acknowledge(&account, &id));
        assert_eq!(mailbox.size(&account), 0);
    }

    #[test]
    fn test_expiry_ignores_ack_state() {
        let mailbox = mailbox();
        let account = AccountId::new("222222");
        mailbox.enqueue(&account, command(&account, dec!(0.1)));
        mailbox.enqueue(&account, command(&account, dec!(0.2)));
        mailbox.poll(&account, 1, true);

        // Everything is older than zero.
        let expired = mailbox.expire_older_than(Duration::ZERO);
        assert_eq!(expired, 2);
        assert!(mailbox.poll(&account, 10, false).is_empty());
    }

    #[test]
    fn test_accounts_are_independent() {
        let mailbox = mailbox();
        let a = AccountId::new("1");
        let b = AccountId::new("2");
        mailbox.enqueue(&a, command(&a, dec!(0.1)));

        assert_eq!(mailbox.size(&a), 1);
        assert_eq!(mailbox.size(&b), 0);
        assert!(mailbox.poll(&b, 10, true).is_empty());
        assert_eq!(mailbox.size(&a), 1);
    }

    #[test]
    fn test_purge() {
        let mailbox = mailbox();
        let account = AccountId::new("222222");
        mailbox.enqueue(&account, command(&account, dec!(0.1)));
        mailbox.enqueue(&account, command(&account, dec!(0.2)));

        assert_eq!(mailbox.purge(&account), 2);
        assert_eq!(mailbox.size(&account), 0);
    }

    #[test]
    fn test_concurrent_enqueue_and_poll_lose_nothing() {
        let mailbox = Arc::new(CommandMailbox::default());
        let account = AccountId::new("222222");

        let producer = {
            let mailbox = mailbox.clone();
            let account = account.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    mailbox.enqueue(&account, command(&account, rust_decimal::Decimal::from(i)));
                }
            })
        };

        let consumer = {
            let mailbox = mailbox.clone();
            let account = account.clone();
            std::thread::spawn(move || {
                let mut seen = 0usize;
                while seen < 200 {
                    seen += mailbox.poll(&account, 10, true).len();
                }
                seen
            })
        };

        producer.join().unwrap();
        assert_eq!(consumer.join().unwrap(), 200);
        assert_eq!(mailbox.size(&account), 0);
    }
}
