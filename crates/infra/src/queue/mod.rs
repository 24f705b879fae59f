mod inmemory;
mod postgres;

use crate::Config;
pub use inmemory::InMemoryDeliveryQueue;
pub use postgres::PostgresDeliveryQueue;
use std::time::Duration;
use vicinity_domain::{DeadLetter, QueueEntry, ID};

#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// How long a claimed entry stays invisible before it is handed to
    /// another consumer, millis.
    pub visibility_timeout_millis: i64,
    /// Redeliveries allowed before an entry moves to the dead letters.
    pub max_redeliveries: i64,
    /// Backoff before the first redelivery, doubled on each further one.
    pub retry_backoff_millis: i64,
    pub retry_backoff_max_millis: i64,
    /// How often a blocked `dequeue` re-checks for entries becoming
    /// visible, millis.
    pub poll_interval_millis: i64,
}

impl QueueSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            visibility_timeout_millis: config.visibility_timeout_millis,
            max_redeliveries: config.max_redeliveries,
            retry_backoff_millis: config.delivery_retry_backoff_millis,
            retry_backoff_max_millis: config.delivery_retry_backoff_max_millis,
            poll_interval_millis: config.queue_poll_interval_millis,
        }
    }

    fn backoff_millis(&self, redeliveries: i64) -> i64 {
        let doublings = (redeliveries - 1).clamp(0, 32) as u32;
        self.retry_backoff_millis
            .saturating_mul(1_i64 << doublings)
            .min(self.retry_backoff_max_millis)
    }
}

/// An exclusive claim on a queue entry. The receipt ties acks and nacks to
/// this claim: once the visibility timeout lapses and the entry is handed
/// out again, the old lease can no longer affect it.
#[derive(Debug, Clone)]
pub struct DeliveryLease {
    pub entry: QueueEntry,
    /// How many times this entry had been handed out before, excluding
    /// this claim.
    pub redeliveries: i64,
    pub receipt: ID,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NackOutcome {
    /// The entry goes back to the queue and becomes visible again at
    /// `next_visible_at`.
    Requeued {
        redeliveries: i64,
        next_visible_at: i64,
    },
    /// The redelivery limit was exceeded, the entry moved to the dead
    /// letters.
    DeadLettered,
    /// The lease no longer owns the entry (its visibility timeout lapsed),
    /// so the nack changed nothing.
    Expired,
}

/// At-least-once delivery queue with per-entry visibility deadlines.
/// Entries are handed to exactly one consumer at a time and survive until
/// acked or dead-lettered.
#[async_trait::async_trait]
pub trait IDeliveryQueue: Send + Sync {
    /// Adds the entries, each invisible until its `send_at`. Entries that
    /// are already queued (same id) are skipped.
    async fn enqueue(&self, entries: &[QueueEntry]) -> anyhow::Result<()>;
    /// Claims the entry with the earliest `send_at` that is visible,
    /// waiting up to `max_wait` for one to appear.
    async fn dequeue(&self, max_wait: Duration) -> anyhow::Result<Option<DeliveryLease>>;
    /// Removes a delivered entry. Expired leases are ignored.
    async fn ack(&self, lease: &DeliveryLease) -> anyhow::Result<()>;
    /// Returns a failed entry to the queue with exponential backoff, or
    /// moves it to the dead letters once the redelivery limit is hit.
    async fn nack(&self, lease: &DeliveryLease) -> anyhow::Result<NackOutcome>;
    /// Moves an entry straight to the dead letters, for failures a retry
    /// cannot fix. Expired leases are ignored.
    async fn dead_letter(&self, lease: &DeliveryLease, reason: &str) -> anyhow::Result<()>;
    /// Dead letters that have not been handed out before. Each dead letter
    /// is returned from this exactly once.
    async fn drain_dead_letters(&self) -> anyhow::Result<Vec<DeadLetter>>;
}
