use super::{DeliveryLease, IDeliveryQueue, NackOutcome, QueueSettings};
use crate::system::ISys;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use vicinity_domain::{DeadLetter, QueueEntry, ID};

struct QueuedEntry {
    entry: QueueEntry,
    redeliveries: i64,
    visible_at: i64,
    seq: i64,
}

struct InFlightEntry {
    queued: QueuedEntry,
    receipt: ID,
    expires_at: i64,
}

#[derive(Default)]
struct QueueState {
    ready: Vec<QueuedEntry>,
    in_flight: Vec<InFlightEntry>,
    dead: Vec<DeadLetter>,
    next_seq: i64,
}

/// In-process delivery queue with the same visibility and redelivery
/// semantics as the postgres queue. Time comes from `ISys` so tests can
/// steer visibility deadlines directly.
pub struct InMemoryDeliveryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    sys: Arc<dyn ISys>,
    settings: QueueSettings,
}

impl InMemoryDeliveryQueue {
    pub fn new(sys: Arc<dyn ISys>, settings: QueueSettings) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            sys,
            settings,
        }
    }

    /// Returns entries whose lease lapsed to the ready list, dead-lettering
    /// the ones that already exhausted their redeliveries.
    fn reclaim_expired(&self, state: &mut QueueState, now: i64) {
        let mut i = 0;
        while i < state.in_flight.len() {
            if state.in_flight[i].expires_at <= now {
                let expired = state.in_flight.remove(i);
                let mut queued = expired.queued;
                queued.redeliveries += 1;
                if queued.redeliveries > self.settings.max_redeliveries {
                    state.dead.push(DeadLetter {
                        entry: queued.entry,
                        reason: "redelivery limit exceeded after lease expiry".into(),
                        redeliveries: queued.redeliveries,
                        failed_at: now,
                    });
                } else {
                    queued.visible_at = now;
                    state.ready.push(queued);
                }
            } else {
                i += 1;
            }
        }
    }

    /// One claim attempt. On a miss, also reports when the next entry or
    /// lease becomes due, so the caller knows how long to sleep.
    fn try_claim(&self, now: i64) -> (Option<DeliveryLease>, Option<i64>) {
        let mut state = self.state.lock().unwrap();
        self.reclaim_expired(&mut state, now);

        let next = state
            .ready
            .iter()
            .enumerate()
            .filter(|(_, queued)| queued.visible_at <= now)
            .min_by_key(|(_, queued)| (queued.entry.send_at, queued.seq))
            .map(|(position, _)| position);
        if let Some(position) = next {
            let queued = state.ready.remove(position);
            let receipt = ID::default();
            let lease = DeliveryLease {
                entry: queued.entry.clone(),
                redeliveries: queued.redeliveries,
                receipt: receipt.clone(),
            };
            state.in_flight.push(InFlightEntry {
                queued,
                receipt,
                expires_at: now + self.settings.visibility_timeout_millis,
            });
            return (Some(lease), None);
        }

        let next_due = state
            .ready
            .iter()
            .map(|queued| queued.visible_at)
            .chain(state.in_flight.iter().map(|in_flight| in_flight.expires_at))
            .min();
        (None, next_due)
    }
}

#[async_trait::async_trait]
impl IDeliveryQueue for InMemoryDeliveryQueue {
    async fn enqueue(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        for entry in entries {
            let queued_already = state.ready.iter().any(|queued| queued.entry.id == entry.id)
                || state
                    .in_flight
                    .iter()
                    .any(|in_flight| in_flight.queued.entry.id == entry.id);
            if queued_already {
                continue;
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.ready.push(QueuedEntry {
                entry: entry.clone(),
                redeliveries: 0,
                visible_at: entry.send_at,
                seq,
            });
        }
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn dequeue(&self, max_wait: Duration) -> anyhow::Result<Option<DeliveryLease>> {
        let deadline = Instant::now() + max_wait;
        loop {
            let now = self.sys.get_timestamp_millis();
            let (lease, next_due) = self.try_claim(now);
            if lease.is_some() {
                return Ok(lease);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let mut wait = remaining.min(Duration::from_millis(
                self.settings.poll_interval_millis.max(1) as u64,
            ));
            if let Some(due) = next_due {
                let until_due = Duration::from_millis((due - now).max(1) as u64);
                wait = wait.min(until_due);
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = sleep(wait) => {}
            }
        }
    }

    async fn ack(&self, lease: &DeliveryLease) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .in_flight
            .retain(|in_flight| in_flight.receipt != lease.receipt);
        Ok(())
    }

    async fn nack(&self, lease: &DeliveryLease) -> anyhow::Result<NackOutcome> {
        let now = self.sys.get_timestamp_millis();
        let mut state = self.state.lock().unwrap();
        let position = match state
            .in_flight
            .iter()
            .position(|in_flight| in_flight.receipt == lease.receipt)
        {
            Some(position) => position,
            None => return Ok(NackOutcome::Expired),
        };
        let mut queued = state.in_flight.remove(position).queued;
        queued.redeliveries += 1;
        if queued.redeliveries > self.settings.max_redeliveries {
            state.dead.push(DeadLetter {
                entry: queued.entry,
                reason: "redelivery limit exceeded".into(),
                redeliveries: queued.redeliveries,
                failed_at: now,
            });
            return Ok(NackOutcome::DeadLettered);
        }
        let redeliveries = queued.redeliveries;
        let next_visible_at = now + self.settings.backoff_millis(redeliveries);
        queued.visible_at = next_visible_at;
        state.ready.push(queued);
        drop(state);
        self.notify.notify_waiters();
        Ok(NackOutcome::Requeued {
            redeliveries,
            next_visible_at,
        })
    }

    async fn dead_letter(&self, lease: &DeliveryLease, reason: &str) -> anyhow::Result<()> {
        let now = self.sys.get_timestamp_millis();
        let mut state = self.state.lock().unwrap();
        let position = match state
            .in_flight
            .iter()
            .position(|in_flight| in_flight.receipt == lease.receipt)
        {
            Some(position) => position,
            None => return Ok(()),
        };
        let in_flight = state.in_flight.remove(position);
        state.dead.push(DeadLetter {
            entry: in_flight.queued.entry,
            reason: reason.to_string(),
            redeliveries: in_flight.queued.redeliveries,
            failed_at: now,
        });
        Ok(())
    }

    async fn drain_dead_letters(&self) -> anyhow::Result<Vec<DeadLetter>> {
        let mut state = self.state.lock().unwrap();
        Ok(state.dead.drain(..).collect())
    }
}
