use super::{DeliveryLease, IDeliveryQueue, NackOutcome, QueueSettings};
use crate::system::ISys;
use sqlx::{types::Uuid, FromRow, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::error;
use vicinity_domain::{DeadLetter, QueueEntry, ID};

/// Delivery queue on a postgres table. Claims take the row lock with
/// `FOR UPDATE SKIP LOCKED`, so concurrent workers never receive the same
/// entry, and `visible_at` doubles as the lease deadline: a claimed row
/// whose deadline lapsed is claimed again like any other visible row.
pub struct PostgresDeliveryQueue {
    pool: PgPool,
    sys: Arc<dyn ISys>,
    settings: QueueSettings,
}

impl PostgresDeliveryQueue {
    pub fn new(pool: PgPool, sys: Arc<dyn ISys>, settings: QueueSettings) -> Self {
        Self {
            pool,
            sys,
            settings,
        }
    }
}

#[derive(Debug, FromRow)]
struct QueueEntryRaw {
    entry_uid: Uuid,
    account_uid: Uuid,
    event_uid: Uuid,
    user_uid: Uuid,
    channel: String,
    recipient: String,
    subject: String,
    body: String,
    idempotency_key: String,
    send_at: i64,
    redeliveries: i64,
}

impl QueueEntryRaw {
    fn into_lease(self, receipt: ID) -> DeliveryLease {
        DeliveryLease {
            redeliveries: self.redeliveries,
            receipt,
            entry: QueueEntry {
                id: self.entry_uid.into(),
                account_id: self.account_uid.into(),
                event_id: self.event_uid.into(),
                user_id: self.user_uid.into(),
                channel: self.channel.parse().unwrap(),
                recipient: self.recipient,
                subject: self.subject,
                body: self.body,
                idempotency_key: self.idempotency_key,
                send_at: self.send_at,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct DeadLetterRaw {
    entry_uid: Uuid,
    account_uid: Uuid,
    event_uid: Uuid,
    user_uid: Uuid,
    channel: String,
    recipient: String,
    subject: String,
    body: String,
    idempotency_key: String,
    send_at: i64,
    reason: String,
    redeliveries: i64,
    failed_at: i64,
}

impl From<DeadLetterRaw> for DeadLetter {
    fn from(e: DeadLetterRaw) -> Self {
        Self {
            entry: QueueEntry {
                id: e.entry_uid.into(),
                account_id: e.account_uid.into(),
                event_id: e.event_uid.into(),
                user_id: e.user_uid.into(),
                channel: e.channel.parse().unwrap(),
                recipient: e.recipient,
                subject: e.subject,
                body: e.body,
                idempotency_key: e.idempotency_key,
                send_at: e.send_at,
            },
            reason: e.reason,
            redeliveries: e.redeliveries,
            failed_at: e.failed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RedeliveriesRaw {
    redeliveries: i64,
}

const INSERT_DEAD_LETTER: &str = r#"
INSERT INTO dead_letters(entry_uid, account_uid, event_uid, user_uid, channel, recipient, subject, body, idempotency_key, send_at, reason, redeliveries, failed_at)
VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
"#;

impl PostgresDeliveryQueue {
    async fn insert_dead_letter<'e, E>(
        &self,
        executor: E,
        entry: &QueueEntry,
        reason: &str,
        redeliveries: i64,
        failed_at: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(INSERT_DEAD_LETTER)
            .bind(entry.id.inner_ref())
            .bind(entry.account_id.inner_ref())
            .bind(entry.event_id.inner_ref())
            .bind(entry.user_id.inner_ref())
            .bind(entry.channel.to_string())
            .bind(&entry.recipient)
            .bind(&entry.subject)
            .bind(&entry.body)
            .bind(&entry.idempotency_key)
            .bind(entry.send_at)
            .bind(reason)
            .bind(redeliveries)
            .bind(failed_at)
            .execute(executor)
            .await?;
        Ok(())
    }

    async fn move_to_dead_letters(
        &self,
        entry: &QueueEntry,
        receipt: &ID,
        redeliveries: i64,
        reason: &str,
        failed_at: i64,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            r#"
            DELETE FROM delivery_queue
            WHERE entry_uid = $1 AND receipt = $2
            "#,
        )
        .bind(entry.id.inner_ref())
        .bind(receipt.inner_ref())
        .execute(&mut *tx)
        .await?;
        // Another claim superseded this lease in the meantime
        if res.rows_affected() == 0 {
            return Ok(());
        }
        self.insert_dead_letter(&mut *tx, entry, reason, redeliveries, failed_at)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn try_claim(&self) -> anyhow::Result<Option<DeliveryLease>> {
        loop {
            let now = self.sys.get_timestamp_millis();
            let receipt = ID::default();
            let claimed: Option<QueueEntryRaw> = sqlx::query_as(
                r#"
                UPDATE delivery_queue AS q
                SET receipt = $1,
                    visible_at = $2,
                    redeliveries = q.redeliveries + CASE WHEN q.receipt IS NULL THEN 0 ELSE 1 END
                FROM (
                    SELECT entry_uid FROM delivery_queue
                    WHERE visible_at <= $3
                    ORDER BY send_at, seq
                    LIMIT 1
                    FOR UPDATE SKIP LOCKED
                ) AS next_entry
                WHERE q.entry_uid = next_entry.entry_uid
                RETURNING q.*
                "#,
            )
            .bind(receipt.inner_ref())
            .bind(now + self.settings.visibility_timeout_millis)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Unable to claim queue entry. DB returned error: {:?}", e);
                e
            })?;

            let raw = match claimed {
                Some(raw) => raw,
                None => return Ok(None),
            };
            // A lease expiry pushed this entry over the redelivery limit
            if raw.redeliveries > self.settings.max_redeliveries {
                let lease = raw.into_lease(receipt);
                self.move_to_dead_letters(
                    &lease.entry,
                    &lease.receipt,
                    lease.redeliveries,
                    "redelivery limit exceeded after lease expiry",
                    now,
                )
                .await?;
                continue;
            }
            return Ok(Some(raw.into_lease(receipt)));
        }
    }
}

#[async_trait::async_trait]
impl IDeliveryQueue for PostgresDeliveryQueue {
    async fn enqueue(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO delivery_queue(entry_uid, account_uid, event_uid, user_uid, channel, recipient, subject, body, idempotency_key, send_at, visible_at)
                VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
                ON CONFLICT (entry_uid) DO NOTHING
                "#,
            )
            .bind(entry.id.inner_ref())
            .bind(entry.account_id.inner_ref())
            .bind(entry.event_id.inner_ref())
            .bind(entry.user_id.inner_ref())
            .bind(entry.channel.to_string())
            .bind(&entry.recipient)
            .bind(&entry.subject)
            .bind(&entry.body)
            .bind(&entry.idempotency_key)
            .bind(entry.send_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Unable to enqueue entry: {:?}. DB returned error: {:?}",
                    entry, e
                );
                e
            })?;
        }
        Ok(())
    }

    async fn dequeue(&self, max_wait: Duration) -> anyhow::Result<Option<DeliveryLease>> {
        let deadline = Instant::now() + max_wait;
        loop {
            if let Some(lease) = self.try_claim().await? {
                return Ok(Some(lease));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let wait = remaining.min(Duration::from_millis(
                self.settings.poll_interval_millis.max(1) as u64,
            ));
            sleep(wait).await;
        }
    }

    async fn ack(&self, lease: &DeliveryLease) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM delivery_queue
            WHERE entry_uid = $1 AND receipt = $2
            "#,
        )
        .bind(lease.entry.id.inner_ref())
        .bind(lease.receipt.inner_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to ack entry: {:?}. DB returned error: {:?}",
                lease.entry.id, e
            );
            e
        })?;
        Ok(())
    }

    async fn nack(&self, lease: &DeliveryLease) -> anyhow::Result<NackOutcome> {
        let now = self.sys.get_timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let current: Option<RedeliveriesRaw> = sqlx::query_as(
            r#"
            SELECT redeliveries FROM delivery_queue
            WHERE entry_uid = $1 AND receipt = $2
            FOR UPDATE
            "#,
        )
        .bind(lease.entry.id.inner_ref())
        .bind(lease.receipt.inner_ref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!(
                "Unable to nack entry: {:?}. DB returned error: {:?}",
                lease.entry.id, e
            );
            e
        })?;
        let current = match current {
            Some(row) => row.redeliveries,
            None => return Ok(NackOutcome::Expired),
        };

        let redeliveries = current + 1;
        if redeliveries > self.settings.max_redeliveries {
            sqlx::query("DELETE FROM delivery_queue WHERE entry_uid = $1")
                .bind(lease.entry.id.inner_ref())
                .execute(&mut *tx)
                .await?;
            self.insert_dead_letter(
                &mut *tx,
                &lease.entry,
                "redelivery limit exceeded",
                redeliveries,
                now,
            )
            .await?;
            tx.commit().await?;
            return Ok(NackOutcome::DeadLettered);
        }

        let next_visible_at = now + self.settings.backoff_millis(redeliveries);
        sqlx::query(
            r#"
            UPDATE delivery_queue
            SET receipt = NULL,
                redeliveries = $2,
                visible_at = $3
            WHERE entry_uid = $1
            "#,
        )
        .bind(lease.entry.id.inner_ref())
        .bind(redeliveries)
        .bind(next_visible_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(NackOutcome::Requeued {
            redeliveries,
            next_visible_at,
        })
    }

    async fn dead_letter(&self, lease: &DeliveryLease, reason: &str) -> anyhow::Result<()> {
        let now = self.sys.get_timestamp_millis();
        self.move_to_dead_letters(&lease.entry, &lease.receipt, lease.redeliveries, reason, now)
            .await
    }

    async fn drain_dead_letters(&self) -> anyhow::Result<Vec<DeadLetter>> {
        let rows: Vec<DeadLetterRaw> = sqlx::query_as(
            r#"
            UPDATE dead_letters
            SET reported = TRUE
            WHERE NOT reported
            RETURNING *
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Unable to drain dead letters. DB returned error: {:?}", e);
            e
        })?;
        Ok(rows.into_iter().map(|row| row.into()).collect())
    }
}
