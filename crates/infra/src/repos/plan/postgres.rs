use super::IPlanEntryRepo;
use sqlx::{types::Uuid, FromRow, PgPool};
use std::collections::HashMap;
use tracing::error;
use vicinity_domain::{PlanEntry, PlanEntryStatus, ID};

pub struct PostgresPlanEntryRepo {
    pool: PgPool,
}

impl PostgresPlanEntryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PlanEntryRaw {
    event_uid: Uuid,
    user_uid: Uuid,
    account_uid: Uuid,
    channel: String,
    recipient: String,
    send_at: i64,
    status: String,
    created: i64,
}

impl From<PlanEntryRaw> for PlanEntry {
    fn from(e: PlanEntryRaw) -> Self {
        Self {
            event_id: e.event_uid.into(),
            user_id: e.user_uid.into(),
            account_id: e.account_uid.into(),
            channel: e.channel.parse().unwrap(),
            recipient: e.recipient,
            send_at: e.send_at,
            status: e.status.parse().unwrap(),
            created: e.created,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserEntryCountRaw {
    user_uid: Uuid,
    entry_count: i64,
}

#[async_trait::async_trait]
impl IPlanEntryRepo for PostgresPlanEntryRepo {
    async fn insert_new(&self, entries: &[PlanEntry]) -> anyhow::Result<Vec<PlanEntry>> {
        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            let res: Option<PlanEntryRaw> = sqlx::query_as(
                r#"
                INSERT INTO plan_entries(event_uid, user_uid, account_uid, channel, recipient, send_at, status, created)
                VALUES($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (event_uid, user_uid) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(entry.event_id.inner_ref())
            .bind(entry.user_id.inner_ref())
            .bind(entry.account_id.inner_ref())
            .bind(entry.channel.to_string())
            .bind(&entry.recipient)
            .bind(entry.send_at)
            .bind(entry.status.to_string())
            .bind(entry.created)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Unable to insert plan entry: {:?}. DB returned error: {:?}",
                    entry, e
                );
                e
            })?;
            if let Some(raw) = res {
                inserted.push(raw.into());
            }
        }
        Ok(inserted)
    }

    async fn remove(&self, event_id: &ID, user_ids: &[ID]) -> anyhow::Result<()> {
        let ids = user_ids.iter().map(|id| *id.inner_ref()).collect::<Vec<_>>();
        sqlx::query(
            r#"
            DELETE FROM plan_entries
            WHERE event_uid = $1 AND user_uid = ANY($2)
            "#,
        )
        .bind(event_id.inner_ref())
        .bind(&ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Remove plan entries for event: {:?} and users: {:?} failed. DB returned error: {:?}",
                event_id, user_ids, e
            );
            e
        })?;
        Ok(())
    }

    async fn find(&self, event_id: &ID, user_id: &ID) -> Option<PlanEntry> {
        let res: Option<PlanEntryRaw> = sqlx::query_as(
            r#"
            SELECT * FROM plan_entries
            WHERE event_uid = $1 AND user_uid = $2
            "#,
        )
        .bind(event_id.inner_ref())
        .bind(user_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find plan entry for event: {:?} and user: {:?} failed. DB returned error: {:?}",
                event_id, user_id, e
            );
            e
        })
        .ok()?;
        res.map(|entry| entry.into())
    }

    async fn find_by_event(&self, event_id: &ID) -> anyhow::Result<Vec<PlanEntry>> {
        let entries_raw: Vec<PlanEntryRaw> = sqlx::query_as(
            r#"
            SELECT * FROM plan_entries
            WHERE event_uid = $1
            "#,
        )
        .bind(event_id.inner_ref())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find plan entries for event: {:?} failed. DB returned error: {:?}",
                event_id, e
            );
            e
        })?;
        Ok(entries_raw.into_iter().map(|entry| entry.into()).collect())
    }

    async fn set_status(
        &self,
        event_id: &ID,
        user_id: &ID,
        status: PlanEntryStatus,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE plan_entries
            SET status = $3
            WHERE event_uid = $1 AND user_uid = $2
            "#,
        )
        .bind(event_id.inner_ref())
        .bind(user_id.inner_ref())
        .bind(status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Set status: {} on plan entry for event: {:?} and user: {:?} failed. DB returned error: {:?}",
                status, event_id, user_id, e
            );
            e
        })?;
        Ok(())
    }

    async fn cancel_scheduled_by_event(&self, event_id: &ID) -> anyhow::Result<i64> {
        let res = sqlx::query(
            r#"
            UPDATE plan_entries
            SET status = $2
            WHERE event_uid = $1 AND status = $3
            "#,
        )
        .bind(event_id.inner_ref())
        .bind(PlanEntryStatus::Cancelled.to_string())
        .bind(PlanEntryStatus::Scheduled.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Cancel scheduled plan entries for event: {:?} failed. DB returned error: {:?}",
                event_id, e
            );
            e
        })?;
        Ok(res.rows_affected() as i64)
    }

    async fn cancel_scheduled_by_user(&self, user_id: &ID) -> anyhow::Result<i64> {
        let res = sqlx::query(
            r#"
            UPDATE plan_entries
            SET status = $2
            WHERE user_uid = $1 AND status = $3
            "#,
        )
        .bind(user_id.inner_ref())
        .bind(PlanEntryStatus::Cancelled.to_string())
        .bind(PlanEntryStatus::Scheduled.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Cancel scheduled plan entries for user: {:?} failed. DB returned error: {:?}",
                user_id, e
            );
            e
        })?;
        Ok(res.rows_affected() as i64)
    }

    async fn count_created_since(
        &self,
        user_ids: &[ID],
        since: i64,
    ) -> anyhow::Result<HashMap<ID, i64>> {
        let ids = user_ids.iter().map(|id| *id.inner_ref()).collect::<Vec<_>>();
        let counts_raw: Vec<UserEntryCountRaw> = sqlx::query_as(
            r#"
            SELECT user_uid, COUNT(*) AS entry_count FROM plan_entries
            WHERE user_uid = ANY($1) AND created >= $2 AND status != $3
            GROUP BY user_uid
            "#,
        )
        .bind(&ids)
        .bind(since)
        .bind(PlanEntryStatus::Cancelled.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Count plan entries created since: {} for users: {:?} failed. DB returned error: {:?}",
                since, user_ids, e
            );
            e
        })?;

        Ok(counts_raw
            .into_iter()
            .map(|row| (row.user_uid.into(), row.entry_count))
            .collect())
    }
}
