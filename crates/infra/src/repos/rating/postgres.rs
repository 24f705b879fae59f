use super::IRatingRepo;
use crate::repos::shared::repo::DeleteResult;
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;
use vicinity_domain::{Rating, ID};

pub struct PostgresRatingRepo {
    pool: PgPool,
}

impl PostgresRatingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RatingRaw {
    rating_uid: Uuid,
    account_uid: Uuid,
    event_uid: Uuid,
    user_uid: Uuid,
    score: i64,
    comment: Option<String>,
    created: i64,
    updated: i64,
}

impl From<RatingRaw> for Rating {
    fn from(e: RatingRaw) -> Self {
        Self {
            id: e.rating_uid.into(),
            account_id: e.account_uid.into(),
            event_id: e.event_uid.into(),
            user_id: e.user_uid.into(),
            score: e.score,
            comment: e.comment,
            created: e.created,
            updated: e.updated,
        }
    }
}

#[async_trait::async_trait]
impl IRatingRepo for PostgresRatingRepo {
    async fn upsert(&self, rating: &Rating) -> anyhow::Result<Rating> {
        let res: RatingRaw = sqlx::query_as(
            r#"
            INSERT INTO ratings(rating_uid, account_uid, event_uid, user_uid, score, comment, created, updated)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_uid, user_uid) DO UPDATE
            SET score = $5,
            comment = $6,
            updated = $8
            RETURNING *
            "#,
        )
        .bind(rating.id.inner_ref())
        .bind(rating.account_id.inner_ref())
        .bind(rating.event_id.inner_ref())
        .bind(rating.user_id.inner_ref())
        .bind(rating.score)
        .bind(&rating.comment)
        .bind(rating.created)
        .bind(rating.updated)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to upsert rating: {:?}. DB returned error: {:?}",
                rating, e
            );
            e
        })?;
        Ok(res.into())
    }

    async fn find_by_event(&self, event_id: &ID) -> anyhow::Result<Vec<Rating>> {
        let ratings_raw: Vec<RatingRaw> = sqlx::query_as(
            r#"
            SELECT * FROM ratings
            WHERE event_uid = $1
            "#,
        )
        .bind(event_id.inner_ref())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find ratings for event: {:?} failed. DB returned error: {:?}",
                event_id, e
            );
            e
        })?;
        Ok(ratings_raw.into_iter().map(|r| r.into()).collect())
    }

    async fn delete_by_event(&self, event_id: &ID) -> anyhow::Result<DeleteResult> {
        let res = sqlx::query(
            r#"
            DELETE FROM ratings
            WHERE event_uid = $1
            "#,
        )
        .bind(event_id.inner_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Delete ratings for event: {:?} failed. DB returned error: {:?}",
                event_id, e
            );
            e
        })?;
        Ok(DeleteResult {
            deleted_count: res.rows_affected() as i64,
        })
    }
}
