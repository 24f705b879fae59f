use super::IEventRepo;
use crate::repos::shared::query_structs::EventSearchQuery;
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;
use vicinity_domain::{Event, GeoPoint, ID};

pub struct PostgresEventRepo {
    pool: PgPool,
}

impl PostgresEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EVENT_COLUMNS: &str = r#"
    e.event_uid, e.account_uid, e.creator_uid, e.title, e.description,
    ST_Y(e.location::geometry) AS lat,
    ST_X(e.location::geometry) AS lng,
    e.venue_address, e.starts_at, e.category, e.created, e.updated
"#;

#[derive(Debug, FromRow)]
struct EventRaw {
    event_uid: Uuid,
    account_uid: Uuid,
    creator_uid: Uuid,
    title: String,
    description: String,
    lat: f64,
    lng: f64,
    venue_address: Option<String>,
    starts_at: i64,
    category: String,
    created: i64,
    updated: i64,
}

impl From<EventRaw> for Event {
    fn from(e: EventRaw) -> Self {
        Self {
            id: e.event_uid.into(),
            account_id: e.account_uid.into(),
            creator_id: e.creator_uid.into(),
            title: e.title,
            description: e.description,
            location: GeoPoint::new(e.lat, e.lng).unwrap(),
            venue_address: e.venue_address,
            starts_at: e.starts_at,
            category: e.category,
            created: e.created,
            updated: e.updated,
        }
    }
}

#[async_trait::async_trait]
impl IEventRepo for PostgresEventRepo {
    async fn try_insert(
        &self,
        event: &Event,
        duplicate_distance_meters: f64,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent creates of the same identity so two identical
        // requests cannot both pass the NOT EXISTS guard below.
        let identity = format!(
            "{}:{}:{}:{}",
            event.account_id, event.title, event.starts_at, event.category
        );
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(&identity)
            .execute(&mut *tx)
            .await?;

        let res = sqlx::query(
            r#"
            INSERT INTO events(event_uid, account_uid, creator_uid, title, description, location, venue_address, starts_at, category, created, updated)
            SELECT $1, $2, $3, $4, $5, ST_SetSRID(ST_MakePoint($6, $7), 4326)::geography, $8, $9, $10, $11, $12
            WHERE NOT EXISTS (
                SELECT 1 FROM events AS e
                WHERE e.account_uid = $2 AND
                e.title = $4 AND
                e.starts_at = $9 AND
                e.category = $10 AND
                ST_DWithin(e.location, ST_SetSRID(ST_MakePoint($6, $7), 4326)::geography, $13, false)
            )
            "#,
        )
        .bind(event.id.inner_ref())
        .bind(event.account_id.inner_ref())
        .bind(event.creator_id.inner_ref())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.location.lng())
        .bind(event.location.lat())
        .bind(&event.venue_address)
        .bind(event.starts_at)
        .bind(&event.category)
        .bind(event.created)
        .bind(event.updated)
        .bind(duplicate_distance_meters)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert event: {:?}. DB returned error: {:?}",
                event, e
            );
            e
        })?;

        tx.commit().await?;

        Ok(res.rows_affected() == 1)
    }

    async fn save(&self, event: &Event) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE events
            SET title = $2,
            description = $3,
            venue_address = $4,
            starts_at = $5,
            category = $6,
            updated = $7
            WHERE event_uid = $1
            "#,
        )
        .bind(event.id.inner_ref())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.venue_address)
        .bind(event.starts_at)
        .bind(&event.category)
        .bind(event.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to save event: {:?}. DB returned error: {:?}",
                event, e
            );
            e
        })?;
        Ok(())
    }

    async fn find(&self, event_id: &ID) -> Option<Event> {
        let res: Option<EventRaw> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM events AS e
            WHERE e.event_uid = $1
            "#,
            EVENT_COLUMNS
        ))
        .bind(event_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find event with id: {:?} failed. DB returned error: {:?}",
                event_id, e
            );
            e
        })
        .ok()?;
        res.map(|ev| ev.into())
    }

    async fn delete(&self, event_id: &ID) -> Option<Event> {
        let res: Option<EventRaw> = sqlx::query_as(&format!(
            r#"
            WITH deleted AS (
                DELETE FROM events
                WHERE event_uid = $1
                RETURNING *
            )
            SELECT {} FROM deleted AS e
            "#,
            EVENT_COLUMNS
        ))
        .bind(event_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Delete event with id: {:?} failed. DB returned error: {:?}",
                event_id, e
            );
            e
        })
        .ok()?;
        res.map(|ev| ev.into())
    }

    async fn search(&self, query: EventSearchQuery) -> anyhow::Result<Vec<Event>> {
        let category = query.category.as_ref().map(|c| format!("%{}%", c));
        let radius = query.near.as_ref().map(|n| n.radius_meters);
        let lng = query.near.as_ref().map(|n| n.center.lng());
        let lat = query.near.as_ref().map(|n| n.center.lat());

        let events_raw: Vec<EventRaw> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM events AS e
            WHERE e.account_uid = $1 AND
            ($2::text IS NULL OR e.category ILIKE $2) AND
            ($3::double precision IS NULL OR ST_DWithin(e.location, ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography, $3, false)) AND
            ($6::bigint IS NULL OR e.starts_at >= $6) AND
            ($7::bigint IS NULL OR e.starts_at <= $7)
            ORDER BY e.starts_at
            LIMIT $8
            OFFSET $9
            "#,
            EVENT_COLUMNS
        ))
        .bind(query.account_id.inner_ref())
        .bind(&category)
        .bind(radius)
        .bind(lng)
        .bind(lat)
        .bind(query.from)
        .bind(query.to)
        .bind(query.limit as i64)
        .bind(query.skip as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Search events with query: {:?} failed. DB returned error: {:?}",
                query, e
            );
            e
        })?;

        Ok(events_raw.into_iter().map(|ev| ev.into()).collect())
    }
}
