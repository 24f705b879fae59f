use super::IGeoIndex;
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;
use vicinity_domain::{GeoPoint, UserLocation, ID};

/// Geo index over a PostGIS `geography(Point, 4326)` column with a GIST
/// index, queried with non-spheroid `ST_DWithin` so distances agree with
/// `GeoPoint::distance_meters`.
pub struct PostgresGeoIndex {
    pool: PgPool,
}

impl PostgresGeoIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserLocationRaw {
    user_uid: Uuid,
    lat: f64,
    lng: f64,
    updated: i64,
}

impl From<UserLocationRaw> for UserLocation {
    fn from(e: UserLocationRaw) -> Self {
        Self {
            user_id: e.user_uid.into(),
            point: GeoPoint::new(e.lat, e.lng).unwrap(),
            updated: e.updated,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserIdRaw {
    user_uid: Uuid,
}

#[async_trait::async_trait]
impl IGeoIndex for PostgresGeoIndex {
    async fn upsert(&self, location: UserLocation) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_locations(user_uid, location, updated)
            VALUES($1, ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography, $4)
            ON CONFLICT (user_uid) DO UPDATE
            SET location = ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography,
            updated = $4
            "#,
        )
        .bind(location.user_id.inner_ref())
        .bind(location.point.lng())
        .bind(location.point.lat())
        .bind(location.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to upsert user location: {:?}. DB returned error: {:?}",
                location, e
            );
            e
        })?;
        Ok(())
    }

    async fn remove(&self, user_id: &ID) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM user_locations
            WHERE user_uid = $1
            "#,
        )
        .bind(user_id.inner_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Remove user location for user: {:?} failed. DB returned error: {:?}",
                user_id, e
            );
            e
        })?;
        Ok(())
    }

    async fn find(&self, user_id: &ID) -> anyhow::Result<Option<UserLocation>> {
        let res: Option<UserLocationRaw> = sqlx::query_as(
            r#"
            SELECT user_uid,
                ST_Y(location::geometry) AS lat,
                ST_X(location::geometry) AS lng,
                updated
            FROM user_locations
            WHERE user_uid = $1
            "#,
        )
        .bind(user_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find user location for user: {:?} failed. DB returned error: {:?}",
                user_id, e
            );
            e
        })?;
        Ok(res.map(|location| location.into()))
    }

    async fn query(&self, center: &GeoPoint, radius_meters: f64) -> anyhow::Result<Vec<ID>> {
        let rows: Vec<UserIdRaw> = sqlx::query_as(
            r#"
            SELECT user_uid FROM user_locations
            WHERE ST_DWithin(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3, false)
            "#,
        )
        .bind(center.lng())
        .bind(center.lat())
        .bind(radius_meters)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Geo index query at: {:?} with radius: {} failed. DB returned error: {:?}",
                center, radius_meters, e
            );
            e
        })?;
        Ok(rows.into_iter().map(|row| row.user_uid.into()).collect())
    }
}
