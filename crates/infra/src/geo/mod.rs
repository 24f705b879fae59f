mod inmemory;
mod postgres;

pub use inmemory::InMemoryGeoIndex;
pub use postgres::PostgresGeoIndex;
use vicinity_domain::{GeoPoint, UserLocation, ID};

/// Tracks the last known position of every user and answers the radius
/// queries behind notification fan-out. At most one position per user.
#[async_trait::async_trait]
pub trait IGeoIndex: Send + Sync {
    async fn upsert(&self, location: UserLocation) -> anyhow::Result<()>;
    async fn remove(&self, user_id: &ID) -> anyhow::Result<()>;
    async fn find(&self, user_id: &ID) -> anyhow::Result<Option<UserLocation>>;
    /// Ids of every user whose position is within `radius_meters` of
    /// `center`, by great-circle distance.
    async fn query(&self, center: &GeoPoint, radius_meters: f64) -> anyhow::Result<Vec<ID>>;
}
