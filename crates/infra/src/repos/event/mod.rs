mod inmemory;
mod postgres;

use crate::repos::shared::query_structs::EventSearchQuery;
pub use inmemory::InMemoryEventRepo;
pub use postgres::PostgresEventRepo;
use vicinity_domain::{Event, ID};

#[async_trait::async_trait]
pub trait IEventRepo: Send + Sync {
    /// Inserts the event unless an event with the same title, starts_at and
    /// category already exists within `duplicate_distance_meters` of its
    /// location. Returns `false` when such a duplicate blocked the insert.
    /// The check and the insert are atomic, also under concurrent calls.
    async fn try_insert(
        &self,
        event: &Event,
        duplicate_distance_meters: f64,
    ) -> anyhow::Result<bool>;
    async fn save(&self, event: &Event) -> anyhow::Result<()>;
    async fn find(&self, event_id: &ID) -> Option<Event>;
    async fn delete(&self, event_id: &ID) -> Option<Event>;
    async fn search(&self, query: EventSearchQuery) -> anyhow::Result<Vec<Event>>;
}
