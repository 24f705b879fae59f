use crate::geo::GeoPoint;
use crate::shared::entity::{Entity, ID};

/// Something happening at a place and time that nearby users should hear
/// about. The location is resolved once at creation time (either given
/// directly or geocoded from `venue_address`) and never changes afterwards.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: ID,
    pub account_id: ID,
    pub creator_id: ID,
    pub title: String,
    pub description: String,
    pub location: GeoPoint,
    pub venue_address: Option<String>,
    pub starts_at: i64,
    pub category: String,
    pub created: i64,
    pub updated: i64,
}

impl Entity for Event {
    fn id(&self) -> &ID {
        &self.id
    }
}
