use serde::{Deserialize, Serialize};
use vicinity_domain::{Event, ID};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventDTO {
    pub id: ID,
    pub creator_id: ID,
    pub title: String,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    pub venue_address: Option<String>,
    pub starts_at: i64,
    pub category: String,
    pub created: i64,
    pub updated: i64,
}

impl EventDTO {
    pub fn new(event: Event) -> Self {
        Self {
            id: event.id.clone(),
            creator_id: event.creator_id.clone(),
            title: event.title,
            description: event.description,
            lat: event.location.lat(),
            lng: event.location.lng(),
            venue_address: event.venue_address,
            starts_at: event.starts_at,
            category: event.category,
            created: event.created,
            updated: event.updated,
        }
    }
}
