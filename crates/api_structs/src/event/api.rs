use crate::dtos::EventDTO;
use serde::{Deserialize, Serialize};
use vicinity_domain::{Event, ID};

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub event: EventDTO,
}

impl EventResponse {
    pub fn new(event: Event) -> Self {
        Self {
            event: EventDTO::new(event),
        }
    }
}

pub mod create_event {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub creator_id: ID,
        pub title: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub lat: Option<f64>,
        #[serde(default)]
        pub lng: Option<f64>,
        #[serde(default)]
        pub address: Option<String>,
        pub starts_at: i64,
        pub category: String,
    }

    pub type APIResponse = EventResponse;
}

pub mod get_event {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub event_id: ID,
    }

    pub type APIResponse = EventResponse;
}

pub mod search_events {
    use super::*;

    #[derive(Debug, Deserialize, Serialize, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct QueryParams {
        #[serde(default)]
        pub category: Option<String>,
        #[serde(default)]
        pub address: Option<String>,
        #[serde(default)]
        pub lat: Option<f64>,
        #[serde(default)]
        pub lng: Option<f64>,
        /// Search radius in meters, only used together with a position
        #[serde(default)]
        pub radius: Option<f64>,
        #[serde(default)]
        pub from: Option<i64>,
        #[serde(default)]
        pub to: Option<i64>,
        #[serde(default)]
        pub page: Option<usize>,
        #[serde(default)]
        pub limit: Option<usize>,
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub events: Vec<EventDTO>,
    }

    impl APIResponse {
        pub fn new(events: Vec<Event>) -> Self {
            Self {
                events: events.into_iter().map(EventDTO::new).collect(),
            }
        }
    }
}

pub mod update_event {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub event_id: ID,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[serde(default)]
        pub title: Option<String>,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub starts_at: Option<i64>,
    }

    pub type APIResponse = EventResponse;
}

pub mod delete_event {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub event_id: ID,
    }

    pub type APIResponse = EventResponse;
}
