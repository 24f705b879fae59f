use super::IEventRepo;
use crate::repos::shared::inmemory_repo;
use crate::repos::shared::query_structs::EventSearchQuery;
use std::sync::Mutex;
use vicinity_domain::{Event, ID};

pub struct InMemoryEventRepo {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEventRepo {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IEventRepo for InMemoryEventRepo {
    async fn try_insert(
        &self,
        event: &Event,
        duplicate_distance_meters: f64,
    ) -> anyhow::Result<bool> {
        // Check and insert under the same lock, like the transactional
        // postgres variant.
        let mut events = self.events.lock().unwrap();
        let duplicate = events.iter().any(|e| {
            e.account_id == event.account_id
                && e.title == event.title
                && e.starts_at == event.starts_at
                && e.category == event.category
                && e.location.distance_meters(&event.location) <= duplicate_distance_meters
        });
        if duplicate {
            return Ok(false);
        }
        events.push(event.clone());
        Ok(true)
    }

    async fn save(&self, event: &Event) -> anyhow::Result<()> {
        inmemory_repo::save(event, &self.events);
        Ok(())
    }

    async fn find(&self, event_id: &ID) -> Option<Event> {
        inmemory_repo::find(event_id, &self.events)
    }

    async fn delete(&self, event_id: &ID) -> Option<Event> {
        inmemory_repo::delete(event_id, &self.events)
    }

    async fn search(&self, query: EventSearchQuery) -> anyhow::Result<Vec<Event>> {
        let mut events = inmemory_repo::find_by(&self.events, |event| {
            if event.account_id != query.account_id {
                return false;
            }
            if let Some(category) = &query.category {
                if !event
                    .category
                    .to_lowercase()
                    .contains(&category.to_lowercase())
                {
                    return false;
                }
            }
            if let Some(near) = &query.near {
                if event.location.distance_meters(&near.center) > near.radius_meters {
                    return false;
                }
            }
            if let Some(from) = query.from {
                if event.starts_at < from {
                    return false;
                }
            }
            if let Some(to) = query.to {
                if event.starts_at > to {
                    return false;
                }
            }
            true
        });
        events.sort_by_key(|e| e.starts_at);
        Ok(events
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .collect())
    }
}
