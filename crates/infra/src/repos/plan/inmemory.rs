use super::IPlanEntryRepo;
use crate::repos::shared::inmemory_repo;
use std::collections::HashMap;
use std::sync::Mutex;
use vicinity_domain::{PlanEntry, PlanEntryStatus, ID};

pub struct InMemoryPlanEntryRepo {
    plan_entries: Mutex<Vec<PlanEntry>>,
}

impl InMemoryPlanEntryRepo {
    pub fn new() -> Self {
        Self {
            plan_entries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IPlanEntryRepo for InMemoryPlanEntryRepo {
    async fn insert_new(&self, entries: &[PlanEntry]) -> anyhow::Result<Vec<PlanEntry>> {
        let mut collection = self.plan_entries.lock().unwrap();
        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            let exists = collection
                .iter()
                .any(|e| e.event_id == entry.event_id && e.user_id == entry.user_id);
            if !exists {
                collection.push(entry.clone());
                inserted.push(entry.clone());
            }
        }
        Ok(inserted)
    }

    async fn remove(&self, event_id: &ID, user_ids: &[ID]) -> anyhow::Result<()> {
        inmemory_repo::find_and_delete_by(&self.plan_entries, |entry| {
            entry.event_id == *event_id && user_ids.contains(&entry.user_id)
        });
        Ok(())
    }

    async fn find(&self, event_id: &ID, user_id: &ID) -> Option<PlanEntry> {
        let entries = inmemory_repo::find_by(&self.plan_entries, |entry| {
            entry.event_id == *event_id && entry.user_id == *user_id
        });
        entries.into_iter().next()
    }

    async fn find_by_event(&self, event_id: &ID) -> anyhow::Result<Vec<PlanEntry>> {
        let entries =
            inmemory_repo::find_by(&self.plan_entries, |entry| entry.event_id == *event_id);
        Ok(entries)
    }

    async fn set_status(
        &self,
        event_id: &ID,
        user_id: &ID,
        status: PlanEntryStatus,
    ) -> anyhow::Result<()> {
        inmemory_repo::update_many(
            &self.plan_entries,
            |entry| entry.event_id == *event_id && entry.user_id == *user_id,
            |entry| entry.status = status,
        );
        Ok(())
    }

    async fn cancel_scheduled_by_event(&self, event_id: &ID) -> anyhow::Result<i64> {
        let cancelled = inmemory_repo::update_many(
            &self.plan_entries,
            |entry| entry.event_id == *event_id && entry.status == PlanEntryStatus::Scheduled,
            |entry| entry.status = PlanEntryStatus::Cancelled,
        );
        Ok(cancelled)
    }

    async fn cancel_scheduled_by_user(&self, user_id: &ID) -> anyhow::Result<i64> {
        let cancelled = inmemory_repo::update_many(
            &self.plan_entries,
            |entry| entry.user_id == *user_id && entry.status == PlanEntryStatus::Scheduled,
            |entry| entry.status = PlanEntryStatus::Cancelled,
        );
        Ok(cancelled)
    }

    async fn count_created_since(
        &self,
        user_ids: &[ID],
        since: i64,
    ) -> anyhow::Result<HashMap<ID, i64>> {
        let entries = inmemory_repo::find_by(&self.plan_entries, |entry| {
            user_ids.contains(&entry.user_id)
                && entry.created >= since
                && entry.status != PlanEntryStatus::Cancelled
        });
        let mut counts = HashMap::new();
        for entry in entries {
            *counts.entry(entry.user_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
