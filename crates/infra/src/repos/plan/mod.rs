mod inmemory;
mod postgres;

pub use inmemory::InMemoryPlanEntryRepo;
pub use postgres::PostgresPlanEntryRepo;
use std::collections::HashMap;
use vicinity_domain::{PlanEntry, PlanEntryStatus, ID};

#[async_trait::async_trait]
pub trait IPlanEntryRepo: Send + Sync {
    /// Inserts the given entries, skipping every `(event, user)` pair that
    /// already has an entry. Returns the entries that were actually
    /// inserted, so replaying a plan never notifies a user twice.
    async fn insert_new(&self, entries: &[PlanEntry]) -> anyhow::Result<Vec<PlanEntry>>;
    /// Removes entries again after a failed enqueue, so a retried plan run
    /// can recreate them.
    async fn remove(&self, event_id: &ID, user_ids: &[ID]) -> anyhow::Result<()>;
    async fn find(&self, event_id: &ID, user_id: &ID) -> Option<PlanEntry>;
    async fn find_by_event(&self, event_id: &ID) -> anyhow::Result<Vec<PlanEntry>>;
    async fn set_status(
        &self,
        event_id: &ID,
        user_id: &ID,
        status: PlanEntryStatus,
    ) -> anyhow::Result<()>;
    /// Flips every scheduled entry for the event to cancelled. Returns the
    /// number of entries affected.
    async fn cancel_scheduled_by_event(&self, event_id: &ID) -> anyhow::Result<i64>;
    /// Flips every scheduled entry for the user to cancelled. Returns the
    /// number of entries affected.
    async fn cancel_scheduled_by_user(&self, user_id: &ID) -> anyhow::Result<i64>;
    /// Number of not-cancelled entries created at or after `since`, per
    /// user. Users without entries are absent from the map.
    async fn count_created_since(
        &self,
        user_ids: &[ID],
        since: i64,
    ) -> anyhow::Result<HashMap<ID, i64>>;
}

#[cfg(test)]
mod tests {
    use crate::VicinityContext;
    use vicinity_domain::{DeliveryChannel, PlanEntry, PlanEntryStatus, ID};

    fn entry(event_id: &ID, user_id: &ID, created: i64) -> PlanEntry {
        PlanEntry {
            event_id: event_id.clone(),
            user_id: user_id.clone(),
            account_id: Default::default(),
            channel: DeliveryChannel::Email,
            recipient: "joe@vicinity.dev".into(),
            send_at: created,
            status: PlanEntryStatus::Scheduled,
            created,
        }
    }

    #[tokio::test]
    async fn inserts_each_pair_only_once() {
        let ctx = VicinityContext::create_inmemory();
        let event_id = ID::default();
        let user_id = ID::default();
        let other_user_id = ID::default();

        let inserted = ctx
            .repos
            .plans
            .insert_new(&[entry(&event_id, &user_id, 10)])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 1);

        // Replaying the plan only inserts the pair that is still missing
        let inserted = ctx
            .repos
            .plans
            .insert_new(&[
                entry(&event_id, &user_id, 20),
                entry(&event_id, &other_user_id, 20),
            ])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].user_id, other_user_id);

        let entries = ctx.repos.plans.find_by_event(&event_id).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn removes_pairs_for_replanning() {
        let ctx = VicinityContext::create_inmemory();
        let event_id = ID::default();
        let user_id = ID::default();

        ctx.repos
            .plans
            .insert_new(&[entry(&event_id, &user_id, 10)])
            .await
            .unwrap();
        ctx.repos
            .plans
            .remove(&event_id, &[user_id.clone()])
            .await
            .unwrap();
        assert!(ctx.repos.plans.find(&event_id, &user_id).await.is_none());

        // The pair can be planned again afterwards
        let inserted = ctx
            .repos
            .plans
            .insert_new(&[entry(&event_id, &user_id, 20)])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 1);
    }

    #[tokio::test]
    async fn updates_status_and_cancels_scheduled() {
        let ctx = VicinityContext::create_inmemory();
        let event_id = ID::default();
        let delivered_user = ID::default();
        let pending_user = ID::default();

        ctx.repos
            .plans
            .insert_new(&[
                entry(&event_id, &delivered_user, 10),
                entry(&event_id, &pending_user, 10),
            ])
            .await
            .unwrap();

        ctx.repos
            .plans
            .set_status(&event_id, &delivered_user, PlanEntryStatus::Delivered)
            .await
            .unwrap();

        // Only the still scheduled entry flips to cancelled
        let cancelled = ctx
            .repos
            .plans
            .cancel_scheduled_by_event(&event_id)
            .await
            .unwrap();
        assert_eq!(cancelled, 1);

        let delivered = ctx
            .repos
            .plans
            .find(&event_id, &delivered_user)
            .await
            .unwrap();
        assert_eq!(delivered.status, PlanEntryStatus::Delivered);
        let pending = ctx
            .repos
            .plans
            .find(&event_id, &pending_user)
            .await
            .unwrap();
        assert_eq!(pending.status, PlanEntryStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancels_scheduled_by_user() {
        let ctx = VicinityContext::create_inmemory();
        let user_id = ID::default();
        let event1 = ID::default();
        let event2 = ID::default();

        ctx.repos
            .plans
            .insert_new(&[entry(&event1, &user_id, 10), entry(&event2, &user_id, 10)])
            .await
            .unwrap();
        ctx.repos
            .plans
            .set_status(&event1, &user_id, PlanEntryStatus::Delivered)
            .await
            .unwrap();

        let cancelled = ctx
            .repos
            .plans
            .cancel_scheduled_by_user(&user_id)
            .await
            .unwrap();
        assert_eq!(cancelled, 1);
    }

    #[tokio::test]
    async fn counts_recent_entries_per_user() {
        let ctx = VicinityContext::create_inmemory();
        let user_id = ID::default();
        let quiet_user_id = ID::default();
        let events = vec![ID::default(), ID::default(), ID::default()];

        ctx.repos
            .plans
            .insert_new(&[
                entry(&events[0], &user_id, 100),
                entry(&events[1], &user_id, 200),
                entry(&events[2], &user_id, 50),
            ])
            .await
            .unwrap();

        let counts = ctx
            .repos
            .plans
            .count_created_since(&[user_id.clone(), quiet_user_id.clone()], 100)
            .await
            .unwrap();
        assert_eq!(counts.get(&user_id), Some(&2));
        assert_eq!(counts.get(&quiet_user_id), None);

        // Cancelled entries do not count towards the rate limit
        ctx.repos
            .plans
            .set_status(&events[0], &user_id, PlanEntryStatus::Cancelled)
            .await
            .unwrap();
        let counts = ctx
            .repos
            .plans
            .count_created_since(&[user_id.clone()], 100)
            .await
            .unwrap();
        assert_eq!(counts.get(&user_id), Some(&1));
    }
}
