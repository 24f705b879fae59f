use crate::shared::usecase::UseCase;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use vicinity_domain::{Event, NotificationMessage, PlanEntry, PlanEntryStatus, QueueEntry};
use vicinity_infra::VicinityContext;

/// Outcome counters for one planning run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanSummary {
    /// Users the geo index matched within the notify radius
    pub matched: usize,
    /// Notifications planned and enqueued by this run
    pub planned: usize,
    /// Pairs dropped because a plan entry already existed
    pub deduplicated: usize,
    /// Users dropped by the notification rate limit
    pub rate_limited: usize,
}

#[derive(Debug)]
pub struct PlanEventNotificationsUseCase {
    pub event: Event,
}

#[derive(Debug)]
pub enum UseCaseError {
    /// The geo index or the queue could not be reached. Nothing was
    /// planned, the trigger should retry.
    PlanningUnavailable(String),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for PlanEventNotificationsUseCase {
    type Response = PlanSummary;

    type Error = UseCaseError;

    const NAME: &'static str = "PlanEventNotifications";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        let event = &self.event;

        let user_ids = ctx
            .geo_index
            .query(&event.location, ctx.config.notify_radius_meters)
            .await
            .map_err(|e| {
                UseCaseError::PlanningUnavailable(format!("Geo index query failed: {}", e))
            })?;

        let mut summary = PlanSummary {
            matched: user_ids.len(),
            ..Default::default()
        };
        if user_ids.is_empty() {
            info!("Planned notifications for event: {}: {:?}", event.id, summary);
            return Ok(summary);
        }

        // A row missing for an id the index returned just means the user
        // vanished in between, skip it.
        let users = ctx
            .repos
            .users
            .find_many(&user_ids)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut recipients = Vec::with_capacity(users.len());
        for user in &users {
            // The geo index spans all tenants
            if user.account_id != event.account_id {
                continue;
            }
            match user.recipient() {
                Some(recipient) => recipients.push((user, recipient)),
                None => debug!(
                    "User: {} has no usable endpoint for channel: {}, skipping",
                    user.id, user.channel
                ),
            }
        }

        let now = ctx.sys.get_timestamp_millis();
        let since = now - ctx.config.rate_limit_window_millis;
        let candidate_ids = recipients
            .iter()
            .map(|(user, _)| user.id.clone())
            .collect::<Vec<_>>();
        let recent_counts = ctx
            .repos
            .plans
            .count_created_since(&candidate_ids, since)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let send_at = now + ctx.config.delivery_delay_millis;
        let mut entries = Vec::new();
        let mut users_by_id = HashMap::new();
        for (user, recipient) in recipients {
            let recent = recent_counts.get(&user.id).copied().unwrap_or(0);
            if recent >= ctx.config.rate_limit_max_notifications {
                summary.rate_limited += 1;
                continue;
            }
            entries.push(PlanEntry {
                event_id: event.id.clone(),
                user_id: user.id.clone(),
                account_id: event.account_id.clone(),
                channel: user.channel,
                recipient,
                send_at,
                status: PlanEntryStatus::Scheduled,
                created: now,
            });
            users_by_id.insert(user.id.clone(), user);
        }

        let inserted = ctx
            .repos
            .plans
            .insert_new(&entries)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        summary.planned = inserted.len();
        summary.deduplicated = entries.len() - inserted.len();

        if !inserted.is_empty() {
            let message = NotificationMessage::from_event(event);
            let queue_entries = inserted
                .iter()
                .filter_map(|entry| {
                    users_by_id.get(&entry.user_id).map(|user| {
                        QueueEntry::new(event, user, entry.recipient.clone(), &message, entry.send_at)
                    })
                })
                .collect::<Vec<_>>();

            if let Err(e) = ctx.queue.enqueue(&queue_entries).await {
                // Take the fresh rows back out so a retried trigger can plan
                // them again, instead of leaving entries that never reached
                // the queue.
                let inserted_ids = inserted
                    .iter()
                    .map(|entry| entry.user_id.clone())
                    .collect::<Vec<_>>();
                if let Err(remove_err) = ctx.repos.plans.remove(&event.id, &inserted_ids).await {
                    warn!(
                        "Unable to roll back plan entries for event: {} after enqueue failure: {:?}",
                        event.id, remove_err
                    );
                }
                return Err(UseCaseError::PlanningUnavailable(format!(
                    "Enqueue failed: {}",
                    e
                )));
            }
        }

        info!("Planned notifications for event: {}: {:?}", event.id, summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use vicinity_domain::{Account, DeliveryChannel, GeoPoint, User, UserLocation, ID};
    use vicinity_infra::{DeliveryLease, IDeliveryQueue, ISys, NackOutcome};

    struct TestSys(AtomicI64);

    impl TestSys {
        fn new(now: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(now)))
        }

        fn advance(&self, millis: i64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl ISys for TestSys {
        fn get_timestamp_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct FailingQueue;

    #[async_trait::async_trait]
    impl IDeliveryQueue for FailingQueue {
        async fn enqueue(&self, _entries: &[QueueEntry]) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("queue is down"))
        }
        async fn dequeue(&self, _max_wait: Duration) -> anyhow::Result<Option<DeliveryLease>> {
            Ok(None)
        }
        async fn ack(&self, _lease: &DeliveryLease) -> anyhow::Result<()> {
            Ok(())
        }
        async fn nack(&self, _lease: &DeliveryLease) -> anyhow::Result<NackOutcome> {
            Err(anyhow::anyhow!("queue is down"))
        }
        async fn dead_letter(&self, _lease: &DeliveryLease, _reason: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn drain_dead_letters(&self) -> anyhow::Result<Vec<vicinity_domain::DeadLetter>> {
            Ok(Vec::new())
        }
    }

    struct TestContext {
        ctx: VicinityContext,
        account: Account,
        sys: Arc<TestSys>,
    }

    async fn setup() -> TestContext {
        let mut ctx = VicinityContext::create_inmemory();
        let sys = TestSys::new(0);
        ctx.sys = sys.clone();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();
        TestContext { ctx, account, sys }
    }

    async fn user_at(ctx: &VicinityContext, account_id: &ID, email: &str, lat: f64, lng: f64) -> User {
        let user = User::new(account_id.clone(), email.into());
        ctx.repos.users.insert(&user).await.unwrap();
        ctx.geo_index
            .upsert(UserLocation {
                user_id: user.id.clone(),
                point: GeoPoint::new(lat, lng).unwrap(),
                updated: 0,
            })
            .await
            .unwrap();
        user
    }

    fn event_at(account_id: &ID, title: &str, lat: f64, lng: f64) -> Event {
        Event {
            id: Default::default(),
            account_id: account_id.clone(),
            creator_id: Default::default(),
            title: title.into(),
            description: "".into(),
            location: GeoPoint::new(lat, lng).unwrap(),
            venue_address: None,
            starts_at: 1_735_732_800_000,
            category: "music".into(),
            created: 0,
            updated: 0,
        }
    }

    async fn drain_queue_recipients(ctx: &VicinityContext) -> Vec<String> {
        let mut recipients = Vec::new();
        while let Some(lease) = ctx.queue.dequeue(Duration::ZERO).await.unwrap() {
            recipients.push(lease.entry.recipient.clone());
            ctx.queue.ack(&lease).await.unwrap();
        }
        recipients.sort();
        recipients
    }

    #[actix_web::test]
    async fn plans_users_within_the_notify_radius_only() {
        let TestContext { ctx, account, .. } = setup().await;
        // Roughly 1 km, 40 km and 60 km north of the event
        user_at(&ctx, &account.id, "near@vicinity.dev", 40.7218, -74.0060).await;
        user_at(&ctx, &account.id, "mid@vicinity.dev", 41.0725, -74.0060).await;
        user_at(&ctx, &account.id, "far@vicinity.dev", 41.2524, -74.0060).await;

        let event = event_at(&account.id, "Jazz in the park", 40.7128, -74.0060);
        let mut usecase = PlanEventNotificationsUseCase { event };
        let summary = usecase.execute(&ctx).await.unwrap();

        assert_eq!(summary.matched, 2);
        assert_eq!(summary.planned, 2);
        assert_eq!(summary.deduplicated, 0);
        assert_eq!(summary.rate_limited, 0);
        assert_eq!(
            drain_queue_recipients(&ctx).await,
            vec!["mid@vicinity.dev".to_string(), "near@vicinity.dev".to_string()]
        );
    }

    #[actix_web::test]
    async fn does_not_plan_the_same_pair_twice() {
        let TestContext { ctx, account, .. } = setup().await;
        user_at(&ctx, &account.id, "near@vicinity.dev", 40.7218, -74.0060).await;
        let event = event_at(&account.id, "Jazz in the park", 40.7128, -74.0060);

        let mut usecase = PlanEventNotificationsUseCase { event: event.clone() };
        let first = usecase.execute(&ctx).await.unwrap();
        let mut usecase = PlanEventNotificationsUseCase { event };
        let second = usecase.execute(&ctx).await.unwrap();

        assert_eq!(first.planned, 1);
        assert_eq!(second.planned, 0);
        assert_eq!(second.deduplicated, 1);
        assert_eq!(drain_queue_recipients(&ctx).await.len(), 1);
    }

    #[actix_web::test]
    async fn does_not_plan_the_same_pair_twice_concurrently() {
        let TestContext { ctx, account, .. } = setup().await;
        user_at(&ctx, &account.id, "near@vicinity.dev", 40.7218, -74.0060).await;
        let event = event_at(&account.id, "Jazz in the park", 40.7128, -74.0060);

        let mut first = PlanEventNotificationsUseCase { event: event.clone() };
        let mut second = PlanEventNotificationsUseCase { event };
        let (first, second) = futures::join!(first.execute(&ctx), second.execute(&ctx));

        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.planned + second.planned, 1);
        assert_eq!(drain_queue_recipients(&ctx).await.len(), 1);
    }

    #[actix_web::test]
    async fn rate_limits_users_within_the_trailing_window() {
        let TestContext {
            mut ctx,
            account,
            sys,
        } = setup().await;
        ctx.config.rate_limit_max_notifications = 1;
        user_at(&ctx, &account.id, "near@vicinity.dev", 40.7218, -74.0060).await;

        let mut usecase = PlanEventNotificationsUseCase {
            event: event_at(&account.id, "First concert", 40.7128, -74.0060),
        };
        assert_eq!(usecase.execute(&ctx).await.unwrap().planned, 1);

        sys.advance(10);
        let mut usecase = PlanEventNotificationsUseCase {
            event: event_at(&account.id, "Second concert", 40.7128, -74.0060),
        };
        let limited = usecase.execute(&ctx).await.unwrap();
        assert_eq!(limited.planned, 0);
        assert_eq!(limited.rate_limited, 1);

        // Once the window has rolled past the first entry the user is
        // eligible again
        sys.advance(ctx.config.rate_limit_window_millis);
        let mut usecase = PlanEventNotificationsUseCase {
            event: event_at(&account.id, "Third concert", 40.7128, -74.0060),
        };
        let replanned = usecase.execute(&ctx).await.unwrap();
        assert_eq!(replanned.planned, 1);
        assert_eq!(replanned.rate_limited, 0);
    }

    #[actix_web::test]
    async fn skips_users_without_a_usable_recipient() {
        let TestContext { ctx, account, .. } = setup().await;
        let mut user = User::new(account.id.clone(), "gal@vicinity.dev".into());
        user.channel = DeliveryChannel::Sms;
        ctx.repos.users.insert(&user).await.unwrap();
        ctx.geo_index
            .upsert(UserLocation {
                user_id: user.id.clone(),
                point: GeoPoint::new(40.7218, -74.0060).unwrap(),
                updated: 0,
            })
            .await
            .unwrap();

        let mut usecase = PlanEventNotificationsUseCase {
            event: event_at(&account.id, "Jazz in the park", 40.7128, -74.0060),
        };
        let summary = usecase.execute(&ctx).await.unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.planned, 0);
    }

    #[actix_web::test]
    async fn does_not_notify_users_of_other_accounts() {
        let TestContext { ctx, account, .. } = setup().await;
        let other_account = Account::new();
        ctx.repos.accounts.insert(&other_account).await.unwrap();
        user_at(&ctx, &other_account.id, "other@vicinity.dev", 40.7218, -74.0060).await;

        let mut usecase = PlanEventNotificationsUseCase {
            event: event_at(&account.id, "Jazz in the park", 40.7128, -74.0060),
        };
        let summary = usecase.execute(&ctx).await.unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.planned, 0);
    }

    #[actix_web::test]
    async fn rolls_back_plan_entries_when_the_enqueue_fails() {
        let TestContext { mut ctx, account, .. } = setup().await;
        let user = user_at(&ctx, &account.id, "near@vicinity.dev", 40.7218, -74.0060).await;
        let event = event_at(&account.id, "Jazz in the park", 40.7128, -74.0060);

        let healthy_queue = ctx.queue.clone();
        ctx.queue = Arc::new(FailingQueue);

        let mut usecase = PlanEventNotificationsUseCase { event: event.clone() };
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::PlanningUnavailable(_))
        ));
        assert!(ctx.repos.plans.find(&event.id, &user.id).await.is_none());

        // A retried trigger plans the rolled back pair again
        ctx.queue = healthy_queue;
        let mut usecase = PlanEventNotificationsUseCase { event: event.clone() };
        let summary = usecase.execute(&ctx).await.unwrap();
        assert_eq!(summary.planned, 1);
        assert!(ctx.repos.plans.find(&event.id, &user.id).await.is_some());
    }

    #[actix_web::test]
    async fn defers_visibility_with_a_delivery_delay() {
        let TestContext {
            mut ctx,
            account,
            sys,
        } = setup().await;
        ctx.config.delivery_delay_millis = 60_000;
        user_at(&ctx, &account.id, "near@vicinity.dev", 40.7218, -74.0060).await;

        // Rebuild the queue on the test clock so send_at controls visibility
        let settings = vicinity_infra::QueueSettings::from_config(&ctx.config);
        ctx.queue = Arc::new(vicinity_infra::InMemoryDeliveryQueue::new(
            sys.clone(),
            settings,
        ));

        let mut usecase = PlanEventNotificationsUseCase {
            event: event_at(&account.id, "Jazz in the park", 40.7128, -74.0060),
        };
        assert_eq!(usecase.execute(&ctx).await.unwrap().planned, 1);

        assert!(ctx.queue.dequeue(Duration::ZERO).await.unwrap().is_none());
        sys.advance(60_000);
        assert!(ctx.queue.dequeue(Duration::ZERO).await.unwrap().is_some());
    }
}
