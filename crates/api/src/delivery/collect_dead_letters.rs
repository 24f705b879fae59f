use crate::shared::usecase::UseCase;
use std::collections::HashMap;
use tracing::{error, warn};
use vicinity_domain::{Account, DeadLetter, PlanEntryStatus, ID};
use vicinity_infra::VicinityContext;

/// The dead letters of one account, ready to be pushed to its webhook.
#[derive(Debug)]
pub struct AccountDeadLetters {
    pub account: Account,
    pub dead_letters: Vec<DeadLetter>,
}

/// Drains the notifications that failed permanently, writes them to the
/// log, marks their plan entries and groups them per account for webhook
/// reporting.
///
/// Marking happens here and not only in the workers because the queue also
/// dead-letters on its own, when an entry exhausts its redeliveries
/// through expiring leases (a worker that crashed mid-send, for example).
#[derive(Debug)]
pub struct CollectDeadLettersUseCase;

#[derive(Debug)]
pub enum UseCaseError {
    QueueUnavailable,
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for CollectDeadLettersUseCase {
    type Response = Vec<AccountDeadLetters>;

    type Error = UseCaseError;

    const NAME: &'static str = "CollectDeadLetters";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        let dead_letters = ctx
            .queue
            .drain_dead_letters()
            .await
            .map_err(|_| UseCaseError::QueueUnavailable)?;
        if dead_letters.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_account: HashMap<ID, Vec<DeadLetter>> = HashMap::new();
        for dead_letter in dead_letters {
            let entry = &dead_letter.entry;
            error!(
                "Notification for event: {} to user: {} failed permanently after {} redeliveries: {}",
                entry.event_id, entry.user_id, dead_letter.redeliveries, dead_letter.reason
            );
            if let Err(e) = ctx
                .repos
                .plans
                .set_status(&entry.event_id, &entry.user_id, PlanEntryStatus::DeadLettered)
                .await
            {
                warn!(
                    "Unable to mark plan entry for event: {} and user: {} as dead lettered. Error: {:?}",
                    entry.event_id, entry.user_id, e
                );
            }
            by_account
                .entry(entry.account_id.clone())
                .or_default()
                .push(dead_letter);
        }

        let account_ids = by_account.keys().cloned().collect::<Vec<_>>();
        let accounts = ctx
            .repos
            .accounts
            .find_many(&account_ids)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut reports = Vec::with_capacity(accounts.len());
        for account in accounts {
            if let Some(dead_letters) = by_account.remove(&account.id) {
                reports.push(AccountDeadLetters {
                    account,
                    dead_letters,
                });
            }
        }
        for orphaned in by_account.keys() {
            warn!(
                "Dropping dead letters of account: {} which no longer exists",
                orphaned
            );
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use vicinity_domain::{DeliveryChannel, PlanEntry, QueueEntry};
    use vicinity_infra::{InMemoryDeliveryQueue, QueueSettings};

    struct TestSys(AtomicI64);

    impl TestSys {
        fn new(now: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(now)))
        }

        fn advance(&self, millis: i64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl vicinity_infra::ISys for TestSys {
        fn get_timestamp_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn entry_for(account_id: &ID, recipient: &str) -> QueueEntry {
        QueueEntry {
            id: Default::default(),
            account_id: account_id.clone(),
            event_id: Default::default(),
            user_id: Default::default(),
            channel: DeliveryChannel::Email,
            recipient: recipient.into(),
            subject: "Upcoming Event: Jazz night".into(),
            body: "Jazz night is happening near you".into(),
            idempotency_key: format!("jazz.{}.email", recipient),
            send_at: 0,
        }
    }

    async fn plan_for(ctx: &VicinityContext, entry: &QueueEntry) {
        ctx.repos
            .plans
            .insert_new(&[PlanEntry {
                event_id: entry.event_id.clone(),
                user_id: entry.user_id.clone(),
                account_id: entry.account_id.clone(),
                channel: entry.channel,
                recipient: entry.recipient.clone(),
                send_at: 0,
                status: PlanEntryStatus::Scheduled,
                created: 0,
            }])
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn groups_dead_letters_by_account_and_marks_plans() {
        let ctx = VicinityContext::create_inmemory();
        let account_a = Account::new();
        let account_b = Account::new();
        ctx.repos.accounts.insert(&account_a).await.unwrap();
        ctx.repos.accounts.insert(&account_b).await.unwrap();

        let entries = vec![
            entry_for(&account_a.id, "one@vicinity.dev"),
            entry_for(&account_a.id, "two@vicinity.dev"),
            entry_for(&account_b.id, "three@vicinity.dev"),
        ];
        for entry in &entries {
            plan_for(&ctx, entry).await;
        }
        ctx.queue.enqueue(&entries).await.unwrap();
        for _ in 0..entries.len() {
            let lease = ctx.queue.dequeue(Duration::ZERO).await.unwrap().unwrap();
            ctx.queue
                .dead_letter(&lease, "invalid recipient")
                .await
                .unwrap();
        }

        let mut reports = CollectDeadLettersUseCase.execute(&ctx).await.unwrap();
        reports.sort_by_key(|report| report.dead_letters.len());

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].account.id, account_b.id);
        assert_eq!(reports[0].dead_letters.len(), 1);
        assert_eq!(reports[1].account.id, account_a.id);
        assert_eq!(reports[1].dead_letters.len(), 2);

        for entry in &entries {
            let plan = ctx
                .repos
                .plans
                .find(&entry.event_id, &entry.user_id)
                .await
                .unwrap();
            assert_eq!(plan.status, PlanEntryStatus::DeadLettered);
        }
        // Drained exactly once
        assert!(CollectDeadLettersUseCase
            .execute(&ctx)
            .await
            .unwrap()
            .is_empty());
    }

    #[actix_web::test]
    async fn marks_plans_for_entries_dead_lettered_by_lease_expiry() {
        let mut ctx = VicinityContext::create_inmemory();
        let sys = TestSys::new(0);
        ctx.sys = sys.clone();
        ctx.queue = Arc::new(InMemoryDeliveryQueue::new(
            sys.clone(),
            QueueSettings {
                visibility_timeout_millis: 1_000,
                max_redeliveries: 0,
                retry_backoff_millis: 1_000,
                retry_backoff_max_millis: 60_000,
                poll_interval_millis: 1,
            },
        ));
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();
        let entry = entry_for(&account.id, "joe@vicinity.dev");
        plan_for(&ctx, &entry).await;
        ctx.queue.enqueue(&[entry.clone()]).await.unwrap();

        // Claim the entry and walk away, like a worker that died mid-send
        let _abandoned = ctx.queue.dequeue(Duration::ZERO).await.unwrap().unwrap();
        sys.advance(1_001);
        assert!(ctx.queue.dequeue(Duration::ZERO).await.unwrap().is_none());

        let reports = CollectDeadLettersUseCase.execute(&ctx).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].dead_letters.len(), 1);
        let plan = ctx
            .repos
            .plans
            .find(&entry.event_id, &entry.user_id)
            .await
            .unwrap();
        assert_eq!(plan.status, PlanEntryStatus::DeadLettered);
    }

    #[actix_web::test]
    async fn drops_dead_letters_of_deleted_accounts() {
        let ctx = VicinityContext::create_inmemory();
        let entry = entry_for(&ID::default(), "joe@vicinity.dev");
        ctx.queue.enqueue(&[entry]).await.unwrap();
        let lease = ctx.queue.dequeue(Duration::ZERO).await.unwrap().unwrap();
        ctx.queue
            .dead_letter(&lease, "invalid recipient")
            .await
            .unwrap();

        let reports = CollectDeadLettersUseCase.execute(&ctx).await.unwrap();
        assert!(reports.is_empty());
    }
}
