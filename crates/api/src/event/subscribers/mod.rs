use super::create_event::CreateEventUseCase;
use super::delete_event::DeleteEventUseCase;
use super::plan_notifications::{PlanEventNotificationsUseCase, UseCaseError as PlanError};
use crate::shared::retry::backoff_delay;
use crate::shared::usecase::{execute, Subscriber};
use tracing::{error, info};
use vicinity_domain::Event;
use vicinity_infra::VicinityContext;

/// Planning retries back off for seconds at most. Anything longer and the
/// notifications would start arriving noticeably late.
const PLAN_RETRY_MAX_BACKOFF_MILLIS: i64 = 10_000;

/// Plans the proximity notifications for a freshly created event. When the
/// geo index or the queue is down the planning run is retried in the
/// background with backoff, the event creation itself already succeeded.
pub struct PlanNotificationsOnEventCreated;

#[async_trait::async_trait(?Send)]
impl Subscriber<CreateEventUseCase> for PlanNotificationsOnEventCreated {
    async fn notify(&self, e: &Event, ctx: &VicinityContext) {
        let usecase = PlanEventNotificationsUseCase { event: e.clone() };
        if let Err(PlanError::PlanningUnavailable(_)) = execute(usecase, ctx).await {
            retry_planning_in_background(e.clone(), ctx.clone());
        }
    }
}

fn retry_planning_in_background(event: Event, ctx: VicinityContext) {
    actix_web::rt::spawn(async move {
        let attempts = ctx.config.plan_retry_attempts;
        for attempt in 1..=attempts {
            actix_web::rt::time::sleep(backoff_delay(
                ctx.config.plan_retry_backoff_millis,
                attempt,
                PLAN_RETRY_MAX_BACKOFF_MILLIS,
            ))
            .await;

            let usecase = PlanEventNotificationsUseCase {
                event: event.clone(),
            };
            match execute(usecase, &ctx).await {
                Ok(_) => {
                    info!(
                        "Planning notifications for event: {} succeeded on retry attempt: {}",
                        event.id, attempt
                    );
                    return;
                }
                Err(e) if attempt == attempts => {
                    error!(
                        "Giving up on planning notifications for event: {} after {} attempts. Last error: {:?}",
                        event.id,
                        attempts + 1,
                        e
                    );
                }
                Err(_) => {}
            }
        }
    });
}

/// Scheduled notifications and ratings make no sense for an event that no
/// longer exists.
pub struct CleanupOnEventDeleted;

#[async_trait::async_trait(?Send)]
impl Subscriber<DeleteEventUseCase> for CleanupOnEventDeleted {
    async fn notify(&self, e: &Event, ctx: &VicinityContext) {
        match ctx.repos.plans.cancel_scheduled_by_event(&e.id).await {
            Ok(cancelled) if cancelled > 0 => info!(
                "Cancelled {} scheduled notifications for deleted event: {}",
                cancelled, e.id
            ),
            Ok(_) => {}
            Err(err) => error!(
                "Unable to cancel scheduled notifications for deleted event: {}. Error: {:?}",
                e.id, err
            ),
        }
        if let Err(err) = ctx.repos.ratings.delete_by_event(&e.id).await {
            error!(
                "Unable to delete ratings for deleted event: {}. Error: {:?}",
                e.id, err
            );
        }
    }
}
