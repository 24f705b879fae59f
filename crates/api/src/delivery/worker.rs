use std::time::Duration;
use tracing::{debug, error, info, warn};
use vicinity_domain::{PlanEntryStatus, QueueEntry};
use vicinity_infra::{DeliveryLease, NackOutcome, NotifyError, VicinityContext};

/// What happened to one claimed queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The plan behind the entry was cancelled before the send, or the
    /// lease expired underneath us. Nothing was delivered by this claim.
    Skipped,
    Delivered,
    /// A retryable failure, the entry becomes visible again after backoff.
    Requeued,
    DeadLettered,
}

/// Claims queue entries and delivers them, forever. Every instance pulls
/// from the same queue, so more workers mean more parallel sends.
pub async fn run_delivery_worker(worker_id: usize, ctx: VicinityContext) {
    info!("Delivery worker: {} started", worker_id);
    let poll_interval =
        Duration::from_millis(ctx.config.queue_poll_interval_millis.max(1) as u64);
    loop {
        let lease = match ctx.queue.dequeue(poll_interval).await {
            Ok(Some(lease)) => lease,
            Ok(None) => continue,
            Err(e) => {
                error!("Delivery worker: {} could not dequeue. Error: {:?}", worker_id, e);
                actix_web::rt::time::sleep(poll_interval).await;
                continue;
            }
        };
        match process_delivery(&ctx, &lease).await {
            Ok(outcome) => debug!(
                "Delivery worker: {} finished entry: {} with outcome: {:?}",
                worker_id, lease.entry.id, outcome
            ),
            Err(e) => error!(
                "Delivery worker: {} could not process entry: {}. Error: {:?}",
                worker_id, lease.entry.id, e
            ),
        }
    }
}

/// Delivers one claimed entry. Errors are only returned when the queue
/// itself misbehaves, delivery failures are handled through the queue's
/// redelivery machinery.
pub async fn process_delivery(
    ctx: &VicinityContext,
    lease: &DeliveryLease,
) -> anyhow::Result<DeliveryOutcome> {
    let entry = &lease.entry;

    // Last look before the send. An entry whose plan was cancelled in the
    // meantime (event deleted, start time moved, user deleted) must not go
    // out.
    let cancelled = match ctx.repos.plans.find(&entry.event_id, &entry.user_id).await {
        Some(plan) => plan.status == PlanEntryStatus::Cancelled,
        // No plan row at all, treat it like a cancellation
        None => true,
    };
    if cancelled {
        ctx.queue.ack(lease).await?;
        return Ok(DeliveryOutcome::Skipped);
    }

    let timeout = Duration::from_millis(ctx.config.notifier_timeout_millis as u64);
    let send_result = match actix_web::rt::time::timeout(timeout, ctx.notifier.send(entry)).await {
        Ok(result) => result,
        Err(_) => Err(NotifyError {
            recipient: entry.recipient.clone(),
            reason: format!(
                "notifier did not answer within {}ms",
                ctx.config.notifier_timeout_millis
            ),
            retryable: true,
        }),
    };

    match send_result {
        Ok(()) => {
            ctx.queue.ack(lease).await?;
            set_plan_status(ctx, entry, PlanEntryStatus::Delivered).await;
            Ok(DeliveryOutcome::Delivered)
        }
        Err(e) if e.retryable => {
            warn!(
                "Delivery of entry: {} failed: {}. Handing it back to the queue.",
                entry.id, e
            );
            match ctx.queue.nack(lease).await? {
                NackOutcome::Requeued {
                    redeliveries,
                    next_visible_at,
                } => {
                    debug!(
                        "Entry: {} requeued with redeliveries: {}, next visible at: {}",
                        entry.id, redeliveries, next_visible_at
                    );
                    Ok(DeliveryOutcome::Requeued)
                }
                NackOutcome::DeadLettered => {
                    set_plan_status(ctx, entry, PlanEntryStatus::DeadLettered).await;
                    Ok(DeliveryOutcome::DeadLettered)
                }
                NackOutcome::Expired => Ok(DeliveryOutcome::Skipped),
            }
        }
        Err(e) => {
            error!("Delivery of entry: {} failed terminally: {}", entry.id, e);
            ctx.queue.dead_letter(lease, &e.reason).await?;
            set_plan_status(ctx, entry, PlanEntryStatus::DeadLettered).await;
            Ok(DeliveryOutcome::DeadLettered)
        }
    }
}

/// The message is already sent (or parked) at this point, a failed status
/// write must not push the entry back into delivery.
async fn set_plan_status(ctx: &VicinityContext, entry: &QueueEntry, status: PlanEntryStatus) {
    if let Err(e) = ctx
        .repos
        .plans
        .set_status(&entry.event_id, &entry.user_id, status)
        .await
    {
        warn!(
            "Unable to mark plan entry for event: {} and user: {} as {}. Error: {:?}",
            entry.event_id, entry.user_id, status, e
        );
    }
}
