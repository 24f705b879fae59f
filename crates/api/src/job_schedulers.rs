use crate::delivery::collect_dead_letters::CollectDeadLettersUseCase;
use crate::delivery::worker::run_delivery_worker;
use crate::shared::usecase::execute;
use std::time::Duration;
use tracing::{error, info};
use vicinity_api_structs::report_dead_letters::WebhookPayload;
use vicinity_infra::VicinityContext;

/// Spawns the pool of queue consumers that send the planned notifications.
pub fn start_delivery_workers(ctx: &VicinityContext) {
    for worker_id in 0..ctx.config.delivery_workers {
        actix_web::rt::spawn(run_delivery_worker(worker_id, ctx.clone()));
    }
}

/// Periodically drains the notifications that failed permanently and
/// pushes them to the webhook of the account they belong to.
pub fn start_dead_letter_report_job(ctx: VicinityContext) {
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_millis(
            ctx.config.dead_letter_report_interval_millis as u64,
        ));
        loop {
            interval.tick().await;
            report_dead_letters(&ctx).await;
        }
    });
}

async fn report_dead_letters(ctx: &VicinityContext) {
    let reports = match execute(CollectDeadLettersUseCase, ctx).await {
        Ok(reports) => reports,
        Err(_) => return,
    };
    if reports.is_empty() {
        return;
    }

    let client = awc::Client::new();
    for report in reports {
        let webhook = match &report.account.settings.webhook {
            Some(webhook) => webhook,
            None => {
                info!(
                    "Account: {} has {} dead letters and no webhook to report them to",
                    report.account.id,
                    report.dead_letters.len()
                );
                continue;
            }
        };
        if let Err(e) = client
            .post(&webhook.url)
            .insert_header(("vicinity-webhook-key", webhook.key.as_str()))
            .send_json(&WebhookPayload::new(&report.dead_letters))
            .await
        {
            error!(
                "Unable to report {} dead letters to the webhook of account: {}. Error: {:?}",
                report.dead_letters.len(),
                report.account.id,
                e
            );
        }
    }
}
