use crate::error::VicinityError;
use crate::shared::auth::protect_account_route;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::info;
use vicinity_api_structs::update_event::{APIResponse, PathParams, RequestBody};
use vicinity_domain::{Event, ID};
use vicinity_infra::VicinityContext;

pub async fn update_event_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let body = body.0;
    let usecase = UpdateEventUseCase {
        account_id: account.id,
        event_id: path_params.event_id.clone(),
        title: body.title,
        description: body.description,
        starts_at: body.starts_at,
    };

    execute(usecase, &ctx)
        .await
        .map(|event| HttpResponse::Ok().json(APIResponse::new(event)))
        .map_err(VicinityError::from)
}

/// Modifies the mutable fields of an event. The location is not one of
/// them: moving an event would invalidate the proximity matches it was
/// planned from, a moved event should be a new event.
#[derive(Debug)]
pub struct UpdateEventUseCase {
    pub account_id: ID,
    pub event_id: ID,
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<i64>,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(event_id) => Self::NotFound(format!(
                "The event with id: {}, was not found.",
                event_id
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateEventUseCase {
    type Response = Event;

    type Error = UseCaseError;

    const NAME: &'static str = "UpdateEvent";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        let mut event = match ctx.repos.events.find(&self.event_id).await {
            Some(event) if event.account_id == self.account_id => event,
            _ => return Err(UseCaseError::NotFound(self.event_id.clone())),
        };

        let starts_at_changed = matches!(self.starts_at, Some(starts_at) if starts_at != event.starts_at);

        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(starts_at) = self.starts_at {
            event.starts_at = starts_at;
        }
        event.updated = ctx.sys.get_timestamp_millis();

        ctx.repos
            .events
            .save(&event)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        if starts_at_changed {
            // Planned messages carry the old start time and would mislead
            let cancelled = ctx
                .repos
                .plans
                .cancel_scheduled_by_event(&event.id)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            info!(
                "Cancelled {} scheduled notifications for event: {} after its start time changed",
                cancelled, event.id
            );
        }

        Ok(event)
    }
}
