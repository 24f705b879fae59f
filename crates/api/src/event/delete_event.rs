use super::subscribers::CleanupOnEventDeleted;
use crate::error::VicinityError;
use crate::shared::auth::protect_account_route;
use crate::shared::usecase::{execute, Subscriber, UseCase};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::delete_event::{APIResponse, PathParams};
use vicinity_domain::{Event, ID};
use vicinity_infra::VicinityContext;

pub async fn delete_event_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let usecase = DeleteEventUseCase {
        account_id: account.id,
        event_id: path_params.event_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|event| HttpResponse::Ok().json(APIResponse::new(event)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
pub struct DeleteEventUseCase {
    pub account_id: ID,
    pub event_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(event_id) => Self::NotFound(format!(
                "The event with id: {}, was not found.",
                event_id
            )),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for DeleteEventUseCase {
    type Response = Event;

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteEvent";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        match ctx.repos.events.find(&self.event_id).await {
            Some(event) if event.account_id == self.account_id => {
                ctx.repos.events.delete(&self.event_id).await;
                Ok(event)
            }
            _ => Err(UseCaseError::NotFound(self.event_id.clone())),
        }
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(CleanupOnEventDeleted)]
    }
}
