use super::subscribers::PlanNotificationsOnEventCreated;
use crate::error::VicinityError;
use crate::shared::auth::protect_account_route;
use crate::shared::location::{PositionError, PositionInput};
use crate::shared::usecase::{execute, Subscriber, UseCase};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::create_event::{APIResponse, RequestBody};
use vicinity_domain::{Account, Event, ID};
use vicinity_infra::VicinityContext;

pub async fn create_event_controller(
    http_req: HttpRequest,
    body: web::Json<RequestBody>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let body = body.0;
    let usecase = CreateEventUseCase {
        account,
        creator_id: body.creator_id,
        title: body.title,
        description: body.description.unwrap_or_default(),
        position: PositionInput {
            lat: body.lat,
            lng: body.lng,
            address: body.address,
        },
        starts_at: body.starts_at,
        category: body.category,
    };

    execute(usecase, &ctx)
        .await
        .map(|event| HttpResponse::Created().json(APIResponse::new(event)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
pub struct CreateEventUseCase {
    pub account: Account,
    pub creator_id: ID,
    pub title: String,
    pub description: String,
    pub position: PositionInput,
    pub starts_at: i64,
    pub category: String,
}

#[derive(Debug)]
pub enum UseCaseError {
    CreatorNotFound(ID),
    /// An event with the same title, start time and category already
    /// exists close by
    DuplicateEvent,
    Position(PositionError),
    StorageError,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::CreatorNotFound(user_id) => Self::NotFound(format!(
                "The user with id: {}, was not found.",
                user_id
            )),
            UseCaseError::DuplicateEvent => Self::Conflict(
                "An event with the same title, start time and category already exists nearby."
                    .into(),
            ),
            UseCaseError::Position(e) => e.into(),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateEventUseCase {
    type Response = Event;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateEvent";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        let creator = ctx
            .repos
            .users
            .find_by_account_id(&self.creator_id, &self.account.id)
            .await;
        if creator.is_none() {
            return Err(UseCaseError::CreatorNotFound(self.creator_id.clone()));
        }

        let location = self
            .position
            .resolve(ctx)
            .await
            .map_err(UseCaseError::Position)?;

        let now = ctx.sys.get_timestamp_millis();
        let event = Event {
            id: Default::default(),
            account_id: self.account.id.clone(),
            creator_id: self.creator_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            location,
            venue_address: self.position.address.clone(),
            starts_at: self.starts_at,
            category: self.category.clone(),
            created: now,
            updated: now,
        };

        let inserted = ctx
            .repos
            .events
            .try_insert(&event, ctx.config.duplicate_distance_meters)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if !inserted {
            return Err(UseCaseError::DuplicateEvent);
        }

        Ok(event)
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(PlanNotificationsOnEventCreated)]
    }
}
