use crate::error::VicinityError;
use crate::shared::auth::protect_account_route;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::rate_event::{APIResponse, PathParams, RequestBody};
use vicinity_domain::{Rating, ID};
use vicinity_infra::VicinityContext;

pub async fn rate_event_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let body = body.0;
    let usecase = RateEventUseCase {
        account_id: account.id,
        event_id: path_params.event_id.clone(),
        user_id: body.user_id,
        score: body.score,
        comment: body.comment,
    };

    execute(usecase, &ctx)
        .await
        .map(|rating| HttpResponse::Ok().json(APIResponse::new(rating)))
        .map_err(VicinityError::from)
}

/// Stores a user's score for an event. Rating the same event again
/// replaces the previous score instead of adding a second one.
#[derive(Debug)]
pub struct RateEventUseCase {
    pub account_id: ID,
    pub event_id: ID,
    pub user_id: ID,
    pub score: i64,
    pub comment: Option<String>,
}

#[derive(Debug)]
pub enum UseCaseError {
    EventNotFound(ID),
    UserNotFound(ID),
    ScoreOutOfRange { score: i64, min: i64, max: i64 },
    StorageError,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::EventNotFound(event_id) => Self::NotFound(format!(
                "The event with id: {}, was not found.",
                event_id
            )),
            UseCaseError::UserNotFound(user_id) => Self::NotFound(format!(
                "The user with id: {}, was not found.",
                user_id
            )),
            UseCaseError::ScoreOutOfRange { score, min, max } => Self::BadClientData(format!(
                "Invalid score: {}. The score must be between {} and {}.",
                score, min, max
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for RateEventUseCase {
    type Response = Rating;

    type Error = UseCaseError;

    const NAME: &'static str = "RateEvent";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        let (min, max) = (ctx.config.rating_scale_min, ctx.config.rating_scale_max);
        if self.score < min || self.score > max {
            return Err(UseCaseError::ScoreOutOfRange {
                score: self.score,
                min,
                max,
            });
        }

        match ctx.repos.events.find(&self.event_id).await {
            Some(event) if event.account_id == self.account_id => {}
            _ => return Err(UseCaseError::EventNotFound(self.event_id.clone())),
        }
        if ctx
            .repos
            .users
            .find_by_account_id(&self.user_id, &self.account_id)
            .await
            .is_none()
        {
            return Err(UseCaseError::UserNotFound(self.user_id.clone()));
        }

        let now = ctx.sys.get_timestamp_millis();
        let rating = Rating {
            id: Default::default(),
            account_id: self.account_id.clone(),
            event_id: self.event_id.clone(),
            user_id: self.user_id.clone(),
            score: self.score,
            comment: self.comment.clone(),
            created: now,
            updated: now,
        };

        ctx.repos
            .ratings
            .upsert(&rating)
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use vicinity_domain::{Account, Event, GeoPoint, User};

    struct TestContext {
        ctx: VicinityContext,
        account: Account,
        event: Event,
        user: User,
    }

    async fn setup() -> TestContext {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();
        let user = User::new(account.id.clone(), "joe@vicinity.dev".into());
        ctx.repos.users.insert(&user).await.unwrap();
        let event = Event {
            id: Default::default(),
            account_id: account.id.clone(),
            creator_id: user.id.clone(),
            title: "Jazz in the park".into(),
            description: "".into(),
            location: GeoPoint::new(40.7829, -73.9654).unwrap(),
            venue_address: None,
            starts_at: 1_735_732_800_000,
            category: "music".into(),
            created: 0,
            updated: 0,
        };
        assert!(ctx.repos.events.try_insert(&event, 50.0).await.unwrap());
        TestContext {
            ctx,
            account,
            event,
            user,
        }
    }

    fn usecase(t: &TestContext, score: i64) -> RateEventUseCase {
        RateEventUseCase {
            account_id: t.account.id.clone(),
            event_id: t.event.id.clone(),
            user_id: t.user.id.clone(),
            score,
            comment: None,
        }
    }

    #[actix_web::test]
    async fn rating_again_replaces_the_previous_score() {
        let t = setup().await;

        let first = usecase(&t, 2).execute(&t.ctx).await.unwrap();

        let mut second = usecase(&t, 5);
        second.comment = Some("Better than expected".into());
        let second = second.execute(&t.ctx).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.score, 5);
        let ratings = t.ctx.repos.ratings.find_by_event(&t.event.id).await.unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].comment, Some("Better than expected".into()));
    }

    #[actix_web::test]
    async fn rejects_scores_outside_the_scale() {
        let t = setup().await;

        for score in [0, 6, -3] {
            assert!(matches!(
                usecase(&t, score).execute(&t.ctx).await,
                Err(UseCaseError::ScoreOutOfRange { .. })
            ));
        }
        assert!(usecase(&t, 1).execute(&t.ctx).await.is_ok());
        assert!(usecase(&t, 5).execute(&t.ctx).await.is_ok());
    }

    #[actix_web::test]
    async fn rejects_unknown_event_and_unknown_user() {
        let t = setup().await;

        let mut unknown_event = usecase(&t, 4);
        unknown_event.event_id = Default::default();
        assert!(matches!(
            unknown_event.execute(&t.ctx).await,
            Err(UseCaseError::EventNotFound(_))
        ));

        let mut unknown_user = usecase(&t, 4);
        unknown_user.user_id = Default::default();
        assert!(matches!(
            unknown_user.execute(&t.ctx).await,
            Err(UseCaseError::UserNotFound(_))
        ));
    }
}
