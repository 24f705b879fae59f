use crate::error::VicinityError;
use crate::shared::auth::protect_account_route;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::get_event_ratings::{APIResponse, PathParams};
use vicinity_domain::{Rating, RatingSummary, ID};
use vicinity_infra::VicinityContext;

pub async fn get_event_ratings_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let usecase = GetEventRatingsUseCase {
        account_id: account.id,
        event_id: path_params.event_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|(ratings, summary)| HttpResponse::Ok().json(APIResponse::new(ratings, summary)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
pub struct GetEventRatingsUseCase {
    pub account_id: ID,
    pub event_id: ID,
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
impl UseCase for GetEventRatingsUseCase {
    type Response = (Vec<Rating>, RatingSummary);

    type Error = UseCaseError;

    const NAME: &'static str = "GetEventRatings";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        match ctx.repos.events.find(&self.event_id).await {
            Some(event) if event.account_id == self.account_id => {}
            _ => return Err(UseCaseError::NotFound(self.event_id.clone())),
        }

        let ratings = ctx
            .repos
            .ratings
            .find_by_event(&self.event_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let scores = ratings.iter().map(|r| r.score).collect::<Vec<_>>();
        let summary = RatingSummary::new(&scores);

        Ok((ratings, summary))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use vicinity_domain::{Account, Event, GeoPoint};

    #[actix_web::test]
    async fn summarizes_event_ratings() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();
        let event = Event {
            id: Default::default(),
            account_id: account.id.clone(),
            creator_id: Default::default(),
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
        for score in [2, 5, 5] {
            ctx.repos
                .ratings
                .upsert(&Rating {
                    id: Default::default(),
                    account_id: account.id.clone(),
                    event_id: event.id.clone(),
                    user_id: Default::default(),
                    score,
                    comment: None,
                    created: 0,
                    updated: 0,
                })
                .await
                .unwrap();
        }

        let mut usecase = GetEventRatingsUseCase {
            account_id: account.id.clone(),
            event_id: event.id.clone(),
        };
        let (ratings, summary) = usecase.execute(&ctx).await.unwrap();

        assert_eq!(ratings.len(), 3);
        assert_eq!(summary.count, 3);
        assert!((summary.average - 4.0).abs() < f64::EPSILON);

        // Unknown events are a 404, not an empty list
        let mut usecase = GetEventRatingsUseCase {
            account_id: account.id,
            event_id: Default::default(),
        };
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::NotFound(_))
        ));
    }
}
