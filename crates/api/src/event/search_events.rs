use crate::error::VicinityError;
use crate::shared::auth::protect_account_route;
use crate::shared::location::{PositionError, PositionInput};
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::search_events::{APIResponse, QueryParams};
use vicinity_domain::{Event, ID};
use vicinity_infra::{EventSearchQuery, NearFilter, VicinityContext};

/// Page size used when the client does not pass one
const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

pub async fn search_events_controller(
    http_req: HttpRequest,
    query_params: web::Query<QueryParams>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let query = query_params.0;
    let usecase = SearchEventsUseCase {
        account_id: account.id,
        category: query.category,
        position: PositionInput {
            lat: query.lat,
            lng: query.lng,
            address: query.address,
        },
        radius: query.radius,
        from: query.from,
        to: query.to,
        page: query.page,
        limit: query.limit,
    };

    execute(usecase, &ctx)
        .await
        .map(|events| HttpResponse::Ok().json(APIResponse::new(events)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
pub struct SearchEventsUseCase {
    pub account_id: ID,
    pub category: Option<String>,
    pub position: PositionInput,
    pub radius: Option<f64>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug)]
pub enum UseCaseError {
    InvalidRadius(f64),
    Position(PositionError),
    StorageError,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidRadius(radius) => Self::BadClientData(format!(
                "Invalid radius: {}. The radius must be a positive number of meters.",
                radius
            )),
            UseCaseError::Position(e) => e.into(),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for SearchEventsUseCase {
    type Response = Vec<Event>;

    type Error = UseCaseError;

    const NAME: &'static str = "SearchEvents";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        if let Some(radius) = self.radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(UseCaseError::InvalidRadius(radius));
            }
        }

        let near = if self.position.provided() {
            let center = self
                .position
                .resolve(ctx)
                .await
                .map_err(UseCaseError::Position)?;
            Some(NearFilter {
                center,
                radius_meters: self.radius.unwrap_or(ctx.config.search_radius_meters),
            })
        } else {
            // A radius without any position is meaningless and ignored
            None
        };

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let page = self.page.unwrap_or(1).max(1);

        let query = EventSearchQuery {
            account_id: self.account_id.clone(),
            category: self.category.clone(),
            near,
            from: self.from,
            to: self.to,
            skip: (page - 1) * limit,
            limit,
        };

        ctx.repos
            .events
            .search(query)
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use vicinity_domain::{Account, GeoPoint};

    async fn seed_events(ctx: &VicinityContext, account_id: &ID) {
        let seeds = [
            ("Jazz in the park", "music", 40.7829, -73.9654, 100),
            ("Rooftop concert", "music", 40.7580, -73.9855, 200),
            ("City marathon", "sports", 40.7128, -74.0060, 300),
            ("Fjord festival", "music", 59.9139, 10.7522, 400),
        ];
        for (title, category, lat, lng, starts_at) in seeds {
            let event = Event {
                id: Default::default(),
                account_id: account_id.clone(),
                creator_id: Default::default(),
                title: title.into(),
                description: "".into(),
                location: GeoPoint::new(lat, lng).unwrap(),
                venue_address: None,
                starts_at,
                category: category.into(),
                created: 0,
                updated: 0,
            };
            assert!(ctx.repos.events.try_insert(&event, 50.0).await.unwrap());
        }
    }

    async fn setup() -> (VicinityContext, Account) {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();
        seed_events(&ctx, &account.id).await;
        (ctx, account)
    }

    fn query(account_id: &ID) -> SearchEventsUseCase {
        SearchEventsUseCase {
            account_id: account_id.clone(),
            category: None,
            position: PositionInput {
                lat: None,
                lng: None,
                address: None,
            },
            radius: None,
            from: None,
            to: None,
            page: None,
            limit: None,
        }
    }

    fn titles(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.title.as_str()).collect()
    }

    #[actix_web::test]
    async fn filters_by_category_case_insensitively() {
        let (ctx, account) = setup().await;

        let mut usecase = query(&account.id);
        usecase.category = Some("MUSIC".into());
        let events = usecase.execute(&ctx).await.unwrap();

        assert_eq!(
            titles(&events),
            vec!["Jazz in the park", "Rooftop concert", "Fjord festival"]
        );
    }

    #[actix_web::test]
    async fn filters_by_position_with_the_default_radius() {
        let (ctx, account) = setup().await;

        // Lower Manhattan. The park is about 6.5 km away and Oslo is on
        // another continent, both outside the 5 km default.
        let mut usecase = query(&account.id);
        usecase.position.lat = Some(40.7250);
        usecase.position.lng = Some(-74.0000);
        let events = usecase.execute(&ctx).await.unwrap();

        assert_eq!(titles(&events), vec!["Rooftop concert", "City marathon"]);
    }

    #[actix_web::test]
    async fn narrows_results_with_an_explicit_radius() {
        let (ctx, account) = setup().await;

        let mut usecase = query(&account.id);
        usecase.position.lat = Some(40.7580);
        usecase.position.lng = Some(-73.9855);
        usecase.radius = Some(1_000.0);
        let events = usecase.execute(&ctx).await.unwrap();

        assert_eq!(titles(&events), vec!["Rooftop concert"]);
    }

    #[actix_web::test]
    async fn bounds_by_start_time_and_paginates() {
        let (ctx, account) = setup().await;

        let mut usecase = query(&account.id);
        usecase.from = Some(200);
        usecase.to = Some(400);
        usecase.limit = Some(2);
        let first_page = usecase.execute(&ctx).await.unwrap();
        assert_eq!(titles(&first_page), vec!["Rooftop concert", "City marathon"]);

        let mut usecase = query(&account.id);
        usecase.from = Some(200);
        usecase.to = Some(400);
        usecase.limit = Some(2);
        usecase.page = Some(2);
        let second_page = usecase.execute(&ctx).await.unwrap();
        assert_eq!(titles(&second_page), vec!["Fjord festival"]);
    }

    #[actix_web::test]
    async fn rejects_invalid_radius() {
        let (ctx, account) = setup().await;

        let mut usecase = query(&account.id);
        usecase.position.lat = Some(40.0);
        usecase.position.lng = Some(-73.0);
        usecase.radius = Some(-5.0);
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::InvalidRadius(_))
        ));
    }

    #[actix_web::test]
    async fn rejects_unknown_search_address() {
        let (ctx, account) = setup().await;

        let mut usecase = query(&account.id);
        usecase.position.address = Some("Atlantis".into());
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::Position(PositionError::AddressNotFound(_)))
        ));
    }
}
