use crate::shared::location::{PositionError, PositionInput};
use crate::shared::usecase::{execute, UseCase};
use crate::{error::VicinityError, shared::auth::protect_account_route};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::update_user_location::*;
use vicinity_domain::{UserLocation, ID};
use vicinity_infra::VicinityContext;

pub async fn update_user_location_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let body = body.0;
    let usecase = UpdateUserLocationUseCase {
        account_id: account.id,
        user_id: path_params.user_id.clone(),
        position: PositionInput {
            lat: body.lat,
            lng: body.lng,
            address: body.address,
        },
    };

    execute(usecase, &ctx)
        .await
        .map(|location| HttpResponse::Ok().json(APIResponse::new(location)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
pub struct UpdateUserLocationUseCase {
    pub account_id: ID,
    pub user_id: ID,
    pub position: PositionInput,
}

#[derive(Debug)]
pub enum UseCaseError {
    UserNotFound(ID),
    Position(PositionError),
    StorageError,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::UserNotFound(user_id) => {
                Self::NotFound(format!("A user with id: {}, was not found.", user_id))
            }
            UseCaseError::Position(e) => e.into(),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateUserLocationUseCase {
    type Response = UserLocation;

    type Error = UseCaseError;

    const NAME: &'static str = "UpdateUserLocation";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        if ctx
            .repos
            .users
            .find_by_account_id(&self.user_id, &self.account_id)
            .await
            .is_none()
        {
            return Err(UseCaseError::UserNotFound(self.user_id.clone()));
        }

        let point = self
            .position
            .resolve(ctx)
            .await
            .map_err(UseCaseError::Position)?;

        let location = UserLocation {
            user_id: self.user_id.clone(),
            point,
            updated: ctx.sys.get_timestamp_millis(),
        };
        ctx.geo_index
            .upsert(location.clone())
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(location)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use vicinity_domain::{Account, GeoPoint, User};

    #[actix_web::test]
    async fn moves_user_between_positions() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();
        let user = User::new(account.id.clone(), "gal@vicinity.dev".into());
        ctx.repos.users.insert(&user).await.unwrap();

        for (lat, lng) in [(40.7128, -74.0060), (40.7580, -73.9855)] {
            let mut usecase = UpdateUserLocationUseCase {
                account_id: account.id.clone(),
                user_id: user.id.clone(),
                position: PositionInput {
                    lat: Some(lat),
                    lng: Some(lng),
                    address: None,
                },
            };
            usecase.execute(&ctx).await.expect("To update location");
        }

        let location = ctx.geo_index.find(&user.id).await.unwrap().unwrap();
        assert_eq!(location.point, GeoPoint::new(40.7580, -73.9855).unwrap());
    }

    #[actix_web::test]
    async fn rejects_unknown_user_and_missing_position() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();

        let mut usecase = UpdateUserLocationUseCase {
            account_id: account.id.clone(),
            user_id: Default::default(),
            position: PositionInput {
                lat: Some(40.7128),
                lng: Some(-74.0060),
                address: None,
            },
        };
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::UserNotFound(_))
        ));

        let user = User::new(account.id.clone(), "gal@vicinity.dev".into());
        ctx.repos.users.insert(&user).await.unwrap();
        let mut usecase = UpdateUserLocationUseCase {
            account_id: account.id,
            user_id: user.id,
            position: PositionInput {
                lat: None,
                lng: None,
                address: None,
            },
        };
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::Position(PositionError::Missing))
        ));
    }
}
