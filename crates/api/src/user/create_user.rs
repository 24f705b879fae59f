use crate::shared::location::{PositionError, PositionInput};
use crate::shared::usecase::{execute, UseCase};
use crate::{error::VicinityError, shared::auth::protect_account_route};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::create_user::*;
use vicinity_domain::{DeliveryChannel, User, UserLocation, ID};
use vicinity_infra::VicinityContext;

pub async fn create_user_controller(
    http_req: HttpRequest,
    body: web::Json<RequestBody>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let body = body.0;
    let usecase = CreateUserUseCase {
        account_id: account.id,
        email: body.email,
        phone: body.phone,
        channel: body.channel.unwrap_or(DeliveryChannel::Email),
        position: PositionInput {
            lat: body.lat,
            lng: body.lng,
            address: body.address,
        },
    };

    execute(usecase, &ctx)
        .await
        .map(|usecase_res| HttpResponse::Created().json(APIResponse::new(usecase_res.user)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
pub struct CreateUserUseCase {
    pub account_id: ID,
    pub email: String,
    pub phone: Option<String>,
    pub channel: DeliveryChannel,
    pub position: PositionInput,
}

#[derive(Debug)]
pub struct UseCaseRes {
    pub user: User,
}

#[derive(Debug)]
pub enum UseCaseError {
    MissingPhoneForSmsChannel,
    Position(PositionError),
    StorageError,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::MissingPhoneForSmsChannel => Self::BadClientData(
                "A phone number is required when the sms channel is chosen".into(),
            ),
            UseCaseError::Position(e) => e.into(),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateUserUseCase {
    type Response = UseCaseRes;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateUser";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        if self.channel == DeliveryChannel::Sms && self.phone.is_none() {
            return Err(UseCaseError::MissingPhoneForSmsChannel);
        }

        // Resolve the position first so a bad one never leaves a user
        // without a geo index entry behind.
        let point = if self.position.provided() {
            Some(
                self.position
                    .resolve(ctx)
                    .await
                    .map_err(UseCaseError::Position)?,
            )
        } else {
            None
        };

        let mut user = User::new(self.account_id.clone(), self.email.clone());
        user.phone = self.phone.clone();
        user.channel = self.channel;
        user.address = self.position.address.clone();

        ctx.repos
            .users
            .insert(&user)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        if let Some(point) = point {
            let location = UserLocation {
                user_id: user.id.clone(),
                point,
                updated: ctx.sys.get_timestamp_millis(),
            };
            ctx.geo_index
                .upsert(location)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        }

        Ok(UseCaseRes { user })
    }
}
