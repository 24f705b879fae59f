use crate::shared::usecase::{execute, UseCase};
use crate::{error::VicinityError, shared::auth::protect_account_route};
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::warn;
use vicinity_api_structs::delete_user::*;
use vicinity_domain::{Account, User, ID};
use vicinity_infra::VicinityContext;

pub async fn delete_user_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let usecase = DeleteUserUseCase {
        account,
        user_id: path_params.user_id.clone(),
    };
    execute(usecase, &ctx)
        .await
        .map(|usecase_res| HttpResponse::Ok().json(APIResponse::new(usecase_res.user)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
struct DeleteUserUseCase {
    account: Account,
    user_id: ID,
}

#[derive(Debug)]
struct UseCaseRes {
    pub user: User,
}

#[derive(Debug)]
enum UseCaseError {
    StorageError,
    UserNotFound,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
            UseCaseError::UserNotFound => Self::NotFound("The user was not found.".into()),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for DeleteUserUseCase {
    type Response = UseCaseRes;

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteUser";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        let user = match ctx.repos.users.find(&self.user_id).await {
            Some(u) if u.account_id == self.account.id => {
                match ctx.repos.users.delete(&self.user_id).await {
                    Some(u) => u,
                    None => return Err(UseCaseError::StorageError),
                }
            }
            _ => return Err(UseCaseError::UserNotFound),
        };

        // The user row is already gone, so cleanup failures only get logged.
        if let Err(e) = ctx.geo_index.remove(&user.id).await {
            warn!("Unable to remove deleted user: {} from the geo index: {:?}", user.id, e);
        }
        if let Err(e) = ctx.repos.plans.cancel_scheduled_by_user(&user.id).await {
            warn!(
                "Unable to cancel scheduled notifications for deleted user: {}: {:?}",
                user.id, e
            );
        }

        Ok(UseCaseRes { user })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use vicinity_domain::{DeliveryChannel, GeoPoint, PlanEntry, PlanEntryStatus, UserLocation};

    #[actix_web::test]
    async fn deletes_user_with_location_and_scheduled_plans() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();
        let user = User::new(account.id.clone(), "gal@vicinity.dev".into());
        ctx.repos.users.insert(&user).await.unwrap();
        ctx.geo_index
            .upsert(UserLocation {
                user_id: user.id.clone(),
                point: GeoPoint::new(40.7128, -74.0060).unwrap(),
                updated: 0,
            })
            .await
            .unwrap();
        let event_id = ID::default();
        ctx.repos
            .plans
            .insert_new(&[PlanEntry {
                event_id: event_id.clone(),
                user_id: user.id.clone(),
                account_id: account.id.clone(),
                channel: DeliveryChannel::Email,
                recipient: user.email.clone(),
                send_at: 0,
                status: PlanEntryStatus::Scheduled,
                created: 0,
            }])
            .await
            .unwrap();

        let mut usecase = DeleteUserUseCase {
            account,
            user_id: user.id.clone(),
        };
        usecase.execute(&ctx).await.expect("To delete user");

        assert!(ctx.repos.users.find(&user.id).await.is_none());
        assert!(ctx.geo_index.find(&user.id).await.unwrap().is_none());
        let plan = ctx.repos.plans.find(&event_id, &user.id).await.unwrap();
        assert_eq!(plan.status, PlanEntryStatus::Cancelled);
    }

    #[actix_web::test]
    async fn does_not_delete_user_of_another_account() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        let other_account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();
        ctx.repos.accounts.insert(&other_account).await.unwrap();
        let user = User::new(account.id.clone(), "gal@vicinity.dev".into());
        ctx.repos.users.insert(&user).await.unwrap();

        let mut usecase = DeleteUserUseCase {
            account: other_account,
            user_id: user.id.clone(),
        };
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::UserNotFound)
        ));
        assert!(ctx.repos.users.find(&user.id).await.is_some());
    }
}
