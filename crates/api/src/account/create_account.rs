use crate::{
    error::VicinityError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use vicinity_api_structs::create_account::{APIResponse, RequestBody};
use vicinity_domain::Account;
use vicinity_infra::VicinityContext;

pub async fn create_account_controller(
    ctx: web::Data<VicinityContext>,
    body: web::Json<RequestBody>,
) -> Result<HttpResponse, VicinityError> {
    let usecase = CreateAccountUseCase { code: body.0.code };
    execute(usecase, &ctx)
        .await
        .map(|account| HttpResponse::Created().json(APIResponse::new(account)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
struct CreateAccountUseCase {
    code: String,
}

#[derive(Debug)]
enum UseCaseError {
    StorageError,
    InvalidCreateAccountCode,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidCreateAccountCode => {
                Self::Unauthorized("Invalid code provided".into())
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateAccountUseCase {
    type Response = Account;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateAccount";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        if self.code != ctx.config.create_account_secret_code {
            return Err(UseCaseError::InvalidCreateAccountCode);
        }
        let account = Account::new();
        let res = ctx.repos.accounts.insert(&account).await;

        res.map(|_| account).map_err(|_| UseCaseError::StorageError)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[actix_web::test]
    async fn rejects_invalid_create_account_code() {
        let ctx = VicinityContext::create_inmemory();
        let mut usecase = CreateAccountUseCase {
            code: format!("{}wrong", ctx.config.create_account_secret_code),
        };
        assert!(usecase.execute(&ctx).await.is_err());
    }

    #[actix_web::test]
    async fn creates_account_with_valid_code() {
        let ctx = VicinityContext::create_inmemory();
        let mut usecase = CreateAccountUseCase {
            code: ctx.config.create_account_secret_code.clone(),
        };
        let account = usecase.execute(&ctx).await.expect("To create account");
        let found = ctx
            .repos
            .accounts
            .find_by_apikey(&account.secret_api_key)
            .await;
        assert_eq!(found.map(|a| a.id), Some(account.id));
    }
}
