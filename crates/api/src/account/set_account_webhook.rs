use crate::shared::usecase::{execute, UseCase};
use crate::{error::VicinityError, shared::auth::protect_account_route};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::set_account_webhook::{APIResponse, RequestBody};
use vicinity_domain::Account;
use vicinity_infra::VicinityContext;

pub async fn set_account_webhook_controller(
    http_req: HttpRequest,
    ctx: web::Data<VicinityContext>,
    body: web::Json<RequestBody>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let usecase = SetAccountWebhookUseCase {
        account,
        webhook_url: Some(body.webhook_url.clone()),
    };

    execute(usecase, &ctx)
        .await
        .map(|account| HttpResponse::Ok().json(APIResponse::new(account)))
        .map_err(VicinityError::from)
}

#[derive(Debug)]
pub struct SetAccountWebhookUseCase {
    pub account: Account,
    pub webhook_url: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    InvalidURI(String),
    StorageError,
}

impl From<UseCaseError> for VicinityError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidURI(err) => {
                Self::BadClientData(format!("Invalid URI provided. Error message: {}", err))
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for SetAccountWebhookUseCase {
    type Response = Account;

    type Error = UseCaseError;

    const NAME: &'static str = "SetAccountWebhook";

    async fn execute(&mut self, ctx: &VicinityContext) -> Result<Self::Response, Self::Error> {
        let success = self
            .account
            .settings
            .set_webhook_url(self.webhook_url.clone());

        if !success {
            return Err(UseCaseError::InvalidURI(format!(
                "Malformed url or unsupported scheme: {:?}",
                self.webhook_url
            )));
        }

        match ctx.repos.accounts.save(&self.account).await {
            Ok(_) => Ok(self.account.clone()),
            Err(_) => Err(UseCaseError::StorageError),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[actix_web::test]
    async fn it_rejects_invalid_webhook_url() {
        let ctx = VicinityContext::create_inmemory();
        let bad_uris = vec!["1", "", "test.zzcom", "test.com", "google.com"];
        for bad_uri in bad_uris {
            let mut usecase = SetAccountWebhookUseCase {
                webhook_url: Some(bad_uri.to_string()),
                account: Default::default(),
            };
            let res = usecase.execute(&ctx).await;
            assert!(res.is_err());
            if let Err(err) = res {
                assert_eq!(
                    err,
                    UseCaseError::InvalidURI(format!(
                        "Malformed url or unsupported scheme: {:?}",
                        Some(bad_uri)
                    ))
                );
            }
        }
    }

    #[actix_web::test]
    async fn it_accepts_valid_webhook_url() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();

        let valid_uris = vec!["https://google.com", "https://google.com/v1/webhook"];
        for valid_uri in valid_uris {
            let mut usecase = SetAccountWebhookUseCase {
                webhook_url: Some(valid_uri.to_string()),
                account: account.clone(),
            };
            let res = usecase.execute(&ctx).await;
            assert!(res.is_ok());
        }

        let saved = ctx.repos.accounts.find(&account.id).await.unwrap();
        assert_eq!(
            saved.settings.webhook.map(|w| w.url),
            Some("https://google.com/v1/webhook".to_string())
        );
    }
}
