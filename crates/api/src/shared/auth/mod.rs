use crate::error::VicinityError;
use actix_web::HttpRequest;
use vicinity_domain::Account;
use vicinity_infra::VicinityContext;

fn get_api_key(http_req: &HttpRequest) -> Option<&str> {
    http_req.headers().get("x-api-key")?.to_str().ok()
}

/// Resolves the `Account` performing the request from the secret api key
/// in the `x-api-key` header.
pub async fn protect_account_route(
    http_req: &HttpRequest,
    ctx: &VicinityContext,
) -> Result<Account, VicinityError> {
    let api_key = match get_api_key(http_req) {
        Some(api_key) => api_key,
        None => {
            return Err(VicinityError::UnidentifiableClient(
                "Unable to find api-key in x-api-key header".into(),
            ))
        }
    };

    ctx.repos
        .accounts
        .find_by_apikey(api_key)
        .await
        .ok_or_else(|| VicinityError::Unauthorized("Malformed api key provided".into()))
}

#[cfg(test)]
mod test {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn rejects_requests_without_api_key() {
        let ctx = VicinityContext::create_inmemory();
        let req = TestRequest::default().to_http_request();
        assert!(protect_account_route(&req, &ctx).await.is_err());
    }

    #[actix_web::test]
    async fn rejects_unknown_api_key() {
        let ctx = VicinityContext::create_inmemory();
        let req = TestRequest::default()
            .insert_header(("x-api-key", "sk_not_a_real_key"))
            .to_http_request();
        assert!(protect_account_route(&req, &ctx).await.is_err());
    }

    #[actix_web::test]
    async fn resolves_account_from_api_key() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::new();
        ctx.repos.accounts.insert(&account).await.unwrap();

        let req = TestRequest::default()
            .insert_header(("x-api-key", account.secret_api_key.clone()))
            .to_http_request();
        let res = protect_account_route(&req, &ctx).await;
        assert!(res.is_ok());
        assert_eq!(res.unwrap().id, account.id);
    }
}
