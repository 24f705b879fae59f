use super::set_account_webhook::SetAccountWebhookUseCase;
use crate::shared::usecase::execute;
use crate::{error::VicinityError, shared::auth::protect_account_route};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::delete_account_webhook::APIResponse;
use vicinity_infra::VicinityContext;

pub async fn delete_account_webhook_controller(
    http_req: HttpRequest,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    let usecase = SetAccountWebhookUseCase {
        account,
        webhook_url: None,
    };

    execute(usecase, &ctx)
        .await
        .map(|account| HttpResponse::Ok().json(APIResponse::new(account)))
        .map_err(VicinityError::from)
}
