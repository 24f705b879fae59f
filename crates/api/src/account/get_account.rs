use crate::{error::VicinityError, shared::auth::protect_account_route};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::get_account::APIResponse;
use vicinity_infra::VicinityContext;

pub async fn get_account_controller(
    http_req: HttpRequest,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    Ok(HttpResponse::Ok().json(APIResponse::new(account)))
}
