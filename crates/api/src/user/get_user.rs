use crate::{error::VicinityError, shared::auth::protect_account_route};
use actix_web::{web, HttpRequest, HttpResponse};
use vicinity_api_structs::get_user::*;
use vicinity_infra::VicinityContext;

pub async fn get_user_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    ctx: web::Data<VicinityContext>,
) -> Result<HttpResponse, VicinityError> {
    let account = protect_account_route(&http_req, &ctx).await?;

    match ctx
        .repos
        .users
        .find_by_account_id(&path_params.user_id, &account.id)
        .await
    {
        Some(user) => Ok(HttpResponse::Ok().json(APIResponse::new(user))),
        None => Err(VicinityError::NotFound(format!(
            "A user with id: {}, was not found.",
            path_params.user_id
        ))),
    }
}
