pub mod create_user;
mod delete_user;
mod get_user;
mod update_user_location;

use actix_web::web;
use create_user::create_user_controller;
use delete_user::delete_user_controller;
use get_user::get_user_controller;
use update_user_location::update_user_location_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/user", web::post().to(create_user_controller));
    cfg.route("/user/{user_id}", web::get().to(get_user_controller));
    cfg.route("/user/{user_id}", web::delete().to(delete_user_controller));
    cfg.route(
        "/user/{user_id}/location",
        web::put().to(update_user_location_controller),
    );
}
