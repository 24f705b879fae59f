mod get_event_ratings;
mod rate_event;

use actix_web::web;
use get_event_ratings::get_event_ratings_controller;
use rate_event::rate_event_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/events/{event_id}/ratings",
        web::post().to(rate_event_controller),
    );
    cfg.route(
        "/events/{event_id}/ratings",
        web::get().to(get_event_ratings_controller),
    );
}
