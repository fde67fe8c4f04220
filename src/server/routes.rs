//! Route table of the control API

use crate::server::handlers;
use actix_web::web;

/// Registers every control route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/start", web::post().to(handlers::start))
        .route("/stop", web::post().to(handlers::stop))
        .route("/peek", web::get().to(handlers::peek))
        .route("/flush", web::post().to(handlers::flush))
        .route("/view", web::get().to(handlers::view))
        .route("/detail", web::get().to(handlers::detail))
        .route("/collection", web::get().to(handlers::collection))
        .route("/similar", web::get().to(handlers::similar))
        .route("/search", web::get().to(handlers::search));
}
