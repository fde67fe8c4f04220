//! HTTP control API
//!
//! A thin actix-web layer over [`Controller`]: handlers parse query
//! parameters, call the controller and render snapshots as JSON.

mod handlers;
mod routes;

pub use routes::configure;

use crate::config::ServerConfig;
use crate::control::Controller;
use actix_web::{web, App, HttpServer};

/// Serves the control API until the server is stopped (Ctrl-C)
pub async fn run_server(config: &ServerConfig, controller: Controller) -> std::io::Result<()> {
    let data = web::Data::new(controller);

    tracing::info!("Control API listening on {}:{}", config.host, config.port);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}
