#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::net::SocketAddr;

use actix_web::{App, HttpServer, web};
use tracing::info;

mod config;
mod error;
mod probe;
mod registry;
mod routes;

use config::Config;
use error::AppError;
use logger::init_tracing;
use probe::{ProbeSweeper, StatusCache};
use registry::Registry;

/// Shared state handed to every route.
pub struct AppState {
    pub registry: Registry,
    pub cache: StatusCache,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    init_tracing();

    let config = Config::from_config(env::var_os("CHAINWATCH_CONFIG"))?;
    info!("{config}");

    let registry = Registry::load(&config.probe.registry_path);
    let cache = StatusCache::new(
        ProbeSweeper::new(config.probe.request_timeout()),
        config.probe.cache_ttl(),
    );
    let state = web::Data::new(AppState { registry, cache });

    let addr: SocketAddr = format!("{}:{}", config.listen.bind, config.listen.port).parse()?;
    info!(%addr, "starting status server");
    run_server(addr, state).await
}

async fn run_server(addr: SocketAddr, state: web::Data<AppState>) -> Result<(), AppError> {
    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
