//! Movie Scraper API Server
//!
//! Main entry point for the movie scraper REST API service.

use std::io;

use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use movie_scraper::config::Config;
use movie_scraper::routes::{configure_routes, ApiDoc, AppState};
use movie_scraper::scraper::build_fetcher;

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let bind_address = format!("{}:{}", config.host, config.port);

    let fetcher = build_fetcher(&config).map_err(io::Error::other)?;
    info!("Scraping {} ({:?} environment)", config.base_url, config.environment);

    let app_state = web::Data::new(AppState { config, fetcher });

    info!("Starting Movie Scraper API server on {}", bind_address);

    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
