use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use inmo_search::config::Settings;
use inmo_search::routes::{
    self, handle_json_payload_error, handle_path_error, handle_query_payload_error, AppState,
};
use inmo_search::services::SearchService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Configuration error: {}", e))
    })?;

    // Initialize logging (RUST_LOG wins over the configured level)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    info!("Starting inmo-search service...");

    let search = Arc::new(SearchService::from_settings(&settings).await);

    info!(
        "Search service initialized (semantic fallback: {})",
        if search.orchestrator().semantic_enabled() { "on" } else { "off" }
    );

    let app_state = AppState { search };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
