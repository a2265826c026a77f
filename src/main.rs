use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use swipe_engine::config::{LoggingSettings, Settings, StoreBackend};
use swipe_engine::core::{FilterBuilder, Projector};
use swipe_engine::routes::{self, AppState, JwtVerifier};
use swipe_engine::services::{MemoryStore, PostgresStore};

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::other(format!("Configuration error: {}", e)));
        }
    };

    init_logging(&settings.logging);

    info!("Starting swipe engine...");

    let projector = settings
        .discovery
        .projection_concurrency
        .map(Projector::new)
        .unwrap_or_else(Projector::with_available_parallelism);
    let filters = FilterBuilder::new(settings.discovery.radius_policy());
    let jwt = JwtVerifier::new(&settings.auth.jwt_secret);

    info!(
        "Discovery: min radius {}m, default radius {}m, {} projection units",
        settings.discovery.min_radius,
        settings.discovery.default_radius,
        projector.concurrency()
    );

    let app_state = match settings.database.backend {
        StoreBackend::Postgres => {
            let db = &settings.database;
            let store = PostgresStore::from_settings(
                &db.url,
                db.max_connections,
                db.min_connections,
                db.acquire_timeout_secs,
                db.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::other(format!("PostgreSQL connection error: {}", e))
            })?;

            info!("PostgreSQL store initialized");
            AppState::new(Arc::new(store), filters, projector, jwt)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on shutdown");
            AppState::new(Arc::new(MemoryStore::new()), filters, projector, jwt)
        }
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .app_data(routes::query_config())
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
