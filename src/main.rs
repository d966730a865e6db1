//! ALERTA-LINK backend server
//!
//! Boot order: logging → config (fatal on missing secrets) → storage
//! (Postgres or JSONL fallback) → engine (model verified before load) →
//! router. SIGHUP reloads the model artifact in place.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alerta_link::api::{self, ApiState};
use alerta_link::config::Config;
use alerta_link::logic::Engine;
use alerta_link::middleware::RateLimitMap;
use alerta_link::storage::Storage;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alerta_link=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error, refusing to start: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "{} v{} starting",
        alerta_link::constants::APP_NAME,
        alerta_link::constants::APP_VERSION
    );

    let storage = Arc::new(
        Storage::init(&config.database_url, config.ingest_fallback_dir.clone()).await,
    );
    tracing::info!("storage backend: {}", storage.kind());

    let engine = Arc::new(Engine::boot(config.clone()));
    tracing::info!(
        "engine ready (model loaded: {}, weights: {} rules)",
        engine.model_status().loaded,
        engine.weights.len()
    );

    #[cfg(unix)]
    spawn_sighup_reload(engine.clone());

    let state = ApiState {
        engine,
        storage,
        limits: Arc::new(RateLimitMap::default()),
    };

    let app = api::router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind server port");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}

/// Explicit-origin CORS. An empty origin list keeps the default
/// (same-origin) policy; a wildcard is already rejected at config load.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// SIGHUP → atomic model artifact reload.
#[cfg(unix)]
fn spawn_sighup_reload(engine: Arc<Engine>) {
    tokio::spawn(async move {
        let mut hangup = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
        {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("SIGHUP handler unavailable: {e}");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            engine.reload_model();
        }
    });
}
