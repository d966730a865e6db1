//! API Module
//!
//! Handler-per-file, assembled into one router under `/api/v1`. The
//! analyze route is wrapped by the per-IP rate limiter; everything else
//! is open (the public surface carries no auth, only the limiter).

pub mod analyze;
pub mod health;
pub mod ingest;
pub mod report;
pub mod settings;

use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::logic::Engine;
use crate::middleware::{rate_limit, RateLimitMap};
use crate::storage::Storage;

/// Shared application state
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<Engine>,
    pub storage: Arc<Storage>,
    pub limits: Arc<RateLimitMap>,
}

/// Create the main router with all routes
pub fn router(state: ApiState) -> Router {
    let limited = Router::new()
        .route("/api/v1/analyze", post(analyze::analyze_url))
        .layer(axum_middleware::from_fn_with_state(
            state.limits.clone(),
            rate_limit,
        ));

    let open = Router::new()
        .route("/api/v1/health", get(health::check))
        .route("/api/v1/whois/:domain", get(health::whois_domain))
        .route("/api/v1/report", post(report::report_url))
        .route("/api/v1/ingest", post(ingest::ingest_url))
        .route("/api/v1/settings", get(settings::get_settings))
        .route("/api/v1/settings/mode", post(settings::set_mode))
        .route("/api/v1/settings/status", get(settings::service_status));

    Router::new().merge(limited).merge(open).with_state(state)
}
