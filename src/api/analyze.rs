//! POST /api/v1/analyze
//!
//! The public scoring entry point. Rate-limited upstream; a well-formed
//! URL always yields a verdict (or a 400 for blocked/malformed targets),
//! never a failure because an external collaborator is down.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::ApiState;
use crate::constants::{CRAWL_DEFAULT_MAX_REDIRECTS, CRAWL_DEFAULT_TIMEOUT_SECS};
use crate::error::AppResult;
use crate::logic::verdict::AnalyzeOptions;
use crate::logic::{ConnectionMode, ModelKind, Verdict};
use crate::models::AnalysisRecord;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
    #[serde(default)]
    pub mode: Option<ConnectionMode>,
    #[serde(default)]
    pub model: Option<ModelKind>,
    #[serde(default)]
    pub options: Option<AnalyzeBodyOptions>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeBodyOptions {
    #[serde(default)]
    pub enable_crawler: bool,
    pub timeout_seconds: Option<u64>,
    pub max_redirects: Option<u32>,
}

pub async fn analyze_url(
    State(state): State<ApiState>,
    Json(request): Json<AnalyzeRequest>,
) -> AppResult<Json<Verdict>> {
    let body_options = request.options.unwrap_or_default();
    let options = AnalyzeOptions {
        model: request.model.unwrap_or(ModelKind::Ml),
        mode: request.mode.unwrap_or(ConnectionMode::Auto),
        enable_crawler: body_options.enable_crawler,
        timeout_seconds: body_options
            .timeout_seconds
            .unwrap_or(CRAWL_DEFAULT_TIMEOUT_SECS)
            .clamp(1, 60),
        max_redirects: body_options
            .max_redirects
            .unwrap_or(CRAWL_DEFAULT_MAX_REDIRECTS)
            .min(10),
    };

    let mut verdict = state.engine.analyze(&request.url, &options).await?;

    // Record the analysis; history is best-effort and never blocks the
    // verdict.
    let record = AnalysisRecord::from_verdict(&verdict);
    match state.storage.save_analysis(&record).await {
        Ok(()) => verdict.apis_consulted.database = state.storage.is_database(),
        Err(e) => tracing::warn!("analysis record not persisted: {e}"),
    }

    tracing::info!(
        url = %verdict.normalized_url,
        score = verdict.score,
        level = %verdict.risk_level,
        "analysis complete"
    );

    Ok(Json(verdict))
}
