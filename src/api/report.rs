//! POST /api/v1/report — user-submitted suspicious URLs

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiState;
use crate::error::{AppError, AppResult};
use crate::logic::safety;
use crate::models::{ReportLabel, UrlReport};

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub url: String,
    pub label: ReportLabel,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub status: &'static str,
    pub report_id: Uuid,
    pub message: String,
}

pub async fn report_url(
    State(state): State<ApiState>,
    Json(request): Json<ReportRequest>,
) -> AppResult<Json<ReportResponse>> {
    // Reported URLs pass the same gate as analyzed ones: no SSRF targets
    // in the dataset.
    let ctx = safety::validate_and_normalize(&request.url).await?;

    let report = UrlReport::new(
        &request.url,
        &ctx.normalized,
        request.label,
        request.comment,
        request.contact,
    );

    state
        .storage
        .save_report(&report)
        .await
        .map_err(|e| AppError::InternalError(format!("no se pudo guardar el reporte: {e}")))?;

    tracing::info!(
        url = %ctx.normalized,
        label = report.label.as_str(),
        "user report received"
    );

    Ok(Json(ReportResponse {
        status: "received",
        report_id: report.id,
        message: format!("Gracias. Tu reporte fue registrado ({}).", state.storage.kind()),
    }))
}
