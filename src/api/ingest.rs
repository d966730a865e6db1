//! POST /api/v1/ingest — dataset ingestion for future training

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiState;
use crate::error::{AppError, AppResult};
use crate::logic::safety;
use crate::models::IngestedUrl;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub url: String,
    /// 0 = legitimate, 1 = malicious
    #[serde(default)]
    pub label: Option<i16>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub id: Uuid,
    pub stored: bool,
    pub url_hash: String,
    pub message: String,
}

pub async fn ingest_url(
    State(state): State<ApiState>,
    Json(request): Json<IngestRequest>,
) -> AppResult<Json<IngestResponse>> {
    if let Some(label) = request.label {
        if label != 0 && label != 1 {
            return Err(AppError::ValidationError(
                "label debe ser 0 (legitimo) o 1 (malicioso)".into(),
            ));
        }
    }

    let ctx = safety::validate_and_normalize(&request.url).await?;

    let record = IngestedUrl::new(
        &request.url,
        &ctx.normalized,
        request.label,
        request.source.as_deref().unwrap_or("api"),
        request.metadata.unwrap_or_else(|| serde_json::json!({})),
    );

    state
        .storage
        .save_ingested(&record)
        .await
        .map_err(|e| AppError::InternalError(format!("no se pudo guardar la URL: {e}")))?;

    Ok(Json(IngestResponse {
        status: "received",
        id: record.id,
        stored: true,
        url_hash: format!("{}...", &record.url_hash[..16]),
        message: format!("URL ingestada exitosamente ({})", state.storage.kind()),
    }))
}
