//! GET /api/v1/health and the WHOIS inspection tool

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::ApiState;
use crate::constants::{APP_VERSION, NEW_DOMAIN_THRESHOLD_DAYS};

#[derive(Serialize)]
pub struct DatabaseStatus {
    pub available: bool,
    pub storage: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model_loaded: bool,
    pub database: DatabaseStatus,
    pub apis: serde_json::Value,
}

pub async fn check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: APP_VERSION,
        model_loaded: state.engine.model_status().loaded,
        database: DatabaseStatus {
            available: state.storage.is_database(),
            storage: state.storage.kind(),
        },
        apis: json!({
            "tranco": state.engine.tranco.enabled(),
            "virustotal": state.engine.virustotal.enabled(),
        }),
    })
}

/// GET /api/v1/whois/{domain} — domain age with a risk interpretation for
/// the mobile client.
pub async fn whois_domain(
    State(state): State<ApiState>,
    Path(domain): Path<String>,
) -> Json<serde_json::Value> {
    let domain = domain.to_lowercase();
    let verdict = state.engine.whois.lookup(&domain).await;

    let age_days = verdict.as_ref().and_then(|v| v.age_days);
    let (risk_indicator, interpretation) = match age_days {
        Some(age) if age < NEW_DOMAIN_THRESHOLD_DAYS => (
            "HIGH",
            "ALERTA: Dominio muy nuevo (< 30 dias). Alto riesgo de phishing.".to_string(),
        ),
        Some(age) if age < 90 => (
            "MEDIUM",
            "Dominio reciente (< 90 dias). Precaucion recomendada.".to_string(),
        ),
        Some(age) if age < 365 => ("LOW", "Dominio con antiguedad moderada.".to_string()),
        Some(age) => (
            "SAFE",
            format!("Dominio establecido ({:.1} años).", age as f64 / 365.0),
        ),
        None => (
            "UNKNOWN",
            "No se pudo determinar la antiguedad del dominio.".to_string(),
        ),
    };

    Json(json!({
        "domain": domain,
        "age_days": age_days,
        "is_new_domain": age_days.map(|a| a < NEW_DOMAIN_THRESHOLD_DAYS).unwrap_or(false),
        "registrar": verdict.as_ref().and_then(|v| v.registrar.clone()),
        "threshold_days": NEW_DOMAIN_THRESHOLD_DAYS,
        "risk_indicator": risk_indicator,
        "interpretation": interpretation,
    }))
}
