//! Settings endpoints — connection mode and service availability

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ApiState;
use crate::constants::{APP_NAME, APP_VERSION};
use crate::logic::ConnectionMode;

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub enabled: bool,
    pub configured: bool,
    pub message: &'static str,
}

fn service_entry(enabled: bool) -> ServiceStatus {
    ServiceStatus {
        enabled,
        configured: enabled,
        message: if enabled { "OK" } else { "API key no configurada" },
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub app_name: &'static str,
    pub app_version: &'static str,
    pub connection_mode: ConnectionMode,
    pub model_loaded: bool,
    pub services: serde_json::Value,
}

pub async fn get_settings(State(state): State<ApiState>) -> Json<SettingsResponse> {
    let tranco = service_entry(state.engine.tranco.enabled());
    let virustotal = service_entry(state.engine.virustotal.enabled());

    Json(SettingsResponse {
        app_name: APP_NAME,
        app_version: APP_VERSION,
        connection_mode: state.engine.mode(),
        model_loaded: state.engine.model_status().loaded,
        services: json!({
            "tranco": tranco,
            "virustotal": virustotal,
        }),
    })
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: ConnectionMode,
}

#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub previous_mode: ConnectionMode,
    pub current_mode: ConnectionMode,
    pub message: &'static str,
}

pub async fn set_mode(
    State(state): State<ApiState>,
    Json(request): Json<ModeRequest>,
) -> Json<ModeResponse> {
    let previous = state.engine.set_mode(request.mode);

    let message = match request.mode {
        ConnectionMode::Offline => "Modo offline activado. Solo se usara analisis local.",
        ConnectionMode::Online => "Modo online activado. Se usaran APIs externas.",
        ConnectionMode::Auto => "Modo automatico activado. Se detectara la conexion.",
    };
    tracing::info!("connection mode changed: {:?} -> {:?}", previous, request.mode);

    Json(ModeResponse {
        previous_mode: previous,
        current_mode: request.mode,
        message,
    })
}

/// Connectivity snapshot for the mobile client's indicator.
pub async fn service_status(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let tranco = state.engine.tranco.enabled();
    let virustotal = state.engine.virustotal.enabled();

    Json(json!({
        "online": tranco || virustotal,
        "services": {
            "tranco": { "available": tranco },
            "virustotal": { "available": virustotal },
            "database": { "available": state.storage.is_database() },
        }
    }))
}
