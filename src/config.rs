//! Configuration module
//!
//! Values load from environment variables (with `.env` support via dotenvy
//! in `main`). API keys have no defaults: an empty key disables the
//! corresponding external client. `SECRET_KEY` is mandatory outside debug.

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Debug mode (relaxes the SECRET_KEY requirement)
    pub debug: bool,

    /// Signing secret. Mandatory in production.
    pub secret_key: String,

    /// Database connection URL; empty means JSONL fallback storage
    pub database_url: String,

    /// Directory for JSONL fallback files
    pub ingest_fallback_dir: PathBuf,

    /// Allowed CORS origins (comma separated in env)
    pub cors_origins: Vec<String>,

    /// Tranco API credentials (empty key disables the client)
    pub tranco_api_key: String,
    pub tranco_api_email: String,

    /// Rank at or below which a domain counts as "in top-k"
    pub tranco_rank_threshold: u32,

    /// VirusTotal API key (empty disables the client)
    pub virustotal_api_key: String,

    /// Engines needed to call a VT verdict malicious
    pub virustotal_threshold: u32,

    /// Score window [min, max] in which VT is consulted
    pub virustotal_uncertainty_min: i32,
    pub virustotal_uncertainty_max: i32,

    /// ML model artifact path and its authorized SHA-256
    pub model_path: PathBuf,
    pub model_sha256: String,

    /// Calibrated heuristic weights artifact path
    pub weights_path: PathBuf,
}

/// Boot-time configuration failure. The process must not serve.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SECRET_KEY is not set (required outside debug mode)")]
    MissingSecretKey,

    #[error("CORS_ORIGINS contains a wildcard, which is forbidden")]
    WildcardCors,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let debug = env_bool("DEBUG", false);

        let secret_key = env::var("SECRET_KEY").unwrap_or_default();
        if secret_key.is_empty() && !debug {
            return Err(ConfigError::MissingSecretKey);
        }

        let cors_raw = env::var("CORS_ORIGINS").unwrap_or_default();
        let cors_origins: Vec<String> = cors_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if cors_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::WildcardCors);
        }

        Ok(Self {
            port: env_parse("PORT", 8080),
            debug,
            secret_key,
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
            ingest_fallback_dir: env::var("INGEST_FALLBACK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("datasets/ingested")),
            cors_origins,
            tranco_api_key: env::var("TRANCO_API_KEY").unwrap_or_default(),
            tranco_api_email: env::var("TRANCO_API_EMAIL").unwrap_or_default(),
            tranco_rank_threshold: env_parse("TRANCO_RANK_THRESHOLD", 100_000),
            virustotal_api_key: env::var("VIRUSTOTAL_API_KEY").unwrap_or_default(),
            virustotal_threshold: env_parse("VIRUSTOTAL_THRESHOLD", 3),
            virustotal_uncertainty_min: env_parse("VIRUSTOTAL_UNCERTAINTY_MIN", 30),
            virustotal_uncertainty_max: env_parse("VIRUSTOTAL_UNCERTAINTY_MAX", 70),
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/url_classifier.onnx")),
            model_sha256: env::var("MODEL_SHA256").unwrap_or_default(),
            weights_path: env::var("WEIGHTS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/heuristic_weights.json")),
        })
    }

    /// Tranco client is usable only with credentials configured.
    pub fn tranco_enabled(&self) -> bool {
        !self.tranco_api_key.is_empty()
    }

    /// VirusTotal client is usable only with a key configured.
    pub fn virustotal_enabled(&self) -> bool {
        !self.virustotal_api_key.is_empty()
    }
}

impl Default for Config {
    /// Test configuration: debug mode, external clients disabled,
    /// everything else on engine defaults.
    fn default() -> Self {
        Self {
            port: 8080,
            debug: true,
            secret_key: String::new(),
            database_url: String::new(),
            ingest_fallback_dir: PathBuf::from("datasets/ingested"),
            cors_origins: Vec::new(),
            tranco_api_key: String::new(),
            tranco_api_email: String::new(),
            tranco_rank_threshold: 100_000,
            virustotal_api_key: String::new(),
            virustotal_threshold: 3,
            virustotal_uncertainty_min: 30,
            virustotal_uncertainty_max: 70,
            model_path: PathBuf::from("models/url_classifier.onnx"),
            model_sha256: String::new(),
            weights_path: PathBuf::from("models/heuristic_weights.json"),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
