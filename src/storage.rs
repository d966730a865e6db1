//! Storage — PostgreSQL with JSONL fallback
//!
//! The engine's collaborator contract only asks for append-like writes of
//! three record kinds. When `DATABASE_URL` is configured and reachable
//! they land in Postgres; otherwise each kind appends to its own JSONL
//! file. Selection is transparent to callers.

use std::io::Write;
use std::path::PathBuf;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{AnalysisRecord, IngestedUrl, UrlReport};

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS ingested_urls (
    id UUID PRIMARY KEY,
    url TEXT NOT NULL,
    url_normalized TEXT NOT NULL,
    url_hash VARCHAR(64) NOT NULL,
    label SMALLINT,
    source VARCHAR(50) NOT NULL,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS reports (
    id UUID PRIMARY KEY,
    url TEXT NOT NULL,
    url_normalized TEXT NOT NULL,
    url_hash VARCHAR(64) NOT NULL,
    label VARCHAR(20) NOT NULL,
    comment TEXT,
    contact TEXT,
    source VARCHAR(50) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS analysis_results (
    id UUID PRIMARY KEY,
    url_normalized TEXT NOT NULL,
    url_hash VARCHAR(64) NOT NULL,
    score INT NOT NULL,
    risk_level VARCHAR(10) NOT NULL,
    signals JSONB,
    ml_score INT,
    heuristic_score INT NOT NULL,
    tranco_verified BOOLEAN NOT NULL DEFAULT FALSE,
    virustotal_checked BOOLEAN NOT NULL DEFAULT FALSE,
    mode_used VARCHAR(10) NOT NULL,
    duration_ms BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_ingested_hash ON ingested_urls(url_hash);
CREATE INDEX IF NOT EXISTS idx_reports_hash ON reports(url_hash);
CREATE INDEX IF NOT EXISTS idx_analysis_hash ON analysis_results(url_hash);
CREATE INDEX IF NOT EXISTS idx_analysis_created ON analysis_results(created_at);
"#;

// ============================================================================
// STORAGE
// ============================================================================

enum Backend {
    Postgres(PgPool),
    Jsonl(PathBuf),
}

pub struct Storage {
    backend: Backend,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("fallback write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Storage {
    /// Connect to Postgres when configured and reachable; otherwise fall
    /// back to JSONL appenders under `fallback_dir`.
    pub async fn init(database_url: &str, fallback_dir: PathBuf) -> Self {
        if !database_url.is_empty() {
            match PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
            {
                Ok(pool) => match sqlx::query(SCHEMA_SQL).execute(&pool).await {
                    Ok(_) => {
                        tracing::info!("PostgreSQL storage ready");
                        return Self {
                            backend: Backend::Postgres(pool),
                        };
                    }
                    Err(e) => {
                        tracing::warn!("schema setup failed, using JSONL fallback: {e}");
                    }
                },
                Err(e) => {
                    tracing::warn!("PostgreSQL unavailable, using JSONL fallback: {e}");
                }
            }
        }

        tracing::info!("JSONL storage at {}", fallback_dir.display());
        Self {
            backend: Backend::Jsonl(fallback_dir),
        }
    }

    /// In-memory/test constructor: JSONL into a scratch directory.
    pub fn jsonl(dir: PathBuf) -> Self {
        Self {
            backend: Backend::Jsonl(dir),
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(self.backend, Backend::Postgres(_))
    }

    pub fn kind(&self) -> &'static str {
        match self.backend {
            Backend::Postgres(_) => "postgresql",
            Backend::Jsonl(_) => "jsonl",
        }
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    pub async fn save_ingested(&self, rec: &IngestedUrl) -> Result<(), StorageError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                sqlx::query(
                    "INSERT INTO ingested_urls \
                     (id, url, url_normalized, url_hash, label, source, metadata, created_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(rec.id)
                .bind(&rec.url)
                .bind(&rec.url_normalized)
                .bind(&rec.url_hash)
                .bind(rec.label)
                .bind(&rec.source)
                .bind(&rec.metadata)
                .bind(rec.created_at)
                .execute(pool)
                .await?;
                Ok(())
            }
            Backend::Jsonl(dir) => append_jsonl(dir, "ingested_urls.jsonl", rec),
        }
    }

    pub async fn save_report(&self, rec: &UrlReport) -> Result<(), StorageError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                sqlx::query(
                    "INSERT INTO reports \
                     (id, url, url_normalized, url_hash, label, comment, contact, source, created_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                )
                .bind(rec.id)
                .bind(&rec.url)
                .bind(&rec.url_normalized)
                .bind(&rec.url_hash)
                .bind(rec.label.as_str())
                .bind(&rec.comment)
                .bind(&rec.contact)
                .bind(&rec.source)
                .bind(rec.created_at)
                .execute(pool)
                .await?;
                Ok(())
            }
            Backend::Jsonl(dir) => append_jsonl(dir, "user_reports.jsonl", rec),
        }
    }

    pub async fn save_analysis(&self, rec: &AnalysisRecord) -> Result<(), StorageError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                sqlx::query(
                    "INSERT INTO analysis_results \
                     (id, url_normalized, url_hash, score, risk_level, signals, ml_score, \
                      heuristic_score, tranco_verified, virustotal_checked, mode_used, \
                      duration_ms, created_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
                )
                .bind(rec.id)
                .bind(&rec.url_normalized)
                .bind(&rec.url_hash)
                .bind(rec.score)
                .bind(&rec.risk_level)
                .bind(&rec.signals)
                .bind(rec.ml_score)
                .bind(rec.heuristic_score)
                .bind(rec.tranco_verified)
                .bind(rec.virustotal_checked)
                .bind(&rec.mode_used)
                .bind(rec.duration_ms)
                .bind(rec.created_at)
                .execute(pool)
                .await?;
                Ok(())
            }
            Backend::Jsonl(dir) => append_jsonl(dir, "analysis_results.jsonl", rec),
        }
    }
}

fn append_jsonl<T: serde::Serialize>(
    dir: &PathBuf,
    file: &str,
    record: &T,
) -> Result<(), StorageError> {
    std::fs::create_dir_all(dir)?;
    let mut handle = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(file))?;
    let line = serde_json::to_string(record)?;
    writeln!(handle, "{line}")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportLabel;

    #[tokio::test]
    async fn test_jsonl_fallback_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::jsonl(dir.path().to_path_buf());
        assert!(!storage.is_database());
        assert_eq!(storage.kind(), "jsonl");

        let report = UrlReport::new(
            "http://phish.test/a",
            "http://phish.test/a",
            ReportLabel::Phishing,
            Some("recibido por SMS".into()),
            None,
        );
        storage.save_report(&report).await.unwrap();
        storage.save_report(&report).await.unwrap();

        let content =
            std::fs::read_to_string(dir.path().join("user_reports.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
        let parsed: serde_json::Value =
            serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["label"], "phishing");
    }

    #[tokio::test]
    async fn test_empty_database_url_goes_to_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::init("", dir.path().to_path_buf()).await;
        assert_eq!(storage.kind(), "jsonl");
    }

    #[tokio::test]
    async fn test_ingest_fallback_file_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::jsonl(dir.path().to_path_buf());

        let rec = IngestedUrl::new(
            "http://feed.test/x",
            "http://feed.test/x",
            Some(1),
            "feed",
            serde_json::json!({"batch": 7}),
        );
        storage.save_ingested(&rec).await.unwrap();
        assert!(dir.path().join("ingested_urls.jsonl").exists());
        assert!(!dir.path().join("user_reports.jsonl").exists());
    }
}
