//! Verdict data model
//!
//! Wire types for the analyze response. The JSON shape is the contract
//! with the mobile client; internal-only fields are skip-serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{CRAWL_DEFAULT_MAX_REDIRECTS, CRAWL_DEFAULT_TIMEOUT_SECS};
use crate::logic::crawler::{CrawlOutcome, CrawlReport};
use crate::logic::signal::{RiskLevel, Signal};

// ============================================================================
// REQUEST OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Auto,
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Ml,
    Heuristic,
}

/// Analyze options, normalized from the request body.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub model: ModelKind,
    pub mode: ConnectionMode,
    pub enable_crawler: bool,
    pub timeout_seconds: u64,
    pub max_redirects: u32,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            model: ModelKind::Ml,
            mode: ConnectionMode::Auto,
            enable_crawler: false,
            timeout_seconds: CRAWL_DEFAULT_TIMEOUT_SECS,
            max_redirects: CRAWL_DEFAULT_MAX_REDIRECTS,
        }
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Which collaborators actually answered for this request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ApisConsulted {
    pub tranco: bool,
    pub virustotal: bool,
    pub whois: bool,
    pub crawler: bool,
    pub database: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamps {
    pub requested_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Crawl section of the verdict, present only when the crawler ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    pub enabled: bool,
    pub status: CrawlOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub redirect_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_fingerprint: Option<String>,
    pub evidence: serde_json::Value,
}

impl CrawlSection {
    pub fn skipped() -> Self {
        Self {
            enabled: true,
            status: CrawlOutcome::Skipped,
            final_url: None,
            redirect_chain: Vec::new(),
            html_fingerprint: None,
            evidence: serde_json::json!({}),
        }
    }

    /// The crawl was cancelled by the request deadline before reporting.
    pub fn timed_out() -> Self {
        Self {
            status: CrawlOutcome::Timeout,
            ..Self::skipped()
        }
    }

    pub fn from_report(report: &CrawlReport) -> Self {
        Self {
            enabled: true,
            status: report.outcome,
            final_url: Some(report.final_url.clone()),
            redirect_chain: report.redirect_chain.clone(),
            html_fingerprint: if report.html_fingerprint.is_empty() {
                None
            } else {
                Some(report.html_fingerprint.clone())
            },
            evidence: serde_json::to_value(&report.evidence)
                .unwrap_or_else(|_| serde_json::json!({})),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub url: String,
    pub normalized_url: String,
    /// Risk score in [0,100]
    pub score: i32,
    pub risk_level: RiskLevel,
    pub model_used: ModelKind,
    pub mode_used: ConnectionMode,
    pub apis_consulted: ApisConsulted,
    pub signals: Vec<Signal>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl: Option<CrawlSection>,
    pub timestamps: Timestamps,

    /// Per-model scores, persisted with the analysis record but not part
    /// of the wire contract.
    #[serde(skip)]
    pub ml_score: Option<i32>,
    #[serde(skip)]
    pub heuristic_score: i32,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::signal::Severity;

    #[test]
    fn test_verdict_wire_shape() {
        let now = Utc::now();
        let verdict = Verdict {
            url: "https://example.com/x".into(),
            normalized_url: "https://example.com/x".into(),
            score: 42,
            risk_level: RiskLevel::Medium,
            model_used: ModelKind::Heuristic,
            mode_used: ConnectionMode::Online,
            apis_consulted: ApisConsulted::default(),
            signals: vec![Signal::new(
                "NO_HTTPS",
                Severity::Low,
                34,
                serde_json::json!({}),
                "x",
            )],
            recommendations: vec!["Proceda con precaucion".into()],
            crawl: None,
            timestamps: Timestamps {
                requested_at: now,
                completed_at: now,
                duration_ms: 12,
            },
            ml_score: Some(40),
            heuristic_score: 42,
        };

        let v = serde_json::to_value(&verdict).unwrap();
        assert_eq!(v["risk_level"], "MEDIUM");
        assert_eq!(v["model_used"], "heuristic");
        assert_eq!(v["mode_used"], "online");
        assert!(v.get("crawl").is_none(), "crawl omitted when None");
        assert!(v.get("ml_score").is_none(), "internal fields stay internal");
        assert_eq!(v["apis_consulted"]["tranco"], false);
        assert_eq!(v["timestamps"]["duration_ms"], 12);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&ConnectionMode::Offline).unwrap(),
            "\"offline\""
        );
        assert_eq!(serde_json::to_string(&ModelKind::Ml).unwrap(), "\"ml\"");
    }
}
