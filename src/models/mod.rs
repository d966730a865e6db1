//! Persisted record types
//!
//! Three record kinds flow into storage: ingested dataset URLs, user
//! reports, and analysis history. Each carries a SHA-256 of the
//! normalized URL for fast lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::model::sha256_hex;

// ============================================================================
// INGESTED URL
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedUrl {
    pub id: Uuid,
    pub url: String,
    pub url_normalized: String,
    pub url_hash: String,
    /// 0 = legitimate, 1 = malicious, absent = unlabeled
    pub label: Option<i16>,
    pub source: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl IngestedUrl {
    pub fn new(
        url: &str,
        normalized: &str,
        label: Option<i16>,
        source: &str,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            url_normalized: normalized.to_string(),
            url_hash: sha256_hex(normalized.as_bytes()),
            label,
            source: source.to_string(),
            metadata,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// USER REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLabel {
    Phishing,
    Malware,
    Scam,
    Spam,
    Unknown,
}

impl ReportLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportLabel::Phishing => "phishing",
            ReportLabel::Malware => "malware",
            ReportLabel::Scam => "scam",
            ReportLabel::Spam => "spam",
            ReportLabel::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlReport {
    pub id: Uuid,
    pub url: String,
    pub url_normalized: String,
    pub url_hash: String,
    pub label: ReportLabel,
    pub comment: Option<String>,
    pub contact: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl UrlReport {
    pub fn new(
        url: &str,
        normalized: &str,
        label: ReportLabel,
        comment: Option<String>,
        contact: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            url_normalized: normalized.to_string(),
            url_hash: sha256_hex(normalized.as_bytes()),
            label,
            comment,
            contact,
            source: "mobile_app".to_string(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// ANALYSIS HISTORY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub url_normalized: String,
    pub url_hash: String,
    pub score: i32,
    pub risk_level: String,
    pub signals: serde_json::Value,
    pub ml_score: Option<i32>,
    pub heuristic_score: i32,
    pub tranco_verified: bool,
    pub virustotal_checked: bool,
    pub mode_used: String,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn from_verdict(verdict: &crate::logic::Verdict) -> Self {
        Self {
            id: Uuid::new_v4(),
            url_normalized: verdict.normalized_url.clone(),
            url_hash: sha256_hex(verdict.normalized_url.as_bytes()),
            score: verdict.score,
            risk_level: verdict.risk_level.as_str().to_string(),
            signals: serde_json::to_value(&verdict.signals)
                .unwrap_or_else(|_| serde_json::json!([])),
            ml_score: verdict.ml_score,
            heuristic_score: verdict.heuristic_score,
            tranco_verified: verdict.apis_consulted.tranco,
            virustotal_checked: verdict.apis_consulted.virustotal,
            mode_used: match verdict.mode_used {
                crate::logic::ConnectionMode::Auto => "auto",
                crate::logic::ConnectionMode::Online => "online",
                crate::logic::ConnectionMode::Offline => "offline",
            }
            .to_string(),
            duration_ms: verdict.timestamps.duration_ms as i64,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_hash_is_over_normalized_form() {
        let rec = IngestedUrl::new(
            "HTTP://Example.com/x",
            "http://example.com/x",
            Some(1),
            "feed",
            serde_json::json!({}),
        );
        assert_eq!(rec.url_hash, sha256_hex(b"http://example.com/x"));
        assert_eq!(rec.url_hash.len(), 64);
    }

    #[test]
    fn test_report_label_wire_values() {
        assert_eq!(
            serde_json::to_string(&ReportLabel::Phishing).unwrap(),
            "\"phishing\""
        );
        assert_eq!(ReportLabel::Scam.as_str(), "scam");
    }
}
