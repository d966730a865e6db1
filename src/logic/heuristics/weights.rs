//! Calibrated Weights Table
//!
//! Every signal the engine can emit has an entry here. Defaults are the
//! calibrated values shipped with the engine; a weights artifact (JSON)
//! loaded at boot overrides them. Signals always take their weight from
//! this table, never inline.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ============================================================================
// SIGNAL IDS
// ============================================================================

// Local lexical rules
pub const IP_AS_HOST: &str = "IP_AS_HOST";
pub const NO_HTTPS: &str = "NO_HTTPS";
pub const BRAND_IMPERSONATION: &str = "BRAND_IMPERSONATION";
pub const SUSPICIOUS_WORDS: &str = "SUSPICIOUS_WORDS";
pub const PUNYCODE_DETECTED: &str = "PUNYCODE_DETECTED";
pub const PASTE_SERVICE: &str = "PASTE_SERVICE";
pub const HIGH_DIGIT_RATIO: &str = "HIGH_DIGIT_RATIO";
pub const HIGH_ENTROPY: &str = "HIGH_ENTROPY";
pub const URL_SHORTENER: &str = "URL_SHORTENER";
pub const AT_SYMBOL: &str = "AT_SYMBOL";
pub const RISKY_TLD: &str = "RISKY_TLD";
pub const EXCESSIVE_SUBDOMAINS: &str = "EXCESSIVE_SUBDOMAINS";
pub const LONG_URL: &str = "LONG_URL";
pub const HOSTING_PLATFORM: &str = "HOSTING_PLATFORM";
pub const TRUSTED_DOMAIN: &str = "TRUSTED_DOMAIN";

// Reputation rules (applied during fusion)
pub const DOMAIN_IN_TRANCO: &str = "DOMAIN_IN_TRANCO";
pub const DOMAIN_NOT_IN_TRANCO: &str = "DOMAIN_NOT_IN_TRANCO";
pub const DOMAIN_TOO_NEW: &str = "DOMAIN_TOO_NEW";
pub const DOMAIN_ESTABLISHED: &str = "DOMAIN_ESTABLISHED";
pub const VIRUSTOTAL_CLEAN: &str = "VIRUSTOTAL_CLEAN";
pub const VIRUSTOTAL_MALICIOUS_LOW: &str = "VIRUSTOTAL_MALICIOUS_LOW";
pub const VIRUSTOTAL_MALICIOUS_MED: &str = "VIRUSTOTAL_MALICIOUS_MED";
pub const VIRUSTOTAL_MALICIOUS_HIGH: &str = "VIRUSTOTAL_MALICIOUS_HIGH";
pub const VIRUSTOTAL_MALICIOUS_CRITICAL: &str = "VIRUSTOTAL_MALICIOUS_CRITICAL";

// Crawler evidence rules
pub const FORM_SUBMITS_EXTERNALLY: &str = "FORM_SUBMITS_EXTERNALLY";
pub const SSL_CERTIFICATE_ERROR: &str = "SSL_CERTIFICATE_ERROR";
pub const LOGIN_FORM_DETECTED: &str = "LOGIN_FORM_DETECTED";
pub const BRAND_CONTENT_DETECTED: &str = "BRAND_CONTENT_DETECTED";
pub const CREDIT_CARD_FORM: &str = "CREDIT_CARD_FORM";
pub const SUSPICIOUS_INPUT_FIELDS: &str = "SUSPICIOUS_INPUT_FIELDS";
pub const PHISHING_TEXT_DETECTED: &str = "PHISHING_TEXT_DETECTED";
pub const REDIRECT_TO_DIFFERENT_DOMAIN: &str = "REDIRECT_TO_DIFFERENT_DOMAIN";
pub const EXCESSIVE_REDIRECTS: &str = "EXCESSIVE_REDIRECTS";
pub const EXCESSIVE_IFRAMES: &str = "EXCESSIVE_IFRAMES";
pub const EXCESSIVE_HIDDEN_INPUTS: &str = "EXCESSIVE_HIDDEN_INPUTS";
pub const PARKING_PAGE: &str = "PARKING_PAGE";

/// Default calibrated weights. Bonuses are negative.
pub const DEFAULT_WEIGHTS: &[(&str, i32)] = &[
    (IP_AS_HOST, 39),
    (NO_HTTPS, 34),
    (BRAND_IMPERSONATION, 31),
    (SUSPICIOUS_WORDS, 18),
    (PUNYCODE_DETECTED, 17),
    (PASTE_SERVICE, 16),
    (DOMAIN_NOT_IN_TRANCO, 12),
    (HIGH_DIGIT_RATIO, 8),
    (HIGH_ENTROPY, 8),
    (URL_SHORTENER, 6),
    (AT_SYMBOL, 5),
    (RISKY_TLD, 15),
    (EXCESSIVE_SUBDOMAINS, 10),
    (LONG_URL, 1),
    (HOSTING_PLATFORM, 15),
    (TRUSTED_DOMAIN, -15),
    (DOMAIN_IN_TRANCO, -35),
    (DOMAIN_TOO_NEW, 35),
    (DOMAIN_ESTABLISHED, -15),
    (VIRUSTOTAL_CLEAN, -25),
    (VIRUSTOTAL_MALICIOUS_LOW, 25),
    (VIRUSTOTAL_MALICIOUS_MED, 40),
    (VIRUSTOTAL_MALICIOUS_HIGH, 60),
    (VIRUSTOTAL_MALICIOUS_CRITICAL, 80),
    (FORM_SUBMITS_EXTERNALLY, 35),
    (SSL_CERTIFICATE_ERROR, 35),
    (LOGIN_FORM_DETECTED, 15),
    (BRAND_CONTENT_DETECTED, 40),
    (CREDIT_CARD_FORM, 25),
    (SUSPICIOUS_INPUT_FIELDS, 30),
    (PHISHING_TEXT_DETECTED, 30),
    (REDIRECT_TO_DIFFERENT_DOMAIN, 20),
    (EXCESSIVE_REDIRECTS, 15),
    (EXCESSIVE_IFRAMES, 10),
    (EXCESSIVE_HIDDEN_INPUTS, 10),
    (PARKING_PAGE, 20),
];

// ============================================================================
// ARTIFACT
// ============================================================================

/// On-disk artifact written by the calibration script.
/// Missing keys fall back to the defaults above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsArtifact {
    #[serde(default = "default_format_version")]
    pub version: u32,
    #[serde(default)]
    pub calibration_date: Option<String>,
    #[serde(default)]
    pub dataset_size: Option<u64>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub weights: BTreeMap<String, i32>,
}

fn default_format_version() -> u32 {
    1
}

// ============================================================================
// WEIGHTS TABLE
// ============================================================================

/// The loaded mapping signal id → integer weight. BTreeMap keeps the id
/// ordering total and stable.
#[derive(Debug, Clone)]
pub struct WeightsTable {
    weights: BTreeMap<String, i32>,
    pub calibrated: bool,
    pub artifact_version: u32,
    pub calibration_date: Option<String>,
}

impl Default for WeightsTable {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            calibrated: false,
            artifact_version: 0,
            calibration_date: None,
        }
    }
}

impl WeightsTable {
    /// Load a calibrated artifact on top of the defaults. A missing file
    /// is not an error: defaults serve.
    pub fn load(path: &Path) -> Self {
        let mut table = Self::default();

        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => {
                tracing::info!(
                    "No weights artifact at {}, using default weights",
                    path.display()
                );
                return table;
            }
        };

        match serde_json::from_str::<WeightsArtifact>(&data) {
            Ok(artifact) => {
                for (id, w) in &artifact.weights {
                    table.weights.insert(id.clone(), *w);
                }
                table.calibrated = true;
                table.artifact_version = artifact.version;
                table.calibration_date = artifact.calibration_date.clone();
                tracing::info!(
                    "Calibrated weights loaded from {} (version {}, {} entries)",
                    path.display(),
                    artifact.version,
                    artifact.weights.len()
                );
                if let Some(acc) = artifact.metrics.get("accuracy") {
                    tracing::info!("Calibration accuracy: {:.2}%", acc * 100.0);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Invalid weights artifact {}: {}. Using defaults.",
                    path.display(),
                    e
                );
            }
        }

        table
    }

    /// Weight for a signal id. Ids the engine emits always have entries;
    /// an unknown id contributes nothing.
    pub fn get(&self, id: &str) -> i32 {
        self.weights.get(id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Ids in stable (sorted) order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(|s| s.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_cover_every_emittable_id() {
        let table = WeightsTable::default();
        for (id, w) in DEFAULT_WEIGHTS {
            assert_eq!(table.get(id), *w);
        }
        assert_eq!(table.len(), DEFAULT_WEIGHTS.len());
    }

    #[test]
    fn test_bonuses_are_negative() {
        let table = WeightsTable::default();
        for id in [TRUSTED_DOMAIN, DOMAIN_IN_TRANCO, DOMAIN_ESTABLISHED, VIRUSTOTAL_CLEAN] {
            assert!(table.get(id) < 0, "{id} must be a bonus");
        }
    }

    #[test]
    fn test_artifact_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "version": 3,
                "calibration_date": "2025-11-02",
                "dataset_size": 7600,
                "metrics": {{"accuracy": 0.93, "f1": 0.91}},
                "weights": {{"NO_HTTPS": 20, "NEW_RULE": 7}}
            }}"#
        )
        .unwrap();

        let table = WeightsTable::load(file.path());
        assert!(table.calibrated);
        assert_eq!(table.artifact_version, 3);
        assert_eq!(table.get(NO_HTTPS), 20);
        assert_eq!(table.get("NEW_RULE"), 7);
        // untouched defaults survive the merge
        assert_eq!(table.get(IP_AS_HOST), 39);
    }

    #[test]
    fn test_missing_artifact_uses_defaults() {
        let table = WeightsTable::load(Path::new("/definitely/not/there.json"));
        assert!(!table.calibrated);
        assert_eq!(table.get(NO_HTTPS), 34);
    }

    #[test]
    fn test_unknown_id_contributes_nothing() {
        let table = WeightsTable::default();
        assert_eq!(table.get("NOT_A_SIGNAL"), 0);
    }
}
