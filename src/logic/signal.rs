//! Signal Types
//!
//! Core types for explainable evidence. No logic here beyond ordering and
//! the score → level bucketing.

use serde::{Deserialize, Serialize};

// ============================================================================
// SEVERITY / RISK LEVEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Deterministic bucketing: 0 → SAFE, 1..=30 → LOW, 31..=70 → MEDIUM,
    /// 71..=100 → HIGH.
    pub fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=0 => RiskLevel::Safe,
            1..=30 => RiskLevel::Low,
            31..=70 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SIGNAL
// ============================================================================

/// One piece of explainable evidence. Negative weights are bonuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub severity: Severity,
    pub weight: i32,
    pub evidence: serde_json::Value,
    /// Human explanation, in Spanish for the mobile client
    pub explanation: String,
}

impl Signal {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        weight: i32,
        evidence: serde_json::Value,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            weight,
            evidence,
            explanation: explanation.into(),
        }
    }
}

/// Stable verdict ordering: descending |weight|, then id ascending.
pub fn sort_signals(signals: &mut [Signal]) {
    signals.sort_by(|a, b| {
        b.weight
            .abs()
            .cmp(&a.weight.abs())
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(31), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(71), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }

    #[test]
    fn test_signal_ordering() {
        let mut signals = vec![
            Signal::new("B_SMALL", Severity::Low, 5, json!({}), ""),
            Signal::new("A_BONUS", Severity::Low, -35, json!({}), ""),
            Signal::new("Z_BIG", Severity::High, 35, json!({}), ""),
            Signal::new("A_BIG", Severity::High, 35, json!({}), ""),
        ];
        sort_signals(&mut signals);
        let ids: Vec<_> = signals.iter().map(|s| s.id.as_str()).collect();
        // |−35| ties with 35; alphabetical id breaks the tie
        assert_eq!(ids, vec!["A_BIG", "A_BONUS", "Z_BIG", "B_SMALL"]);
    }

    #[test]
    fn test_serialization_shape() {
        let s = Signal::new(
            "NO_HTTPS",
            Severity::Low,
            34,
            json!({"scheme": "http"}),
            "La URL no usa conexion segura HTTPS",
        );
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["id"], "NO_HTTPS");
        assert_eq!(v["severity"], "LOW");
        assert_eq!(v["weight"], 34);
    }
}
