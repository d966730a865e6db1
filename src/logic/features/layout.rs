//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema.**
//!
//! Rules (never break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! The layout must be identical between training and inference: the ML
//! artifact's sidecar metadata carries the feature names it was trained
//! with and the loader refuses any artifact whose list differs.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Feature names in the exact order they appear in the vector.
/// SINGLE SOURCE OF TRUTH for the layout.
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Lexical lengths (0-2) ===
    "url_length",            // 0: byte length of the normalized URL
    "domain_length",         // 1: length of the registrable domain
    "path_length",           // 2: length of the path component
    // === Character counts (3-6) ===
    "num_digits",            // 3: ASCII digits in the URL
    "num_hyphens",           // 4: count of '-'
    "num_dots",              // 5: count of '.'
    "num_subdomains",        // 6: labels left of the registrable domain
    // === Host statistics (7) ===
    "entropy",               // 7: Shannon entropy of the host, in bits
    // === Binary shape flags (8-14) ===
    "has_https",             // 8: scheme is https
    "has_port",              // 9: explicit non-default port
    "has_at_symbol",         // 10: '@' present anywhere
    "contains_ip",           // 11: host is an IP literal
    "has_punycode",          // 12: any label begins with "xn--"
    "shortener_detected",    // 13: host in shortener list
    "paste_service_detected",// 14: host in paste-service list
    // === Catalog matches (15-17) ===
    "has_suspicious_words",  // 15: count of keyword matches
    "tld_risk",              // 16: effective TLD in risky set
    "excessive_subdomains",  // 17: num_subdomains > 3
    // === Ratios & query shape (18-20) ===
    "digit_ratio",           // 18: num_digits / url_length
    "num_params",            // 19: count of '=' in query
    "special_chars",         // 20: chars outside [A-Za-z0-9./:?=&_-]
    // === Reputation placeholders (21-23) ===
    "in_tranco",             // 21: filled only when a Tranco lookup ran
    "tranco_rank",           // 22: normalized rank in [0,1], 0 if absent
    "brand_impersonation",   // 23: near-identical to a known brand
];

/// Total number of features. Must match FEATURE_LAYOUT.len().
pub const FEATURE_COUNT: usize = 24;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 hash of the layout, used to detect schema drift at runtime.
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// Complete layout information for artifacts and status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Get feature index by name (O(n), features are few).
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index.
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_COUNT, 24);
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_stable() {
        assert_eq!(layout_hash(), layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_feature_lookups() {
        assert_eq!(feature_index("url_length"), Some(0));
        assert_eq!(feature_index("brand_impersonation"), Some(23));
        assert_eq!(feature_index("nonexistent"), None);
        assert_eq!(feature_name(7), Some("entropy"));
        assert_eq!(feature_name(100), None);
    }

    #[test]
    fn test_layout_info() {
        let info = LayoutInfo::current();
        assert_eq!(info.feature_count, FEATURE_COUNT);
        assert_eq!(info.feature_names.len(), FEATURE_COUNT);
    }
}
