//! Feature extraction
//!
//! Turns a normalized URL context into the fixed 24-feature record the
//! predictors consume. Extraction is total and pure: any well-formed
//! context yields a finite, fully-populated vector.

use serde::Serialize;
use strsim::normalized_damerau_levenshtein;

use super::layout::{FEATURE_COUNT, FEATURE_VERSION};
use crate::constants::EXCESSIVE_SUBDOMAINS_THRESHOLD;
use crate::logic::catalog::Catalog;
use crate::logic::intel::tranco::TrancoVerdict;
use crate::logic::safety::UrlContext;

/// Similarity at or above which a label is considered near-identical to a
/// brand name.
const BRAND_SIMILARITY_THRESHOLD: f64 = 0.70;

/// Cap on counted suspicious keywords (more adds no information)
const SUSPICIOUS_WORDS_CAP: u32 = 5;

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// The fixed feature record. Field order mirrors `layout::FEATURE_LAYOUT`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureVector {
    pub url_length: u32,
    pub domain_length: u32,
    pub path_length: u32,
    pub num_digits: u32,
    pub num_hyphens: u32,
    pub num_dots: u32,
    pub num_subdomains: u32,
    pub entropy: f64,
    pub has_https: bool,
    pub has_port: bool,
    pub has_at_symbol: bool,
    pub contains_ip: bool,
    pub has_punycode: bool,
    pub shortener_detected: bool,
    pub paste_service_detected: bool,
    pub has_suspicious_words: u32,
    pub tld_risk: bool,
    pub excessive_subdomains: bool,
    pub digit_ratio: f64,
    pub num_params: u32,
    pub special_chars: u32,
    pub in_tranco: bool,
    pub tranco_rank: f64,
    pub brand_impersonation: bool,

    /// Which brand triggered `brand_impersonation` (evidence only, not a
    /// model input)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonated_brand: Option<&'static str>,
    /// Keywords that matched (evidence only)
    pub matched_words: Vec<&'static str>,
}

impl FeatureVector {
    /// Values in layout order, for the ML pipeline.
    pub fn to_array(&self) -> [f32; FEATURE_COUNT] {
        [
            self.url_length as f32,
            self.domain_length as f32,
            self.path_length as f32,
            self.num_digits as f32,
            self.num_hyphens as f32,
            self.num_dots as f32,
            self.num_subdomains as f32,
            self.entropy as f32,
            self.has_https as u8 as f32,
            self.has_port as u8 as f32,
            self.has_at_symbol as u8 as f32,
            self.contains_ip as u8 as f32,
            self.has_punycode as u8 as f32,
            self.shortener_detected as u8 as f32,
            self.paste_service_detected as u8 as f32,
            self.has_suspicious_words as f32,
            self.tld_risk as u8 as f32,
            self.excessive_subdomains as u8 as f32,
            self.digit_ratio as f32,
            self.num_params as f32,
            self.special_chars as f32,
            self.in_tranco as u8 as f32,
            self.tranco_rank as f32,
            self.brand_impersonation as u8 as f32,
        ]
    }

    /// Layout version this vector was produced under.
    pub fn version(&self) -> u8 {
        FEATURE_VERSION
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Extract the feature record from a normalized context.
///
/// `tranco` carries the lookup result when one ran; `None` leaves the
/// reputation placeholders at their defaults, exactly as in training.
pub fn extract(
    ctx: &UrlContext,
    catalog: &Catalog,
    tranco: Option<&TrancoVerdict>,
    tranco_threshold: u32,
) -> FeatureVector {
    let url = ctx.normalized.as_str();
    let url_lower = url.to_lowercase();
    let host = ctx.host.as_str();

    let url_length = url.len() as u32;
    let num_digits = url.chars().filter(|c| c.is_ascii_digit()).count() as u32;
    let num_subdomains = subdomain_count(ctx);

    let (suspicious_count, matched_words) =
        count_suspicious_words(&url_lower, host, catalog);

    let (brand_impersonation, impersonated_brand) = detect_brand_impersonation(ctx, catalog);

    let (in_tranco, tranco_rank) = match tranco {
        Some(v) if v.in_top_k => {
            let rank = v.rank.unwrap_or(tranco_threshold) as f64;
            (true, (1.0 - rank / tranco_threshold as f64).max(0.0))
        }
        _ => (false, 0.0),
    };

    FeatureVector {
        url_length,
        domain_length: ctx.registrable_domain.len() as u32,
        path_length: ctx.path.len() as u32,
        num_digits,
        num_hyphens: url.matches('-').count() as u32,
        num_dots: url.matches('.').count() as u32,
        num_subdomains,
        entropy: shannon_entropy(host),
        has_https: ctx.scheme == "https",
        has_port: ctx.port.is_some(),
        has_at_symbol: url.contains('@'),
        contains_ip: ctx.is_ip_literal,
        has_punycode: host.split('.').any(|l| l.starts_with("xn--")),
        shortener_detected: catalog.is_shortener(host),
        paste_service_detected: catalog.is_paste_service(host),
        has_suspicious_words: suspicious_count,
        tld_risk: catalog.is_risky_tld(ctx.tld()),
        excessive_subdomains: num_subdomains > EXCESSIVE_SUBDOMAINS_THRESHOLD,
        digit_ratio: if url_length > 0 {
            num_digits as f64 / url_length as f64
        } else {
            0.0
        },
        num_params: ctx.query.matches('=').count() as u32,
        special_chars: url
            .chars()
            .filter(|c| !c.is_ascii_alphanumeric() && !"./:?=&_-".contains(*c))
            .count() as u32,
        in_tranco,
        tranco_rank,
        brand_impersonation,
        impersonated_brand,
        matched_words,
    }
}

/// Shannon entropy of `text` in bits.
pub fn shannon_entropy(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    for c in text.chars() {
        *counts.entry(c).or_insert(0usize) += 1;
    }
    let len = text.chars().count() as f64;
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn subdomain_count(ctx: &UrlContext) -> u32 {
    if ctx.is_ip_literal {
        return 0;
    }
    let host_labels = ctx.host.split('.').count();
    let registrable_labels = ctx.registrable_domain.split('.').count();
    host_labels.saturating_sub(registrable_labels) as u32
}

/// Count catalog keywords present anywhere in the URL. Brand keywords do
/// not count on the brand's own canonical domain (google.com must not be
/// suspicious for containing "google").
fn count_suspicious_words(
    url_lower: &str,
    host: &str,
    catalog: &Catalog,
) -> (u32, Vec<&'static str>) {
    let mut matched = Vec::new();
    for word in catalog.suspicious_words {
        if !url_lower.contains(word) {
            continue;
        }
        if catalog.official_domain(word).is_some() && catalog.is_official_domain(host, word) {
            continue;
        }
        matched.push(*word);
        if matched.len() as u32 >= SUSPICIOUS_WORDS_CAP {
            break;
        }
    }
    (matched.len() as u32, matched)
}

/// Brand impersonation heuristic.
///
/// Flags when the registrable second-level label (or a hyphen token of it)
/// is near-identical to a cataloged brand without being the brand's
/// canonical domain, or when the brand appears as a non-final subdomain
/// (`paypal.example.xyz`). The exact second-level label itself is exempt
/// per the similarity rule.
fn detect_brand_impersonation(
    ctx: &UrlContext,
    catalog: &Catalog,
) -> (bool, Option<&'static str>) {
    if ctx.is_ip_literal {
        return (false, None);
    }

    let sld_label = ctx
        .registrable_domain
        .split('.')
        .next()
        .unwrap_or("")
        .to_lowercase();
    // Punycode labels are compared with the ACE prefix stripped so the
    // visible part of the label is what gets measured.
    let comparable = sld_label.strip_prefix("xn--").unwrap_or(&sld_label);

    let subdomain_part = ctx
        .host
        .strip_suffix(&ctx.registrable_domain)
        .unwrap_or("")
        .trim_end_matches('.');

    for (brand, _) in catalog.known_brands.iter().copied() {
        if catalog.is_official_domain(&ctx.host, brand) {
            continue;
        }

        // near-identical whole label, excluding the exact brand name
        if sld_label != brand
            && normalized_damerau_levenshtein(comparable, brand) >= BRAND_SIMILARITY_THRESHOLD
        {
            return (true, Some(brand));
        }

        // composite labels: paypa1-secure, secure-paypal, pypal-4ve.
        // A single-token label was already measured above, keeping the
        // exact-label exemption intact (github.io stays clean).
        for token in comparable.split('-') {
            if token == comparable {
                continue;
            }
            if token == brand
                || (token.len() >= 4
                    && normalized_damerau_levenshtein(token, brand)
                        >= BRAND_SIMILARITY_THRESHOLD)
            {
                return (true, Some(brand));
            }
        }

        // brand as a non-final subdomain: paypal.example.xyz
        if subdomain_part.split('.').any(|l| l == brand) {
            return (true, Some(brand));
        }
    }

    (false, None)
}

// ============================================================================
// TESTS (see also features/tests.rs)
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_basics() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
        // two symbols, equal frequency → exactly 1 bit
        assert!((shannon_entropy("abab") - 1.0).abs() < 1e-9);
        // random-looking strings score high
        assert!(shannon_entropy("x9k2qpv7walrd3") > 3.5);
    }
}
