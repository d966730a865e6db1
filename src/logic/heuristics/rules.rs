//! Heuristic Predictor — local rules
//!
//! Deterministic and explainable: starts from a base score, fires every
//! rule whose predicate holds on the lexical features, sums the calibrated
//! weights and clamps to [0,100]. No external calls happen here; the
//! reputation rules (Tranco, VirusTotal, WHOIS) are applied by the
//! orchestrator during fusion.

use serde_json::json;

use super::weights::{self, WeightsTable};
use crate::constants::{
    HEURISTIC_BASE_SCORE, HIGH_DIGIT_RATIO_THRESHOLD, HIGH_ENTROPY_THRESHOLD,
    LONG_URL_THRESHOLD,
};
use crate::logic::catalog::Catalog;
use crate::logic::features::FeatureVector;
use crate::logic::safety::UrlContext;
use crate::logic::signal::{Severity, Signal};

/// Local heuristic outcome: partial score plus the signals that built it.
#[derive(Debug, Clone)]
pub struct HeuristicOutcome {
    pub score: i32,
    pub signals: Vec<Signal>,
}

/// Evaluate every rule that needs no external calls.
pub fn evaluate_local(
    ctx: &UrlContext,
    features: &FeatureVector,
    catalog: &Catalog,
    weights: &WeightsTable,
) -> HeuristicOutcome {
    let mut signals = Vec::new();
    let host = ctx.host.as_str();

    if features.contains_ip {
        signals.push(Signal::new(
            weights::IP_AS_HOST,
            Severity::High,
            weights.get(weights::IP_AS_HOST),
            json!({ "ip": host }),
            format!(
                "La URL usa la direccion IP '{host}' en lugar de un dominio. \
                 Los sitios legitimos usan nombres de dominio."
            ),
        ));
    }

    if !features.has_https {
        signals.push(Signal::new(
            weights::NO_HTTPS,
            Severity::Low,
            weights.get(weights::NO_HTTPS),
            json!({ "scheme": ctx.scheme }),
            "La URL no usa conexion segura HTTPS.",
        ));
    }

    if features.brand_impersonation {
        let brand = features.impersonated_brand.unwrap_or("desconocida");
        let official = catalog.official_domain(brand).unwrap_or("");
        signals.push(Signal::new(
            weights::BRAND_IMPERSONATION,
            Severity::High,
            weights.get(weights::BRAND_IMPERSONATION),
            json!({
                "brand": brand,
                "fake_domain": host,
                "official_domain": official,
                "technique": "Brand Impersonation / Typosquatting",
            }),
            format!(
                "PHISHING: El sitio '{host}' intenta suplantar a '{}'. \
                 El dominio oficial es '{official}'. NO ingrese sus credenciales.",
                brand.to_uppercase()
            ),
        ));
    }

    if features.has_suspicious_words >= 1 {
        let count = features.has_suspicious_words;
        signals.push(Signal::new(
            weights::SUSPICIOUS_WORDS,
            if count < 3 { Severity::Medium } else { Severity::High },
            weights.get(weights::SUSPICIOUS_WORDS),
            json!({ "words": features.matched_words, "count": count }),
            format!(
                "La URL contiene {count} palabra(s) sospechosa(s): {}.",
                features.matched_words.join(", ")
            ),
        ));
    }

    if features.has_punycode {
        signals.push(Signal::new(
            weights::PUNYCODE_DETECTED,
            Severity::High,
            weights.get(weights::PUNYCODE_DETECTED),
            json!({ "domain": host, "technique": "Homograph Attack" }),
            format!(
                "El dominio '{host}' usa caracteres Unicode (punycode) que \
                 pueden imitar sitios legitimos."
            ),
        ));
    }

    if features.paste_service_detected {
        let service = catalog
            .paste_services
            .iter()
            .copied()
            .find(|p| Catalog::host_matches(host, &[*p]))
            .unwrap_or("desconocido");
        signals.push(Signal::new(
            weights::PASTE_SERVICE,
            Severity::Medium,
            weights.get(weights::PASTE_SERVICE),
            json!({ "service": service }),
            format!(
                "Esta URL es de '{service}', un servicio frecuentemente usado \
                 para distribuir malware."
            ),
        ));
    }

    if features.digit_ratio >= HIGH_DIGIT_RATIO_THRESHOLD {
        signals.push(Signal::new(
            weights::HIGH_DIGIT_RATIO,
            Severity::Low,
            weights.get(weights::HIGH_DIGIT_RATIO),
            json!({ "ratio": (features.digit_ratio * 100.0).round() / 100.0 }),
            "La URL contiene una proporcion inusual de numeros.",
        ));
    }

    if features.entropy >= HIGH_ENTROPY_THRESHOLD {
        signals.push(Signal::new(
            weights::HIGH_ENTROPY,
            Severity::Low,
            weights.get(weights::HIGH_ENTROPY),
            json!({ "entropy": (features.entropy * 100.0).round() / 100.0 }),
            "El dominio parece aleatorio (alta entropia).",
        ));
    }

    if features.shortener_detected {
        let shortener = catalog
            .shorteners
            .iter()
            .copied()
            .find(|s| Catalog::host_matches(host, &[*s]))
            .unwrap_or("desconocido");
        signals.push(Signal::new(
            weights::URL_SHORTENER,
            Severity::Medium,
            weights.get(weights::URL_SHORTENER),
            json!({ "shortener": shortener }),
            format!("Esta URL usa el acortador '{shortener}' que oculta el destino real."),
        ));
    }

    if features.has_at_symbol {
        signals.push(Signal::new(
            weights::AT_SYMBOL,
            Severity::Medium,
            weights.get(weights::AT_SYMBOL),
            json!({}),
            "La URL contiene '@', que puede usarse para engañar sobre el destino real.",
        ));
    }

    if features.tld_risk {
        let tld = ctx.tld();
        signals.push(Signal::new(
            weights::RISKY_TLD,
            Severity::Medium,
            weights.get(weights::RISKY_TLD),
            json!({ "tld": format!(".{tld}") }),
            format!("El dominio usa '.{tld}', un TLD con alta tasa de abuso."),
        ));
    }

    if features.excessive_subdomains {
        signals.push(Signal::new(
            weights::EXCESSIVE_SUBDOMAINS,
            Severity::Medium,
            weights.get(weights::EXCESSIVE_SUBDOMAINS),
            json!({ "count": features.num_subdomains }),
            "La URL tiene demasiados subdominios, algo comun en phishing.",
        ));
    }

    if features.url_length as usize > LONG_URL_THRESHOLD {
        signals.push(Signal::new(
            weights::LONG_URL,
            Severity::Low,
            weights.get(weights::LONG_URL),
            json!({ "length": features.url_length }),
            "La URL es inusualmente larga.",
        ));
    }

    if catalog.is_hosting_platform(host) {
        let platform = catalog
            .hosting_platforms
            .iter()
            .copied()
            .find(|h| Catalog::host_matches(host, &[*h]))
            .unwrap_or("desconocido");
        signals.push(Signal::new(
            weights::HOSTING_PLATFORM,
            Severity::Medium,
            weights.get(weights::HOSTING_PLATFORM),
            json!({ "platform": platform }),
            format!(
                "URL hospedada en '{platform}', donde cualquiera puede publicar \
                 contenido. El dominio es confiable pero el contenido puede no serlo."
            ),
        ));
    }

    if catalog.is_trusted(host) {
        signals.push(Signal::new(
            weights::TRUSTED_DOMAIN,
            Severity::Low,
            weights.get(weights::TRUSTED_DOMAIN),
            json!({ "domain": ctx.registrable_domain }),
            "Dominio reconocido como sitio de confianza.",
        ));
    }

    let sum: i32 = HEURISTIC_BASE_SCORE + signals.iter().map(|s| s.weight).sum::<i32>();

    HeuristicOutcome {
        score: sum.clamp(0, 100),
        signals,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::extract;
    use crate::logic::safety::validate_and_normalize;

    async fn evaluate(url: &str) -> HeuristicOutcome {
        let catalog = Catalog::default();
        let weights = WeightsTable::default();
        let ctx = validate_and_normalize(url).await.unwrap();
        let features = extract(&ctx, &catalog, None, 100_000);
        evaluate_local(&ctx, &features, &catalog, &weights)
    }

    fn has(outcome: &HeuristicOutcome, id: &str) -> bool {
        outcome.signals.iter().any(|s| s.id == id)
    }

    #[tokio::test]
    async fn test_clean_https_url_scores_near_base() {
        let outcome = evaluate("https://www.example.com/page").await;
        assert!(!has(&outcome, weights::NO_HTTPS));
        assert_eq!(outcome.score, HEURISTIC_BASE_SCORE);
    }

    #[tokio::test]
    async fn test_trusted_domain_cancels_base() {
        let outcome = evaluate("https://www.wikipedia.org/wiki/Rust").await;
        assert!(has(&outcome, weights::TRUSTED_DOMAIN));
        assert_eq!(outcome.score, 0);
    }

    #[tokio::test]
    async fn test_phishing_shape_scores_high() {
        let outcome = evaluate("http://paypa1-secure.xyz/login").await;
        for id in [
            weights::NO_HTTPS,
            weights::BRAND_IMPERSONATION,
            weights::SUSPICIOUS_WORDS,
            weights::RISKY_TLD,
        ] {
            assert!(has(&outcome, id), "missing {id}");
        }
        // the rule sum exceeds 100 → clamped
        assert_eq!(outcome.score, 100);
    }

    #[tokio::test]
    async fn test_ip_host_rule() {
        let outcome = evaluate("http://8.8.8.8/admin").await;
        assert!(has(&outcome, weights::IP_AS_HOST));
        assert!(has(&outcome, weights::NO_HTTPS));
        // 15 + 39 + 34 = 88
        assert_eq!(outcome.score, 88);
    }

    #[tokio::test]
    async fn test_every_signal_weight_comes_from_table() {
        let table = WeightsTable::default();
        let outcome = evaluate("http://paypa1-secure.xyz/login?user=1@2").await;
        for signal in &outcome.signals {
            assert_eq!(
                signal.weight,
                table.get(&signal.id),
                "inline weight override on {}",
                signal.id
            );
        }
    }

    #[tokio::test]
    async fn test_monotonicity_more_keywords_never_lower_score() {
        let base = evaluate("http://some-site.test/a").await;
        let one = evaluate("http://some-site.test/a-login").await;
        let two = evaluate("http://some-site.test/a-login-verify").await;
        assert!(one.score >= base.score);
        assert!(two.score >= one.score);
    }

    #[tokio::test]
    async fn test_shortener_signal() {
        let outcome = evaluate("https://bit.ly/abcd1234").await;
        assert!(has(&outcome, weights::URL_SHORTENER));
        assert!(!has(&outcome, weights::PASTE_SERVICE));
    }

    #[tokio::test]
    async fn test_hosting_platform_signal() {
        let outcome = evaluate("https://login-update.github.io/secure").await;
        assert!(has(&outcome, weights::HOSTING_PLATFORM));
    }
}
