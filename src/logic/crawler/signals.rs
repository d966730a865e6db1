//! Crawl signal synthesis
//!
//! Maps crawl evidence to weighted signals, then applies the
//! false-positive guard: on a Tranco top-k host only critical evidence
//! (SSL failure, external form submission, cross-domain redirect) is
//! admitted.

use serde_json::json;
use url::Url;

use super::CrawlReport;
use crate::logic::heuristics::weights::{self, WeightsTable};
use crate::logic::signal::{Severity, Signal};

/// Crawl signals that survive the Tranco top-k filter
const CRITICAL_IDS: &[&str] = &[
    weights::SSL_CERTIFICATE_ERROR,
    weights::FORM_SUBMITS_EXTERNALLY,
    weights::REDIRECT_TO_DIFFERENT_DOMAIN,
];

/// Synthesize signals from a crawl report.
///
/// `host_in_tranco` triggers the filtering rule for reputable hosts.
pub fn synthesize(
    report: &CrawlReport,
    original_url: &str,
    host_in_tranco: bool,
    table: &WeightsTable,
) -> Vec<Signal> {
    let mut signals = Vec::new();
    let evidence = &report.evidence;

    let original_host = host_of(original_url);
    let final_host = host_of(&report.final_url);

    if !final_host.is_empty() && !original_host.is_empty() && final_host != original_host {
        signals.push(Signal::new(
            weights::REDIRECT_TO_DIFFERENT_DOMAIN,
            Severity::Medium,
            table.get(weights::REDIRECT_TO_DIFFERENT_DOMAIN),
            json!({
                "original_domain": original_host,
                "final_domain": final_host,
                "redirect_count": report.redirect_chain.len(),
            }),
            format!("La URL redirige a un dominio diferente: {original_host} -> {final_host}."),
        ));
    }

    if report.redirect_chain.len() > 3 {
        signals.push(Signal::new(
            weights::EXCESSIVE_REDIRECTS,
            Severity::Medium,
            table.get(weights::EXCESSIVE_REDIRECTS),
            json!({
                "redirect_count": report.redirect_chain.len(),
                "chain": report.redirect_chain.iter().take(5).collect::<Vec<_>>(),
            }),
            format!(
                "La URL encadena {} redirecciones, algo inusual en sitios legitimos.",
                report.redirect_chain.len()
            ),
        ));
    }

    if evidence.ssl_error {
        signals.push(Signal::new(
            weights::SSL_CERTIFICATE_ERROR,
            Severity::High,
            table.get(weights::SSL_CERTIFICATE_ERROR),
            json!({}),
            "Error de certificado SSL: el sitio no tiene una conexion segura valida.",
        ));
    }

    if evidence.form_submits_externally {
        signals.push(Signal::new(
            weights::FORM_SUBMITS_EXTERNALLY,
            Severity::High,
            table.get(weights::FORM_SUBMITS_EXTERNALLY),
            json!({ "form_actions": evidence.form_actions }),
            "El formulario envia datos a un dominio diferente al de la pagina.",
        ));
    }

    if evidence.has_login_form {
        signals.push(Signal::new(
            weights::LOGIN_FORM_DETECTED,
            Severity::Medium,
            table.get(weights::LOGIN_FORM_DETECTED),
            json!({
                "has_password": evidence.has_password_field,
                "form_actions": evidence.form_actions.iter().take(3).collect::<Vec<_>>(),
            }),
            "Se detecto un formulario de login. Verifique que sea el sitio oficial.",
        ));
    }

    if evidence.has_credit_card_field {
        signals.push(Signal::new(
            weights::CREDIT_CARD_FORM,
            Severity::High,
            table.get(weights::CREDIT_CARD_FORM),
            json!({}),
            "Se detectaron campos para datos de tarjeta de credito.",
        ));
    }

    if evidence.has_suspicious_inputs {
        signals.push(Signal::new(
            weights::SUSPICIOUS_INPUT_FIELDS,
            Severity::High,
            table.get(weights::SUSPICIOUS_INPUT_FIELDS),
            json!({}),
            "Se detectaron campos para datos sensibles (SSN, cedula, PIN).",
        ));
    }

    if !evidence.brands_detected.is_empty() {
        signals.push(Signal::new(
            weights::BRAND_CONTENT_DETECTED,
            Severity::High,
            table.get(weights::BRAND_CONTENT_DETECTED),
            json!({ "brands": evidence.brands_detected }),
            format!(
                "El contenido menciona marcas conocidas ({}) pero NO es el sitio oficial.",
                evidence.brands_detected.join(", ")
            ),
        ));
    }

    if evidence.phishing_phrases_count > 0 {
        signals.push(Signal::new(
            weights::PHISHING_TEXT_DETECTED,
            Severity::High,
            table.get(weights::PHISHING_TEXT_DETECTED),
            json!({ "patterns_found": evidence.phishing_phrases_count }),
            "Se detectaron frases tipicas de phishing (verificar cuenta, actividad inusual).",
        ));
    }

    if evidence.is_parking_page {
        signals.push(Signal::new(
            weights::PARKING_PAGE,
            Severity::Medium,
            table.get(weights::PARKING_PAGE),
            json!({}),
            "La pagina es de parking o el dominio esta en venta.",
        ));
    }

    if evidence.iframe_count > 3 {
        signals.push(Signal::new(
            weights::EXCESSIVE_IFRAMES,
            Severity::Low,
            table.get(weights::EXCESSIVE_IFRAMES),
            json!({ "count": evidence.iframe_count }),
            format!(
                "La pagina tiene {} iframes que pueden ocultar contenido.",
                evidence.iframe_count
            ),
        ));
    }

    if evidence.hidden_input_count > 5 {
        signals.push(Signal::new(
            weights::EXCESSIVE_HIDDEN_INPUTS,
            Severity::Low,
            table.get(weights::EXCESSIVE_HIDDEN_INPUTS),
            json!({ "count": evidence.hidden_input_count }),
            format!("La pagina tiene {} campos ocultos.", evidence.hidden_input_count),
        ));
    }

    if host_in_tranco {
        signals.retain(|s| CRITICAL_IDS.contains(&s.id.as_str()));
    }

    signals
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::crawler::{CrawlOutcome, CrawlReport};
    use crate::logic::crawler::evidence::CrawlEvidence;

    fn report(evidence: CrawlEvidence) -> CrawlReport {
        CrawlReport {
            outcome: CrawlOutcome::Ok,
            status: 200,
            final_url: "https://site.test/landing".into(),
            redirect_chain: vec![],
            html_fingerprint: "abcd".into(),
            evidence,
            error: None,
            duration_ms: 10,
        }
    }

    #[test]
    fn test_login_and_phrases_signals() {
        let mut evidence = CrawlEvidence::default();
        evidence.has_login_form = true;
        evidence.has_password_field = true;
        evidence.phishing_phrases_count = 2;

        let table = WeightsTable::default();
        let signals = synthesize(&report(evidence), "https://site.test/", false, &table);
        let ids: Vec<_> = signals.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&weights::LOGIN_FORM_DETECTED));
        assert!(ids.contains(&weights::PHISHING_TEXT_DETECTED));
    }

    #[test]
    fn test_redirect_to_other_domain() {
        let mut r = report(CrawlEvidence::default());
        r.final_url = "https://other-domain.test/".into();
        let signals = synthesize(&r, "https://site.test/", false, &WeightsTable::default());
        assert!(signals
            .iter()
            .any(|s| s.id == weights::REDIRECT_TO_DIFFERENT_DOMAIN));
    }

    #[test]
    fn test_tranco_filter_keeps_only_critical() {
        let mut evidence = CrawlEvidence::default();
        evidence.has_login_form = true;
        evidence.ssl_error = true;
        evidence.phishing_phrases_count = 3;
        evidence.form_submits_externally = true;

        let table = WeightsTable::default();
        let signals = synthesize(&report(evidence), "https://site.test/", true, &table);
        let ids: Vec<_> = signals.iter().map(|s| s.id.as_str()).collect();

        assert!(ids.contains(&weights::SSL_CERTIFICATE_ERROR));
        assert!(ids.contains(&weights::FORM_SUBMITS_EXTERNALLY));
        assert!(!ids.contains(&weights::LOGIN_FORM_DETECTED));
        assert!(!ids.contains(&weights::PHISHING_TEXT_DETECTED));
    }

    #[test]
    fn test_weights_come_from_table() {
        let mut evidence = CrawlEvidence::default();
        evidence.ssl_error = true;
        evidence.has_credit_card_field = true;

        let table = WeightsTable::default();
        let signals = synthesize(&report(evidence), "https://site.test/", false, &table);
        for s in &signals {
            assert_eq!(s.weight, table.get(&s.id));
        }
    }
}
