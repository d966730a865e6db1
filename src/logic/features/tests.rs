//! Feature extraction tests over real normalized contexts.

use super::extract::extract;
use super::layout::FEATURE_COUNT;
use crate::logic::catalog::Catalog;
use crate::logic::intel::tranco::TrancoVerdict;
use crate::logic::safety::validate_and_normalize;

const THRESHOLD: u32 = 100_000;

async fn features_for(url: &str) -> super::FeatureVector {
    let ctx = validate_and_normalize(url).await.expect("valid url");
    extract(&ctx, &Catalog::default(), None, THRESHOLD)
}

#[tokio::test]
async fn test_vector_is_total_and_finite() {
    for url in [
        "https://www.google.com",
        "http://8.8.8.8/admin?a=1&b=2",
        "https://xn--pypal-4ve.com/login",
        "http://a.b.c.d.e.example.xyz/deep/path?x=1",
        "https://bit.ly/abcd1234",
    ] {
        let f = features_for(url).await;
        let arr = f.to_array();
        assert_eq!(arr.len(), FEATURE_COUNT);
        assert!(arr.iter().all(|v| v.is_finite()), "non-finite for {url}");
    }
}

#[tokio::test]
async fn test_lexical_counts() {
    let f = features_for("https://sub.example.com/path/to?a=1&b=22").await;
    assert_eq!(f.url_length, "https://sub.example.com/path/to?a=1&b=22".len() as u32);
    assert_eq!(f.domain_length, "example.com".len() as u32);
    assert_eq!(f.path_length, "/path/to".len() as u32);
    assert_eq!(f.num_digits, 3);
    assert_eq!(f.num_subdomains, 1);
    assert_eq!(f.num_params, 2);
    assert!(f.has_https);
    assert!(!f.has_port);
    assert!(!f.contains_ip);
}

#[tokio::test]
async fn test_ip_and_port_flags() {
    let f = features_for("http://8.8.8.8:8080/x").await;
    assert!(f.contains_ip);
    assert!(f.has_port);
    assert!(!f.has_https);
    assert_eq!(f.num_subdomains, 0);
}

#[tokio::test]
async fn test_punycode_flag() {
    let f = features_for("https://xn--pypal-4ve.com/signin").await;
    assert!(f.has_punycode);
    assert!(f.brand_impersonation, "punycode paypal lookalike must flag");
    assert_eq!(f.impersonated_brand, Some("paypal"));
}

#[tokio::test]
async fn test_shortener_and_paste_detection() {
    let f = features_for("https://bit.ly/abcd1234").await;
    assert!(f.shortener_detected);
    assert!(!f.paste_service_detected);

    let f = features_for("https://pastebin.com/raw/xyz").await;
    assert!(f.paste_service_detected);
    assert!(!f.shortener_detected);

    // substring traps must not fire
    let f = features_for("https://www.microsoft.com/es-co").await;
    assert!(!f.shortener_detected);
}

#[tokio::test]
async fn test_suspicious_words_and_official_exclusion() {
    // brand word on its own canonical domain does not count
    let f = features_for("https://www.google.com/search").await;
    assert_eq!(f.has_suspicious_words, 0, "matched: {:?}", f.matched_words);

    // the same word elsewhere counts
    let f = features_for("http://google-login.example.xyz/verify").await;
    assert!(f.has_suspicious_words >= 2, "matched: {:?}", f.matched_words);
}

#[tokio::test]
async fn test_monotonicity_in_suspicious_words() {
    // adding keywords never lowers the count (holding the rest fixed)
    let f1 = features_for("https://example-site.test/page").await;
    let f2 = features_for("https://example-site.test/page-login").await;
    let f3 = features_for("https://example-site.test/page-login-verify").await;
    assert!(f2.has_suspicious_words >= f1.has_suspicious_words);
    assert!(f3.has_suspicious_words >= f2.has_suspicious_words);
}

#[tokio::test]
async fn test_brand_impersonation_variants() {
    // lookalike token inside a composite label
    let f = features_for("http://paypa1-secure.xyz/login").await;
    assert!(f.brand_impersonation);
    assert_eq!(f.impersonated_brand, Some("paypal"));

    // brand as non-final subdomain
    let f = features_for("https://paypal.example.xyz/account").await;
    assert!(f.brand_impersonation);

    // the real domain never flags
    let f = features_for("https://www.paypal.com/signin").await;
    assert!(!f.brand_impersonation);

    // unrelated domains never flag
    let f = features_for("https://www.wikipedia.org/wiki").await;
    assert!(!f.brand_impersonation);
}

#[tokio::test]
async fn test_risky_tld_and_subdomains() {
    let f = features_for("http://a.b.c.d.phish.xyz/x").await;
    assert!(f.tld_risk);
    assert_eq!(f.num_subdomains, 4);
    assert!(f.excessive_subdomains);

    let f = features_for("https://www.example.com/page").await;
    assert!(!f.tld_risk);
    assert!(!f.excessive_subdomains);
}

#[tokio::test]
async fn test_digit_ratio_and_special_chars() {
    let f = features_for("http://123456789012.example.com/9999").await;
    assert!(f.digit_ratio > 0.3);

    let f = features_for("https://example.com/p@th%20{x}").await;
    assert!(f.has_at_symbol);
    assert!(f.special_chars >= 1);
}

#[tokio::test]
async fn test_tranco_placeholders() {
    let ctx = validate_and_normalize("https://www.google.com")
        .await
        .unwrap();
    let catalog = Catalog::default();

    // no lookup ran → placeholders stay zero
    let f = extract(&ctx, &catalog, None, THRESHOLD);
    assert!(!f.in_tranco);
    assert_eq!(f.tranco_rank, 0.0);

    // rank 1 → normalized rank approaches 1.0
    let verdict = TrancoVerdict { rank: Some(1), in_top_k: true };
    let f = extract(&ctx, &catalog, Some(&verdict), THRESHOLD);
    assert!(f.in_tranco);
    assert!(f.tranco_rank > 0.999);

    // not listed → in_tranco stays false
    let verdict = TrancoVerdict { rank: None, in_top_k: false };
    let f = extract(&ctx, &catalog, Some(&verdict), THRESHOLD);
    assert!(!f.in_tranco);
    assert_eq!(f.tranco_rank, 0.0);
}
