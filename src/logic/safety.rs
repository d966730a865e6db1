//! URL Normalizer & Safety Gate
//!
//! Canonicalizes the input URL and rejects SSRF-hazardous targets before
//! anything downstream touches the network. The gate resolves hostnames
//! through `tokio::net::lookup_host`, the same getaddrinfo path the
//! downstream reqwest clients use, so the address set checked here is the
//! address set the fetchers will connect to.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::Serialize;
use url::Url;

use crate::constants::{URL_MAX_LEN, URL_MIN_LEN};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    #[error("la URL debe tener entre {URL_MIN_LEN} y {URL_MAX_LEN} bytes (tiene {0})")]
    BadLength(usize),

    #[error("URL malformada: {0}")]
    Malformed(String),

    #[error("protocolo no permitido: {0}")]
    BadScheme(String),

    #[error("no se pudo extraer el hostname")]
    MissingHost,

    #[error("{0}")]
    BlockedTarget(String),
}

// ============================================================================
// URL CONTEXT
// ============================================================================

/// Request-scoped canonical view of the input URL.
/// Immutable after normalization; dropped at request end.
#[derive(Debug, Clone, Serialize)]
pub struct UrlContext {
    /// Exactly what the client sent
    pub original: String,
    /// Canonical serialized form
    pub normalized: String,
    pub scheme: String,
    /// Lowercased host, trailing dot stripped, IDNA already applied
    pub host: String,
    /// Effective second-level (registrable) domain
    pub registrable_domain: String,
    /// Explicit non-default port, when present
    pub port: Option<u16>,
    pub path: String,
    pub query: String,
    /// Host is an IP literal
    pub is_ip_literal: bool,
    /// Input host needed IDNA/Punycode conversion
    pub required_punycode: bool,
}

impl UrlContext {
    /// Effective top-level domain (last label of the host).
    pub fn tld(&self) -> &str {
        self.host.rsplit('.').next().unwrap_or("")
    }
}

// ============================================================================
// BLOCKED TARGETS
// ============================================================================

/// Hostnames that are never fetched regardless of resolution
const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "metadata.google.internal",
    "metadata.internal",
];

/// True for loopback, link-local, unique-local, private, multicast,
/// broadcast, unspecified and otherwise reserved addresses.
pub fn is_forbidden_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_forbidden_v4(mapped);
            }
            is_forbidden_v6(v6)
        }
    }
}

fn is_forbidden_v4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local() // includes 169.254.169.254 cloud metadata
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || octets[0] == 0
        // carrier-grade NAT 100.64.0.0/10
        || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
        // benchmark 198.18.0.0/15
        || (octets[0] == 198 && (octets[1] & 0xfe) == 18)
        // reserved 240.0.0.0/4
        || octets[0] >= 240
}

fn is_forbidden_v6(ip: Ipv6Addr) -> bool {
    let seg = ip.segments();
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // unique-local fc00::/7
        || (seg[0] & 0xfe00) == 0xfc00
        // link-local fe80::/10
        || (seg[0] & 0xffc0) == 0xfe80
}

// ============================================================================
// NORMALIZATION + GATE
// ============================================================================

/// Validate, normalize and SSRF-check a raw URL string.
///
/// Total order of checks: length → parse → scheme → host shape → blocked
/// hostname → literal-IP ranges → resolved-address ranges. DNS failure is
/// not fatal (brand-new domains may not resolve yet); forbidden resolved
/// addresses are.
pub async fn validate_and_normalize(raw: &str) -> Result<UrlContext, SafetyError> {
    let trimmed = raw.trim();
    let len = trimmed.len();
    if !(URL_MIN_LEN..=URL_MAX_LEN).contains(&len) {
        return Err(SafetyError::BadLength(len));
    }

    let mut parsed =
        Url::parse(trimmed).map_err(|e| SafetyError::Malformed(e.to_string()))?;

    let scheme = parsed.scheme().to_string();
    if scheme != "http" && scheme != "https" {
        return Err(SafetyError::BadScheme(scheme));
    }

    // The url crate already lowercases scheme and host, applies IDNA and
    // drops default ports. Trailing host dots are ours to strip.
    let raw_host = parsed
        .host_str()
        .ok_or(SafetyError::MissingHost)?
        .to_string();
    if let Some(stripped) = raw_host.strip_suffix('.') {
        let stripped = stripped.to_string();
        parsed
            .set_host(Some(stripped.as_str()))
            .map_err(|e| SafetyError::Malformed(e.to_string()))?;
    }
    // Drop fragments: they never reach the server and break idempotence.
    parsed.set_fragment(None);

    let host = parsed
        .host_str()
        .ok_or(SafetyError::MissingHost)?
        .to_string();

    if BLOCKED_HOSTNAMES.contains(&host.as_str()) {
        return Err(SafetyError::BlockedTarget(format!(
            "hostname bloqueado: {host}"
        )));
    }

    let is_ip_literal = matches!(
        parsed.host(),
        Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_))
    );

    if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        if is_forbidden_ip(ip) {
            return Err(SafetyError::BlockedTarget(format!(
                "IP privada o reservada: {ip}"
            )));
        }
    } else {
        // Resolve through the same system resolver the fetchers use and
        // refuse hosts that map into forbidden ranges.
        let port = parsed.port_or_known_default().unwrap_or(443);
        if let Ok(addrs) = tokio::net::lookup_host((host.as_str(), port)).await {
            for addr in addrs {
                if is_forbidden_ip(addr.ip()) {
                    return Err(SafetyError::BlockedTarget(format!(
                        "{host} resuelve a una IP privada: {}",
                        addr.ip()
                    )));
                }
            }
        }
    }

    let required_punycode = host.split('.').any(|l| l.starts_with("xn--"))
        && !trimmed.to_lowercase().contains("xn--");

    Ok(UrlContext {
        original: raw.to_string(),
        normalized: parsed.to_string(),
        scheme,
        registrable_domain: registrable_domain(&host),
        port: parsed.port(),
        path: parsed.path().to_string(),
        query: parsed.query().unwrap_or("").to_string(),
        host,
        is_ip_literal,
        required_punycode,
    })
}

/// Effective second-level domain. Handles the common multi-part public
/// suffixes the catalog's markets use; anything else is last-two-labels.
pub fn registrable_domain(host: &str) -> String {
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return host.to_string();
    }

    const MULTIPART_SUFFIXES: &[&str] = &[
        "com.co", "gov.co", "edu.co", "net.co", "org.co", "co.uk", "org.uk",
        "ac.uk", "com.br", "com.mx", "com.ar", "com.au", "co.jp", "co.in",
        "com.cn",
    ];

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }

    let last_two = labels[labels.len() - 2..].join(".");
    if MULTIPART_SUFFIXES.contains(&last_two.as_str()) && labels.len() >= 3 {
        return labels[labels.len() - 3..].join(".");
    }
    last_two
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn normalize(raw: &str) -> Result<UrlContext, SafetyError> {
        validate_and_normalize(raw).await
    }

    #[tokio::test]
    async fn test_length_boundaries() {
        // exactly 10 bytes is accepted
        assert!(normalize("http://a.b").await.is_ok());
        // 9 bytes is rejected
        assert!(matches!(
            normalize("http://ab").await,
            Err(SafetyError::BadLength(9))
        ));
        // exactly 2048 accepted, 2049 rejected
        let base = "https://example.com/";
        let path_len = 2048 - base.len();
        let ok = format!("{base}{}", "a".repeat(path_len));
        assert_eq!(ok.len(), 2048);
        assert!(normalize(&ok).await.is_ok());
        let too_long = format!("{base}{}", "a".repeat(path_len + 1));
        assert!(matches!(
            normalize(&too_long).await,
            Err(SafetyError::BadLength(2049))
        ));
    }

    #[tokio::test]
    async fn test_scheme_allowlist() {
        assert!(matches!(
            normalize("ftp://example.com").await,
            Err(SafetyError::BadScheme(_))
        ));
        assert!(matches!(
            normalize("javascript:alert(1)//aa").await,
            Err(SafetyError::BadScheme(_)) | Err(SafetyError::Malformed(_)) | Err(SafetyError::MissingHost)
        ));
    }

    #[tokio::test]
    async fn test_private_targets_blocked() {
        for url in [
            "http://192.168.1.1/admin",
            "http://10.0.0.1/x",
            "http://172.16.0.1/x",
            "http://172.31.255.1/x",
            "http://127.0.0.1/path",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/path",
            "http://[fe80::1]/path",
            "http://[fc00::1]/path",
            "http://localhost/admin",
            "http://0.0.0.0/xyz",
        ] {
            assert!(
                matches!(normalize(url).await, Err(SafetyError::BlockedTarget(_))),
                "expected blocked: {url}"
            );
        }
    }

    #[tokio::test]
    async fn test_public_ip_literal_allowed() {
        let ctx = normalize("http://8.8.8.8/path").await.unwrap();
        assert!(ctx.is_ip_literal);
        assert_eq!(ctx.host, "8.8.8.8");
    }

    #[tokio::test]
    async fn test_normalization_canonicalizes() {
        let ctx = normalize("HTTP://ExAmPlE.CoM.:80/Path?q=1#frag")
            .await
            .unwrap();
        assert_eq!(ctx.scheme, "http");
        assert_eq!(ctx.host, "example.com");
        assert_eq!(ctx.port, None);
        assert_eq!(ctx.normalized, "http://example.com/Path?q=1");
    }

    #[tokio::test]
    async fn test_normalization_idempotent() {
        for raw in [
            "HTTPS://WWW.Example.COM/a/B?x=1",
            "http://example.com.:80/",
            "https://bücher.example/p",
        ] {
            let once = normalize(raw).await.unwrap();
            let twice = normalize(&once.normalized).await.unwrap();
            assert_eq!(once.normalized, twice.normalized);
        }
    }

    #[tokio::test]
    async fn test_idna_flag() {
        let ctx = normalize("https://bücher.example/p").await.unwrap();
        assert!(ctx.required_punycode);
        assert!(ctx.host.starts_with("xn--"));

        // already-punycode input is not flagged as converted
        let ctx = normalize("https://xn--bcher-kva.example/p").await.unwrap();
        assert!(!ctx.required_punycode);
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(registrable_domain("www.google.com"), "google.com");
        assert_eq!(registrable_domain("a.b.c.example.org"), "example.org");
        assert_eq!(registrable_domain("nequi.com.co"), "nequi.com.co");
        assert_eq!(registrable_domain("www.nequi.com.co"), "nequi.com.co");
        assert_eq!(registrable_domain("bit.ly"), "bit.ly");
        assert_eq!(registrable_domain("8.8.8.8"), "8.8.8.8");
    }

    #[test]
    fn test_forbidden_ranges() {
        for ip in [
            "127.0.0.1",
            "10.1.2.3",
            "192.168.0.5",
            "172.20.1.1",
            "169.254.169.254",
            "224.0.0.1",
            "255.255.255.255",
            "100.64.0.1",
            "198.18.0.1",
            "240.0.0.1",
            "::1",
            "fe80::1",
            "fd12::1",
        ] {
            assert!(is_forbidden_ip(ip.parse().unwrap()), "expected forbidden: {ip}");
        }
        for ip in ["8.8.8.8", "1.1.1.1", "93.184.216.34", "2606:4700::1111"] {
            assert!(!is_forbidden_ip(ip.parse().unwrap()), "expected allowed: {ip}");
        }
    }
}
