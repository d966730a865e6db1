//! Brand & Keyword Catalog
//!
//! Static reference data for the scoring engine: impersonated brands with
//! their canonical domains, suspicious keywords, risky TLDs, shortener and
//! paste-service domains, hosting platforms and the trusted-domain
//! allowlist. Loaded once at boot into the `Engine`; never mutated at
//! runtime.

// ============================================================================
// RAW LISTS
// ============================================================================

/// Keywords common in phishing and malware-distribution URLs
pub const SUSPICIOUS_WORDS: &[&str] = &[
    "login", "signin", "verify", "update", "secure", "account", "password",
    "confirm", "banking", "suspend", "expire", "wallet", "alert", "unusual",
    "locked", "unlock", "validate", "authenticate", "credential", "urgent",
    // frequently impersonated brands double as keywords
    "paypal", "netflix", "amazon", "apple", "microsoft", "google", "facebook",
    "instagram", "whatsapp", "telegram",
    // pirated-software bait (malware vectors)
    "crack", "keygen", "serial", "activator", "kms", "warez", "nulled",
    "cracked", "torrent", "free-download", "full-version",
];

/// URL shortener domains (destination-hiding services)
pub const SHORTENERS: &[&str] = &[
    "bit.ly", "tinyurl.com", "goo.gl", "t.co", "ow.ly", "is.gd", "buff.ly",
    "adf.ly", "bit.do", "mcaf.ee", "su.pr", "rebrand.ly", "cutt.ly",
    "shorturl.at", "tiny.cc", "j.mp", "v.gd", "rb.gy", "clck.ru", "s.id",
    "short.io", "soo.gd", "acortar.link",
];

/// Paste services (common malware distribution vectors)
pub const PASTE_SERVICES: &[&str] = &[
    "pastebin.com", "paste.ee", "justpaste.it", "ghostbin.com", "paste2.org",
    "hastebin.com", "dpaste.org", "rentry.co", "privatebin.net",
    "controlc.com", "paste.mozilla.org", "paste.rs",
];

/// Hosting platforms where anyone can publish content. The domain itself is
/// reputable, so these never receive the Tranco bonus.
pub const HOSTING_PLATFORMS: &[&str] = &[
    "appspot.com", "github.io", "githubusercontent.com", "gitlab.io",
    "herokuapp.com", "netlify.app", "vercel.app", "pages.dev", "web.app",
    "firebaseapp.com", "azurewebsites.net", "cloudfront.net",
    "s3.amazonaws.com", "workers.dev", "glitch.me", "repl.co", "surge.sh",
    "fly.dev", "deno.dev", "blogspot.com", "wordpress.com", "wixsite.com",
    "weebly.com", "ngrok.io", "trycloudflare.com",
];

/// TLDs with high abuse rates
pub const RISKY_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "club", "online", "site",
    "work", "click", "link", "info", "pw", "cc", "ws", "buzz", "surf", "icu",
    "monster", "cam", "biz", "space", "website",
];

/// Brands frequently impersonated, with their canonical domains
pub const KNOWN_BRANDS: &[(&str, &str)] = &[
    ("paypal", "paypal.com"),
    ("amazon", "amazon.com"),
    ("apple", "apple.com"),
    ("microsoft", "microsoft.com"),
    ("google", "google.com"),
    ("facebook", "facebook.com"),
    ("netflix", "netflix.com"),
    ("instagram", "instagram.com"),
    ("whatsapp", "whatsapp.com"),
    ("twitter", "twitter.com"),
    ("linkedin", "linkedin.com"),
    ("dropbox", "dropbox.com"),
    ("spotify", "spotify.com"),
    ("chase", "chase.com"),
    ("wellsfargo", "wellsfargo.com"),
    ("bankofamerica", "bankofamerica.com"),
    ("ebay", "ebay.com"),
    ("walmart", "walmart.com"),
    ("adobe", "adobe.com"),
    ("zoom", "zoom.us"),
    ("slack", "slack.com"),
    ("github", "github.com"),
    ("youtube", "youtube.com"),
    ("tiktok", "tiktok.com"),
    ("discord", "discord.com"),
    ("telegram", "telegram.org"),
    ("bancolombia", "bancolombia.com"),
    ("davivienda", "davivienda.com"),
    ("nequi", "nequi.com.co"),
    ("daviplata", "daviplata.com"),
    ("mercadolibre", "mercadolibre.com"),
    ("rappi", "rappi.com"),
];

/// Verified legitimate domains (fallback allowlist when Tranco is offline)
pub const TRUSTED_DOMAINS: &[&str] = &[
    "google.com", "youtube.com", "facebook.com", "amazon.com",
    "microsoft.com", "apple.com", "netflix.com", "twitter.com",
    "instagram.com", "linkedin.com", "github.com", "stackoverflow.com",
    "wikipedia.org", "reddit.com", "whatsapp.com", "telegram.org",
    "paypal.com", "dropbox.com", "spotify.com", "zoom.us", "slack.com",
    "bbc.com", "cnn.com", "nytimes.com", "gmail.com", "outlook.com",
    "bancolombia.com", "davivienda.com", "nequi.com.co", "daviplata.com",
    "pse.com.co", "dian.gov.co", "gov.co",
];

// ============================================================================
// CATALOG
// ============================================================================

/// Static reference data owned by the Engine.
///
/// A value (not a global) so tests can instantiate isolated engines.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub suspicious_words: &'static [&'static str],
    pub shorteners: &'static [&'static str],
    pub paste_services: &'static [&'static str],
    pub hosting_platforms: &'static [&'static str],
    pub risky_tlds: &'static [&'static str],
    pub known_brands: &'static [(&'static str, &'static str)],
    pub trusted_domains: &'static [&'static str],
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            suspicious_words: SUSPICIOUS_WORDS,
            shorteners: SHORTENERS,
            paste_services: PASTE_SERVICES,
            hosting_platforms: HOSTING_PLATFORMS,
            risky_tlds: RISKY_TLDS,
            known_brands: KNOWN_BRANDS,
            trusted_domains: TRUSTED_DOMAINS,
        }
    }
}

impl Catalog {
    /// True when `host` is one of `domains` or a subdomain of one.
    /// `microsoft.com` must NOT match the shorter list entry `t.co`.
    pub fn host_matches(host: &str, domains: &[&str]) -> bool {
        domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }

    pub fn is_shortener(&self, host: &str) -> bool {
        Self::host_matches(host, self.shorteners)
    }

    pub fn is_paste_service(&self, host: &str) -> bool {
        Self::host_matches(host, self.paste_services)
    }

    pub fn is_hosting_platform(&self, host: &str) -> bool {
        Self::host_matches(host, self.hosting_platforms)
    }

    pub fn is_trusted(&self, host: &str) -> bool {
        Self::host_matches(host, self.trusted_domains)
    }

    pub fn is_risky_tld(&self, tld: &str) -> bool {
        self.risky_tlds.contains(&tld)
    }

    /// Canonical domain for a brand, when the brand is cataloged.
    pub fn official_domain(&self, brand: &str) -> Option<&'static str> {
        self.known_brands
            .iter()
            .find(|(b, _)| *b == brand)
            .map(|(_, d)| *d)
    }

    /// True when `host` is the brand's canonical domain or a subdomain of
    /// it (allows legitimate hosts like `mail.google.com`).
    pub fn is_official_domain(&self, host: &str, brand: &str) -> bool {
        match self.official_domain(brand) {
            Some(official) => host == official || host.ends_with(&format!(".{official}")),
            None => false,
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
    fn test_shortener_exact_and_subdomain() {
        let c = Catalog::default();
        assert!(c.is_shortener("bit.ly"));
        assert!(c.is_shortener("www.bit.ly"));
        // "microsoft.com" contains "t.co" as a substring but is no shortener
        assert!(!c.is_shortener("microsoft.com"));
    }

    #[test]
    fn test_official_domain_allows_subdomains() {
        let c = Catalog::default();
        assert!(c.is_official_domain("google.com", "google"));
        assert!(c.is_official_domain("mail.google.com", "google"));
        assert!(!c.is_official_domain("google.com.evil.xyz", "google"));
    }

    #[test]
    fn test_trusted_list() {
        let c = Catalog::default();
        assert!(c.is_trusted("github.com"));
        assert!(c.is_trusted("gist.github.com"));
        assert!(!c.is_trusted("github.com.phish.top"));
    }

    #[test]
    fn test_risky_tld() {
        let c = Catalog::default();
        assert!(c.is_risky_tld("xyz"));
        assert!(c.is_risky_tld("tk"));
        assert!(!c.is_risky_tld("com"));
    }
}
