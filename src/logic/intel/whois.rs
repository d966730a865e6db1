//! Domain age client (RDAP)
//!
//! Registration age powers the DOMAIN_TOO_NEW / DOMAIN_ESTABLISHED rules.
//! Lookups go over RDAP (the IANA WHOIS successor: plain JSON over HTTPS,
//! bootstrap via rdap.org) with a 24h/6h cache-through per registrable
//! domain.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::cache::{CacheStats, IntelCache};
use crate::constants::{
    INTEL_CACHE_CAPACITY, WHOIS_NEGATIVE_TTL, WHOIS_TIMEOUT, WHOIS_TTL,
};

const RDAP_BOOTSTRAP: &str = "https://rdap.org/domain";

// ============================================================================
// PAYLOAD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisVerdict {
    /// Days since registration; `None` when the registry omits the event
    pub age_days: Option<i64>,
    pub registrar: Option<String>,
    /// Registration data was retrieved for the domain
    pub available: bool,
}

#[derive(Debug, Deserialize)]
struct RdapResponse {
    #[serde(default)]
    events: Vec<RdapEvent>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction", default)]
    event_action: String,
    #[serde(rename = "eventDate", default)]
    event_date: String,
}

#[derive(Debug, Deserialize)]
struct RdapEntity {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(rename = "vcardArray", default)]
    vcard_array: serde_json::Value,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct WhoisClient {
    http: reqwest::Client,
    cache: IntelCache<WhoisVerdict>,
}

impl WhoisClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(WHOIS_TIMEOUT)
                .user_agent(format!("alerta-link/{}", crate::constants::APP_VERSION))
                .build()
                .unwrap_or_default(),
            cache: IntelCache::with_positivity(
                "whois",
                INTEL_CACHE_CAPACITY,
                WHOIS_TTL,
                WHOIS_NEGATIVE_TTL,
                |v: &WhoisVerdict| v.age_days.is_some(),
            ),
        }
    }

    /// Registration age for a registrable domain. `None` = unavailable.
    pub async fn lookup(&self, registrable_domain: &str) -> Option<WhoisVerdict> {
        let key = registrable_domain.to_lowercase();
        if key.is_empty() || key.parse::<std::net::IpAddr>().is_ok() {
            return None;
        }

        if let Some(value) = self.cache.peek(&key) {
            return value;
        }

        self.cache
            .get_or_fetch(&key, || self.fetch(key.clone()))
            .await
    }

    async fn fetch(&self, domain: String) -> Option<WhoisVerdict> {
        let url = format!("{RDAP_BOOTSTRAP}/{domain}");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/rdap+json")
            .send()
            .await
            .map_err(|e| tracing::debug!("RDAP request failed for {domain}: {e}"))
            .ok()?;

        if response.status().as_u16() == 404 {
            // Not registered (or registry without RDAP): no age to report
            return Some(WhoisVerdict {
                age_days: None,
                registrar: None,
                available: false,
            });
        }
        if !response.status().is_success() {
            tracing::debug!("RDAP returned {} for {domain}", response.status());
            return None;
        }

        let body: RdapResponse = response
            .json()
            .await
            .map_err(|e| tracing::debug!("RDAP parse error for {domain}: {e}"))
            .ok()?;

        let age_days = body
            .events
            .iter()
            .find(|e| e.event_action == "registration")
            .and_then(|e| DateTime::parse_from_rfc3339(&e.event_date).ok())
            .map(|registered| (Utc::now() - registered.with_timezone(&Utc)).num_days());

        let registrar = body
            .entities
            .iter()
            .find(|e| e.roles.iter().any(|r| r == "registrar"))
            .and_then(|e| vcard_fn(&e.vcard_array));

        if let Some(age) = age_days {
            tracing::info!("WHOIS: {domain} registered {age} days ago");
        }

        Some(WhoisVerdict {
            age_days,
            registrar,
            available: true,
        })
    }

    /// Fresh cached verdict, without going upstream. Used when the
    /// request deadline has expired.
    pub fn cached(&self, registrable_domain: &str) -> Option<WhoisVerdict> {
        self.cache.peek(&registrable_domain.to_lowercase()).flatten()
    }

    /// Prime the cache (tests, warm-up jobs).
    pub fn prime(&self, registrable_domain: &str, verdict: Option<WhoisVerdict>) {
        self.cache.insert(&registrable_domain.to_lowercase(), verdict);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the formatted name from a jCard (["vcard", [["fn", {}, "text",
/// "Registrar Inc."], ...]]).
fn vcard_fn(vcard: &serde_json::Value) -> Option<String> {
    vcard
        .get(1)?
        .as_array()?
        .iter()
        .filter_map(|prop| prop.as_array())
        .find(|prop| prop.first().and_then(|p| p.as_str()) == Some("fn"))
        .and_then(|prop| prop.get(3))
        .and_then(|name| name.as_str())
        .map(|s| s.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_primed_age_served_from_cache() {
        let c = WhoisClient::new();
        c.prime(
            "example-new.test",
            Some(WhoisVerdict {
                age_days: Some(5),
                registrar: Some("Test Registrar".into()),
                available: true,
            }),
        );
        let v = c.lookup("Example-New.TEST").await.expect("cached");
        assert_eq!(v.age_days, Some(5));
    }

    #[tokio::test]
    async fn test_ip_literal_is_never_queried() {
        let c = WhoisClient::new();
        assert_eq!(c.lookup("8.8.8.8").await, None);
    }

    #[test]
    fn test_vcard_fn_extraction() {
        let vcard = json!([
            "vcard",
            [
                ["version", {}, "text", "4.0"],
                ["fn", {}, "text", "GoDaddy.com, LLC"]
            ]
        ]);
        assert_eq!(vcard_fn(&vcard), Some("GoDaddy.com, LLC".to_string()));
        assert_eq!(vcard_fn(&json!(null)), None);
    }
}
