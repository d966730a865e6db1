//! Tranco List client
//!
//! Queries domain popularity ranks from the Tranco API with a local
//! cache-through (7d listed / 1d not-listed). Failures never propagate:
//! they surface as `None` and are recorded in the verdict's
//! `apis_consulted` map by the orchestrator.

use serde::Deserialize;

use super::cache::{CacheStats, IntelCache};
use crate::config::Config;
use crate::constants::{
    INTEL_CACHE_CAPACITY, TRANCO_NEGATIVE_TTL, TRANCO_TIMEOUT, TRANCO_TTL,
};

const TRANCO_API_BASE: &str = "https://tranco-list.eu/api";

// ============================================================================
// PAYLOAD
// ============================================================================

/// Lookup payload. `rank: None` means the domain is not listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrancoVerdict {
    pub rank: Option<u32>,
    pub in_top_k: bool,
}

#[derive(Debug, Deserialize)]
struct RanksResponse {
    #[serde(default)]
    ranks: Vec<RankEntry>,
}

#[derive(Debug, Deserialize)]
struct RankEntry {
    rank: u32,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct TrancoClient {
    http: reqwest::Client,
    api_key: String,
    api_email: String,
    threshold: u32,
    enabled: bool,
    cache: IntelCache<TrancoVerdict>,
}

impl TrancoClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(TRANCO_TIMEOUT)
            .user_agent(format!("alerta-link/{}", crate::constants::APP_VERSION))
            .build()
            .unwrap_or_default();

        if !config.tranco_enabled() {
            tracing::warn!("Tranco API key not configured; client disabled");
        }

        Self {
            http,
            api_key: config.tranco_api_key.clone(),
            api_email: config.tranco_api_email.clone(),
            threshold: config.tranco_rank_threshold,
            enabled: config.tranco_enabled(),
            cache: IntelCache::with_positivity(
                "tranco",
                INTEL_CACHE_CAPACITY,
                TRANCO_TTL,
                TRANCO_NEGATIVE_TTL,
                |v: &TrancoVerdict| v.rank.is_some(),
            ),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Rank lookup for a registrable domain. `None` = unavailable.
    pub async fn lookup(&self, registrable_domain: &str) -> Option<TrancoVerdict> {
        let key = registrable_domain.to_lowercase();
        if key.is_empty() {
            return None;
        }

        // Cache first so tests and warm processes never touch the network,
        // even with the client disabled.
        if let Some(value) = self.cache.peek(&key) {
            return value;
        }
        if !self.enabled {
            return None;
        }

        self.cache
            .get_or_fetch(&key, || self.fetch_rank(key.clone()))
            .await
    }

    async fn fetch_rank(&self, domain: String) -> Option<TrancoVerdict> {
        let url = format!("{TRANCO_API_BASE}/ranks/domain/{domain}");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_email, Some(&self.api_key))
            .send()
            .await
            .map_err(|e| tracing::warn!("Tranco request failed for {domain}: {e}"))
            .ok()?;

        match response.status().as_u16() {
            200 => {
                let body: RanksResponse = response
                    .json()
                    .await
                    .map_err(|e| tracing::warn!("Tranco parse error for {domain}: {e}"))
                    .ok()?;
                let rank = body.ranks.first().map(|r| r.rank);
                Some(TrancoVerdict {
                    rank,
                    in_top_k: rank.map(|r| r <= self.threshold).unwrap_or(false),
                })
            }
            404 => Some(TrancoVerdict {
                rank: None,
                in_top_k: false,
            }),
            429 => {
                tracing::warn!("Tranco rate limit exceeded");
                None
            }
            status => {
                tracing::warn!("Tranco API returned {status} for {domain}");
                None
            }
        }
    }

    /// Fresh cached verdict, without ever going upstream. Used when the
    /// request deadline has expired and only gathered evidence may count.
    pub fn cached(&self, registrable_domain: &str) -> Option<TrancoVerdict> {
        self.cache.peek(&registrable_domain.to_lowercase()).flatten()
    }

    /// Prime the cache (tests, warm-up jobs).
    pub fn prime(&self, registrable_domain: &str, verdict: Option<TrancoVerdict>) {
        self.cache.insert(&registrable_domain.to_lowercase(), verdict);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TrancoClient {
        TrancoClient::new(&Config::default())
    }

    #[tokio::test]
    async fn test_disabled_client_returns_unavailable() {
        let c = client();
        assert!(!c.enabled());
        assert_eq!(c.lookup("example.com").await, None);
    }

    #[tokio::test]
    async fn test_primed_cache_serves_without_network() {
        let c = client();
        c.prime(
            "google.com",
            Some(TrancoVerdict {
                rank: Some(1),
                in_top_k: true,
            }),
        );
        let v = c.lookup("GOOGLE.COM").await.expect("cached verdict");
        assert_eq!(v.rank, Some(1));
        assert!(v.in_top_k);
    }

    #[tokio::test]
    async fn test_primed_negative_short_circuits() {
        let c = client();
        c.prime(
            "unknown-domain.xyz",
            Some(TrancoVerdict {
                rank: None,
                in_top_k: false,
            }),
        );
        let v = c.lookup("unknown-domain.xyz").await.expect("cached");
        assert_eq!(v.rank, None);
        assert!(!v.in_top_k);
    }
}
