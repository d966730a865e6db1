//! VirusTotal API v3 client
//!
//! Multi-engine URL verdicts, consulted only when the orchestrator is in
//! its uncertainty window. Cache-through per URL hash (6h positive / 1h
//! negative) behind the free-tier quota: an empty bucket returns
//! `Unavailable` without spending a request.

use std::num::NonZeroU32;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::cache::{CacheStats, IntelCache};
use crate::config::Config;
use crate::constants::{
    INTEL_CACHE_CAPACITY, VIRUSTOTAL_NEGATIVE_TTL, VIRUSTOTAL_QUOTA_PER_MINUTE,
    VIRUSTOTAL_TIMEOUT, VIRUSTOTAL_TTL,
};

const VT_API_BASE: &str = "https://www.virustotal.com/api/v3";

// ============================================================================
// PAYLOAD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirusTotalVerdict {
    pub malicious: u32,
    pub suspicious: u32,
    pub harmless: u32,
    pub total_engines: u32,
    pub threat_names: Vec<String>,
}

impl VirusTotalVerdict {
    /// Share of engines that vouch for the URL.
    pub fn harmless_ratio(&self) -> f64 {
        if self.total_engines == 0 {
            return 0.0;
        }
        self.harmless as f64 / self.total_engines as f64
    }
}

#[derive(Debug, Deserialize)]
struct VtResponse {
    data: VtData,
}

#[derive(Debug, Deserialize)]
struct VtData {
    attributes: VtAttributes,
}

#[derive(Debug, Deserialize)]
struct VtAttributes {
    #[serde(default)]
    last_analysis_stats: VtStats,
    #[serde(default)]
    last_analysis_results: std::collections::HashMap<String, VtEngineResult>,
}

#[derive(Debug, Default, Deserialize)]
struct VtStats {
    #[serde(default)]
    malicious: u32,
    #[serde(default)]
    suspicious: u32,
    #[serde(default)]
    harmless: u32,
    #[serde(default)]
    undetected: u32,
    #[serde(default)]
    timeout: u32,
}

#[derive(Debug, Deserialize)]
struct VtEngineResult {
    #[serde(default)]
    category: String,
    #[serde(default)]
    result: Option<String>,
}

// ============================================================================
// CLIENT
// ============================================================================

type QuotaBucket = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct VirusTotalClient {
    http: reqwest::Client,
    api_key: String,
    enabled: bool,
    quota: QuotaBucket,
    cache: IntelCache<VirusTotalVerdict>,
}

impl VirusTotalClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(VIRUSTOTAL_TIMEOUT)
            .user_agent(format!("alerta-link/{}", crate::constants::APP_VERSION))
            .build()
            .unwrap_or_default();

        if !config.virustotal_enabled() {
            tracing::warn!("VirusTotal API key not configured; client disabled");
        }

        Self {
            http,
            api_key: config.virustotal_api_key.clone(),
            enabled: config.virustotal_enabled(),
            quota: RateLimiter::direct(Quota::per_minute(
                NonZeroU32::new(VIRUSTOTAL_QUOTA_PER_MINUTE).unwrap(),
            )),
            cache: IntelCache::new(
                "virustotal",
                INTEL_CACHE_CAPACITY,
                VIRUSTOTAL_TTL,
                VIRUSTOTAL_NEGATIVE_TTL,
            ),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Cache key: SHA-256 of the normalized URL.
    pub fn cache_key(normalized_url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalized_url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Multi-engine verdict for a normalized URL. `None` = unavailable
    /// (disabled, quota empty, upstream failure, or never analyzed).
    pub async fn lookup(&self, normalized_url: &str) -> Option<VirusTotalVerdict> {
        let key = Self::cache_key(normalized_url);

        if let Some(value) = self.cache.peek(&key) {
            return value;
        }
        if !self.enabled {
            return None;
        }
        // Quota exhaustion is transient: bail without a cache write so the
        // next window can retry.
        if self.quota.check().is_err() {
            tracing::warn!("VirusTotal quota exhausted, skipping lookup");
            return None;
        }

        self.cache
            .get_or_fetch(&key, || self.fetch(normalized_url.to_string()))
            .await
    }

    async fn fetch(&self, normalized_url: String) -> Option<VirusTotalVerdict> {
        // VT v3 URL identifier: base64url of the URL without padding
        let url_id = URL_SAFE_NO_PAD.encode(normalized_url.as_bytes());
        let url = format!("{VT_API_BASE}/urls/{url_id}");

        let response = self
            .http
            .get(&url)
            .header("x-apikey", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| tracing::warn!("VirusTotal request failed: {e}"))
            .ok()?;

        match response.status().as_u16() {
            200 => {
                let body: VtResponse = response
                    .json()
                    .await
                    .map_err(|e| tracing::warn!("VirusTotal parse error: {e}"))
                    .ok()?;
                Some(parse_attributes(body.data.attributes))
            }
            404 => None, // URL never analyzed
            401 => {
                tracing::error!("VirusTotal rejected the API key");
                None
            }
            429 => {
                tracing::warn!("VirusTotal rate limit exceeded upstream");
                None
            }
            status => {
                tracing::warn!("VirusTotal API returned {status}");
                None
            }
        }
    }

    /// Fresh cached verdict, without spending quota or going upstream.
    /// Used when the request deadline has expired.
    pub fn cached(&self, normalized_url: &str) -> Option<VirusTotalVerdict> {
        self.cache.peek(&Self::cache_key(normalized_url)).flatten()
    }

    /// Prime the cache by normalized URL (tests, warm-up jobs).
    pub fn prime(&self, normalized_url: &str, verdict: Option<VirusTotalVerdict>) {
        self.cache.insert(&Self::cache_key(normalized_url), verdict);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

fn parse_attributes(attrs: VtAttributes) -> VirusTotalVerdict {
    let stats = attrs.last_analysis_stats;
    let mut threat_names: Vec<String> = attrs
        .last_analysis_results
        .into_values()
        .filter(|r| r.category == "malicious" || r.category == "suspicious")
        .filter_map(|r| r.result)
        .collect();
    threat_names.sort();
    threat_names.dedup();
    threat_names.truncate(10);

    VirusTotalVerdict {
        malicious: stats.malicious,
        suspicious: stats.suspicious,
        harmless: stats.harmless,
        total_engines: stats.malicious
            + stats.suspicious
            + stats.harmless
            + stats.undetected
            + stats.timeout,
        threat_names,
    }
}

// ============================================================================
// TESTS
// ============================================================================
