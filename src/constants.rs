//! Central Configuration Constants
//!
//! Single source of truth for all scoring-engine defaults.
//! To change a timeout, TTL or threshold, only edit this file.

use std::time::Duration;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "ALERTA-LINK";

// ============================================
// Input limits (analyze endpoint)
// ============================================

/// Minimum accepted URL length in bytes
pub const URL_MIN_LEN: usize = 10;

/// Maximum accepted URL length in bytes
pub const URL_MAX_LEN: usize = 2048;

// ============================================
// Scoring
// ============================================

/// Heuristic base score before any rule fires
pub const HEURISTIC_BASE_SCORE: i32 = 15;

/// Score reduction applied when the domain is in the Tranco top list
pub const TRANCO_SCORE_REDUCTION: i32 = 30;

/// Domains younger than this are flagged DOMAIN_TOO_NEW
pub const NEW_DOMAIN_THRESHOLD_DAYS: i64 = 30;

/// Domains older than this earn the DOMAIN_ESTABLISHED bonus
pub const ESTABLISHED_DOMAIN_THRESHOLD_DAYS: i64 = 365;

/// Host entropy (bits) at or above which HIGH_ENTROPY fires
pub const HIGH_ENTROPY_THRESHOLD: f64 = 3.5;

/// Digit ratio at or above which HIGH_DIGIT_RATIO fires
pub const HIGH_DIGIT_RATIO_THRESHOLD: f64 = 0.30;

/// URL byte length above which LONG_URL fires
pub const LONG_URL_THRESHOLD: usize = 100;

/// Subdomain count above which EXCESSIVE_SUBDOMAINS fires
pub const EXCESSIVE_SUBDOMAINS_THRESHOLD: u32 = 3;

/// Harmless-engine share at or above which VIRUSTOTAL_CLEAN fires
pub const VT_CLEAN_HARMLESS_RATIO: f64 = 0.8;

// ============================================
// External clients: timeouts and quotas
// ============================================

/// Tranco lookup hard timeout
pub const TRANCO_TIMEOUT: Duration = Duration::from_secs(2);

/// VirusTotal lookup hard timeout
pub const VIRUSTOTAL_TIMEOUT: Duration = Duration::from_secs(4);

/// WHOIS (RDAP) lookup hard timeout
pub const WHOIS_TIMEOUT: Duration = Duration::from_secs(3);

/// VirusTotal free-tier quota (requests per minute)
pub const VIRUSTOTAL_QUOTA_PER_MINUTE: u32 = 4;

// ============================================
// Caches: TTLs and bounds
// ============================================

/// Tranco positive cache TTL (rank found)
pub const TRANCO_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Tranco negative cache TTL (not listed / lookup failed)
pub const TRANCO_NEGATIVE_TTL: Duration = Duration::from_secs(24 * 3600);

/// VirusTotal positive cache TTL
pub const VIRUSTOTAL_TTL: Duration = Duration::from_secs(6 * 3600);

/// VirusTotal negative cache TTL
pub const VIRUSTOTAL_NEGATIVE_TTL: Duration = Duration::from_secs(3600);

/// WHOIS positive cache TTL
pub const WHOIS_TTL: Duration = Duration::from_secs(24 * 3600);

/// WHOIS negative cache TTL
pub const WHOIS_NEGATIVE_TTL: Duration = Duration::from_secs(6 * 3600);

/// Bounded size for each intel cache (LRU eviction past this)
pub const INTEL_CACHE_CAPACITY: usize = 1000;

// ============================================
// Rate limiting (public entry point)
// ============================================

/// Requests per minute allowed per client IP on /analyze
pub const RATE_LIMIT_PER_MINUTE: u32 = 30;

/// Hard bound on tracked client buckets before the map is cleared
pub const RATE_LIMIT_MAX_CLIENTS: usize = 10_000;

// ============================================
// Request deadlines
// ============================================

/// Whole-request deadline without the crawler
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

/// Whole-request deadline when the crawler is enabled
pub const REQUEST_DEADLINE_WITH_CRAWLER: Duration = Duration::from_secs(30);

// ============================================
// Crawler
// ============================================

/// Default crawl timeout when the request does not specify one
pub const CRAWL_DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default redirect cap when the request does not specify one
pub const CRAWL_DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Concurrent crawl instances allowed process-wide
pub const CRAWL_MAX_CONCURRENCY: usize = 4;

/// Bytes of body the crawler will inspect at most
pub const CRAWL_MAX_BODY_BYTES: usize = 500_000;
