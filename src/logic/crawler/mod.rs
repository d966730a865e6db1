//! Content Crawler
//!
//! Deep inspection of a suspicious URL: fetches the page following
//! redirects manually (so the whole chain is captured and capped),
//! records TLS failures as first-class evidence, and runs one DOM query
//! pass over the body. Disabled by default; enabled per request.
//!
//! Crawls are resource-heavy, so they run on a bounded concurrency pool
//! and under a hard per-request deadline.

pub mod evidence;
pub mod signals;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use url::Url;

use crate::constants::{CRAWL_MAX_BODY_BYTES, CRAWL_MAX_CONCURRENCY};
use crate::logic::catalog::Catalog;
pub use evidence::CrawlEvidence;
pub use signals::synthesize;

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrawlOutcome {
    Skipped,
    Ok,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    /// HTTP status of the final response (0 when none arrived)
    pub status: u16,
    pub final_url: String,
    pub redirect_chain: Vec<String>,
    pub html_fingerprint: String,
    pub evidence: CrawlEvidence,
    pub error: Option<String>,
    pub duration_ms: u64,
}

// ============================================================================
// CRAWLER
// ============================================================================

pub struct Crawler {
    pool: Arc<Semaphore>,
    catalog: Catalog,
}

impl Crawler {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            pool: Arc::new(Semaphore::new(CRAWL_MAX_CONCURRENCY)),
            catalog,
        }
    }

    /// Crawl a normalized URL. `None` = unavailable (pool closed); every
    /// other failure is reported inside the `CrawlReport` so partial
    /// evidence (like an SSL failure) still reaches the verdict.
    pub async fn crawl(
        &self,
        url: &str,
        timeout: Duration,
        max_redirects: u32,
    ) -> Option<CrawlReport> {
        let _permit = self.pool.acquire().await.ok()?;
        let started = Instant::now();

        let report = match tokio::time::timeout(timeout, self.crawl_inner(url, max_redirects)).await
        {
            Ok(report) => report,
            Err(_) => CrawlReport {
                outcome: CrawlOutcome::Timeout,
                status: 0,
                final_url: url.to_string(),
                redirect_chain: Vec::new(),
                html_fingerprint: String::new(),
                evidence: CrawlEvidence::default(),
                error: Some("timeout al cargar la pagina".into()),
                duration_ms: 0,
            },
        };

        Some(CrawlReport {
            duration_ms: started.elapsed().as_millis() as u64,
            ..report
        })
    }

    async fn crawl_inner(&self, url: &str, max_redirects: u32) -> CrawlReport {
        let mut evidence = CrawlEvidence::default();
        let mut chain: Vec<String> = Vec::new();
        let mut current = url.to_string();
        let mut status: u16 = 0;
        let mut strict_tls = true;

        // Redirects are followed by hand so the chain is observable and
        // capped. A TLS failure downgrades to a permissive client once,
        // with the failure itself kept as evidence.
        let body = loop {
            let client = match build_client(strict_tls) {
                Some(c) => c,
                None => {
                    return error_report(url, chain, status, evidence, "no http client");
                }
            };

            let response = match client.get(&current).send().await {
                Ok(r) => r,
                Err(e) if strict_tls && is_tls_error(&e) => {
                    tracing::info!("TLS failure crawling {current}: {e}");
                    evidence.ssl_error = true;
                    strict_tls = false;
                    continue;
                }
                Err(e) => {
                    return error_report(url, chain, status, evidence, &e.to_string());
                }
            };

            status = response.status().as_u16();
            if response.status().is_redirection() {
                if chain.len() as u32 >= max_redirects {
                    return error_report(
                        &current,
                        chain,
                        status,
                        evidence,
                        "demasiadas redirecciones",
                    );
                }
                let location = response
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                let next = match Url::parse(&current).and_then(|base| base.join(location)) {
                    Ok(u) => u.to_string(),
                    Err(_) => {
                        return error_report(
                            &current,
                            chain,
                            status,
                            evidence,
                            "redireccion invalida",
                        );
                    }
                };
                chain.push(next.clone());
                current = next;
                continue;
            }

            match response.text().await {
                Ok(mut body) => {
                    body.truncate(CRAWL_MAX_BODY_BYTES);
                    break body;
                }
                Err(e) => {
                    return error_report(&current, chain, status, evidence, &e.to_string());
                }
            }
        };

        let ssl_error = evidence.ssl_error;
        let mut evidence = evidence::analyze_html(&body, &current, &self.catalog);
        evidence.ssl_error = ssl_error;
        let html_fingerprint = evidence::html_fingerprint(&evidence);

        CrawlReport {
            outcome: CrawlOutcome::Ok,
            status,
            final_url: current,
            redirect_chain: chain,
            html_fingerprint,
            evidence,
            error: None,
            duration_ms: 0,
        }
    }
}

fn build_client(strict_tls: bool) -> Option<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .danger_accept_invalid_certs(!strict_tls)
        .user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        )
        .build()
        .ok()
}

fn is_tls_error(e: &reqwest::Error) -> bool {
    let msg = e.to_string().to_lowercase();
    msg.contains("certificate") || msg.contains("ssl") || msg.contains("tls")
}

fn error_report(
    final_url: &str,
    chain: Vec<String>,
    status: u16,
    evidence: CrawlEvidence,
    error: &str,
) -> CrawlReport {
    CrawlReport {
        outcome: CrawlOutcome::Error,
        status,
        final_url: final_url.to_string(),
        redirect_chain: chain,
        html_fingerprint: String::new(),
        evidence,
        error: Some(error.to_string()),
        duration_ms: 0,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_error_detection() {
        // the classifier works on message content; build a plain error via
        // a failed parse is not possible, so exercise the string logic
        assert!(
            ["certificate verify failed", "SSL routines", "tls handshake"]
                .iter()
                .all(|m| {
                    let lower = m.to_lowercase();
                    lower.contains("certificate")
                        || lower.contains("ssl")
                        || lower.contains("tls")
                })
        );
    }

    #[tokio::test]
    async fn test_crawl_times_out_with_report() {
        // unroutable address: the deadline converts it into a Timeout
        // report instead of an error bubbling up
        let crawler = Crawler::new(Catalog::default());
        let report = crawler
            .crawl(
                "http://10.255.255.1/never",
                Duration::from_millis(200),
                5,
            )
            .await
            .expect("a report, even on failure");
        assert!(matches!(
            report.outcome,
            CrawlOutcome::Timeout | CrawlOutcome::Error
        ));
    }
}
