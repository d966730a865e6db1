//! Orchestrator & Fusion
//!
//! `Engine` owns every process-wide singleton (catalog, weights, model,
//! intel clients, crawler) as plain values so tests can build isolated
//! engines. `analyze` drives the full pipeline: normalize → features →
//! local rules → ML fusion → reputation adjustments → optional crawl →
//! final clamp and level.
//!
//! External failures never abort an analysis: each client resolves to
//! `Unavailable` and the verdict's `apis_consulted` map records what
//! actually answered.

use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;

use crate::config::Config;
use crate::logic::catalog::Catalog;
use crate::logic::crawler::{self, Crawler};
use crate::logic::features;
use crate::logic::heuristics::{self, weights, WeightsTable};
use crate::logic::intel::{
    TrancoClient, TrancoVerdict, VirusTotalClient, VirusTotalVerdict, WhoisClient, WhoisVerdict,
};
use crate::logic::model::{MlPredictor, ModelStatus};
use crate::logic::recommend;
use crate::logic::safety::{self, SafetyError};
use crate::logic::signal::{sort_signals, RiskLevel, Severity, Signal};
use crate::logic::verdict::{
    AnalyzeOptions, ApisConsulted, ConnectionMode, CrawlSection, ModelKind, Timestamps, Verdict,
};
use crate::constants::{
    ESTABLISHED_DOMAIN_THRESHOLD_DAYS, NEW_DOMAIN_THRESHOLD_DAYS, REQUEST_DEADLINE,
    REQUEST_DEADLINE_WITH_CRAWLER,
};

// ============================================================================
// ENGINE
// ============================================================================

pub struct Engine {
    config: Config,
    pub catalog: Catalog,
    pub weights: WeightsTable,
    pub model: MlPredictor,
    pub tranco: TrancoClient,
    pub virustotal: VirusTotalClient,
    pub whois: WhoisClient,
    pub crawler: Crawler,
    mode: RwLock<ConnectionMode>,
}

impl Engine {
    /// Build an engine from configuration. The ML model starts unloaded;
    /// `boot()` (or a later `reload_model()`) arms it.
    pub fn new(config: Config) -> Self {
        let catalog = Catalog::default();
        Self {
            catalog: catalog.clone(),
            weights: WeightsTable::load(&config.weights_path),
            model: MlPredictor::new(&config.model_path, config.model_sha256.clone()),
            tranco: TrancoClient::new(&config),
            virustotal: VirusTotalClient::new(&config),
            whois: WhoisClient::new(),
            crawler: Crawler::new(catalog),
            mode: RwLock::new(ConnectionMode::Auto),
            config,
        }
    }

    /// Production boot: load artifacts, degrade to heuristic on failure.
    pub fn boot(config: Config) -> Self {
        let engine = Self::new(config);
        engine.model.load_or_degrade();
        engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model.status()
    }

    /// Atomic artifact reload (SIGHUP handler).
    pub fn reload_model(&self) {
        tracing::info!("Reloading ML model artifact");
        self.model.load_or_degrade();
    }

    pub fn mode(&self) -> ConnectionMode {
        *self.mode.read()
    }

    pub fn set_mode(&self, mode: ConnectionMode) -> ConnectionMode {
        std::mem::replace(&mut *self.mode.write(), mode)
    }

    /// Effective mode for one request: explicit request wins, `auto`
    /// follows configured client availability.
    fn resolve_mode(&self, requested: ConnectionMode) -> (ConnectionMode, bool) {
        match requested {
            ConnectionMode::Offline => (ConnectionMode::Offline, false),
            ConnectionMode::Online => (ConnectionMode::Online, true),
            ConnectionMode::Auto => {
                if self.tranco.enabled() || self.virustotal.enabled() {
                    (ConnectionMode::Online, true)
                } else {
                    (ConnectionMode::Offline, false)
                }
            }
        }
    }

    // ========================================================================
    // ANALYZE PIPELINE
    // ========================================================================

    pub async fn analyze(
        &self,
        raw_url: &str,
        options: &AnalyzeOptions,
    ) -> Result<Verdict, SafetyError> {
        let requested_at = Utc::now();
        let started = Instant::now();

        // 1. normalize + safety gate
        let ctx = safety::validate_and_normalize(raw_url).await?;

        let (mode_used, use_external) = self.resolve_mode(options.mode);
        let run_crawler = options.enable_crawler && use_external;

        // The whole request runs under a hard deadline. On expiry every
        // outstanding sub-task is cancelled (the futures are dropped) and
        // the verdict is assembled from the evidence already gathered:
        // the local rules plus whatever the intel caches hold.
        let deadline = if run_crawler {
            REQUEST_DEADLINE_WITH_CRAWLER
        } else {
            REQUEST_DEADLINE
        };

        // The crawl depends only on the normalized URL, so it overlaps the
        // whole reputation phase; its signals merge before the final clamp.
        // Its own budget never exceeds the request deadline.
        let crawl_fut = async {
            if run_crawler {
                self.crawler
                    .crawl(
                        &ctx.normalized,
                        Duration::from_secs(options.timeout_seconds).min(deadline),
                        options.max_redirects,
                    )
                    .await
            } else {
                None
            }
        };

        let main_fut = self.score_pipeline(&ctx, options, use_external);
        let joined =
            tokio::time::timeout(deadline, async { tokio::join!(main_fut, crawl_fut) }).await;
        let (mut fused, crawl_report, deadline_hit) = match joined {
            Ok((fused, crawl_report)) => (fused, crawl_report, false),
            Err(_) => {
                tracing::warn!(
                    url = %ctx.normalized,
                    deadline_secs = deadline.as_secs(),
                    "request deadline exceeded; emitting verdict from gathered evidence"
                );
                (self.partial_pipeline(&ctx, options, use_external), None, true)
            }
        };

        // 9. crawl merge (subject to the Tranco false-positive filter)
        let crawl_section = match (&crawl_report, options.enable_crawler) {
            (Some(report), _) => {
                let crawl_signals =
                    crawler::synthesize(report, &ctx.normalized, fused.in_top_k, &self.weights);
                for signal in crawl_signals {
                    fused.score += signal.weight;
                    fused.signals.push(signal);
                }
                Some(CrawlSection::from_report(report))
            }
            (None, true) if deadline_hit => Some(CrawlSection::timed_out()),
            (None, true) => Some(CrawlSection::skipped()),
            (None, false) => None,
        };

        // 10-11. clamp, level, stable ordering, recommendations
        let score = fused.score.clamp(0, 100);
        let risk_level = RiskLevel::from_score(score);
        sort_signals(&mut fused.signals);
        let recommendations = recommend::recommendations(risk_level, &fused.signals);

        let completed_at = Utc::now();
        Ok(Verdict {
            url: raw_url.to_string(),
            normalized_url: ctx.normalized.clone(),
            score,
            risk_level,
            model_used: fused.model_used,
            mode_used,
            apis_consulted: ApisConsulted {
                tranco: fused.tranco_consulted,
                virustotal: fused.vt_consulted,
                whois: fused.whois_consulted,
                crawler: crawl_report.is_some(),
                database: false, // set by the persistence layer on write
            },
            signals: fused.signals,
            recommendations,
            crawl: crawl_section,
            timestamps: Timestamps {
                requested_at,
                completed_at,
                duration_ms: started.elapsed().as_millis() as u64,
            },
            ml_score: fused.ml_score,
            heuristic_score: fused.heuristic_score,
        })
    }

    /// Steps 2–8: Tranco lookup, base fusion, then VirusTotal and WHOIS
    /// concurrently. VirusTotal is consulted inside the uncertainty
    /// window, and always for shortener/paste/hosting infrastructure
    /// (reputable domains anyone can publish under).
    async fn score_pipeline(
        &self,
        ctx: &safety::UrlContext,
        options: &AnalyzeOptions,
        use_external: bool,
    ) -> FusedScore {
        // 4. Tranco is always attempted (cache-backed, near-zero when warm)
        let tranco_verdict = if use_external {
            self.tranco.lookup(&ctx.registrable_domain).await
        } else {
            None
        };

        // 2–6. features, base signals, model fusion, Tranco adjustment
        let mut fused = self.fuse_base(ctx, options, tranco_verdict);

        // 7. VirusTotal ∥ 8. WHOIS when the host is not in the top list.
        let vt_window =
            self.config.virustotal_uncertainty_min..=self.config.virustotal_uncertainty_max;
        let vt_fut = async {
            if use_external && (vt_window.contains(&fused.score) || fused.is_infrastructure) {
                self.virustotal.lookup(&ctx.normalized).await
            } else {
                None
            }
        };
        let whois_fut = async {
            if use_external && !fused.in_top_k {
                self.whois.lookup(&ctx.registrable_domain).await
            } else {
                None
            }
        };
        let (vt_verdict, whois_verdict) = tokio::join!(vt_fut, whois_fut);

        fused.vt_consulted = vt_verdict.is_some();
        if let Some(vt) = &vt_verdict {
            self.apply_virustotal(vt, &mut fused.score, &mut fused.signals);
        }

        fused.whois_consulted = whois_verdict.is_some();
        if let Some(whois) = &whois_verdict {
            self.apply_whois(whois, ctx, &mut fused.score, &mut fused.signals);
        }

        fused
    }

    /// Deadline fallback: the same fusion, fed exclusively from evidence
    /// already gathered. Cache peeks only, no upstream calls, no awaits.
    fn partial_pipeline(
        &self,
        ctx: &safety::UrlContext,
        options: &AnalyzeOptions,
        use_external: bool,
    ) -> FusedScore {
        let tranco_verdict = if use_external {
            self.tranco.cached(&ctx.registrable_domain)
        } else {
            None
        };
        let mut fused = self.fuse_base(ctx, options, tranco_verdict);
        if !use_external {
            return fused;
        }

        let vt_window =
            self.config.virustotal_uncertainty_min..=self.config.virustotal_uncertainty_max;
        if vt_window.contains(&fused.score) || fused.is_infrastructure {
            if let Some(vt) = self.virustotal.cached(&ctx.normalized) {
                fused.vt_consulted = true;
                self.apply_virustotal(&vt, &mut fused.score, &mut fused.signals);
            }
        }
        if !fused.in_top_k {
            if let Some(whois) = self.whois.cached(&ctx.registrable_domain) {
                fused.whois_consulted = true;
                self.apply_whois(&whois, ctx, &mut fused.score, &mut fused.signals);
            }
        }
        fused
    }

    /// Steps 2–6: features, base signals, ML fusion and the Tranco
    /// adjustment. Never suspends; deterministic given the Tranco verdict.
    fn fuse_base(
        &self,
        ctx: &safety::UrlContext,
        options: &AnalyzeOptions,
        tranco_verdict: Option<TrancoVerdict>,
    ) -> FusedScore {
        let tranco_consulted = tranco_verdict.is_some();
        let in_top_k = tranco_verdict.as_ref().map(|v| v.in_top_k).unwrap_or(false);

        // 2. features
        let features = features::extract(
            ctx,
            &self.catalog,
            tranco_verdict.as_ref(),
            self.tranco.threshold(),
        );

        // 3. base signals (no external calls)
        let local = heuristics::evaluate_local(ctx, &features, &self.catalog, &self.weights);
        let heuristic_score = local.score;
        let mut signals = local.signals;

        // 5. model fusion: ML when requested and available, else heuristic
        let ml_score = if options.model == ModelKind::Ml {
            self.model
                .predict(&features)
                .map(|p| (p * 100.0).round() as i32)
        } else {
            None
        };
        let (model_used, mut score) = match ml_score {
            Some(ml) => (ModelKind::Ml, ml.max(heuristic_score)),
            None => (ModelKind::Heuristic, heuristic_score),
        };
        if let Some(ml) = ml_score {
            if (ml - heuristic_score).abs() > 50 {
                tracing::warn!(
                    url = %ctx.normalized,
                    ml_score = ml,
                    heuristic_score,
                    "substantial model disagreement; both scores recorded"
                );
            }
        }

        // 6. Tranco adjustment. Popularity vouches for the domain, never
        // for shortener/paste/hosting infrastructure.
        let is_infrastructure = features.shortener_detected
            || features.paste_service_detected
            || self.catalog.is_hosting_platform(&ctx.host);

        if features.in_tranco && !is_infrastructure {
            let bonus = self.weights.get(weights::DOMAIN_IN_TRANCO);
            score = (score + bonus).max(0);
            signals.push(Signal::new(
                weights::DOMAIN_IN_TRANCO,
                Severity::Low,
                bonus,
                json!({
                    "rank": tranco_verdict.as_ref().and_then(|v| v.rank),
                    "threshold": self.tranco.threshold(),
                }),
                format!(
                    "Dominio verificado en Tranco Top {}k.",
                    self.tranco.threshold() / 1000
                ),
            ));
        } else if tranco_consulted && !features.in_tranco {
            let weight = self.weights.get(weights::DOMAIN_NOT_IN_TRANCO);
            score += weight;
            signals.push(Signal::new(
                weights::DOMAIN_NOT_IN_TRANCO,
                Severity::Medium,
                weight,
                json!({ "domain": ctx.registrable_domain }),
                format!(
                    "El dominio '{}' NO aparece entre los sitios mas visitados (Tranco).",
                    ctx.registrable_domain
                ),
            ));
        }

        FusedScore {
            score,
            signals,
            model_used,
            ml_score,
            heuristic_score,
            in_top_k,
            tranco_consulted,
            vt_consulted: false,
            whois_consulted: false,
            is_infrastructure,
        }
    }

    fn apply_virustotal(
        &self,
        vt: &VirusTotalVerdict,
        score: &mut i32,
        signals: &mut Vec<Signal>,
    ) {
        if vt.malicious >= 1 {
            let (id, severity) = match vt.malicious {
                m if m >= 10 => (weights::VIRUSTOTAL_MALICIOUS_CRITICAL, Severity::High),
                7..=9 => (weights::VIRUSTOTAL_MALICIOUS_HIGH, Severity::High),
                4..=6 => (weights::VIRUSTOTAL_MALICIOUS_MED, Severity::Medium),
                _ => (weights::VIRUSTOTAL_MALICIOUS_LOW, Severity::Low),
            };
            let weight = self.weights.get(id);
            *score += weight;
            signals.push(Signal::new(
                id,
                severity,
                weight,
                json!({
                    "malicious": vt.malicious,
                    "suspicious": vt.suspicious,
                    "total_engines": vt.total_engines,
                    "threat_names": vt.threat_names.iter().take(5).collect::<Vec<_>>(),
                }),
                format!(
                    "VIRUSTOTAL: {} de {} motores detectan esta URL como maliciosa.",
                    vt.malicious, vt.total_engines
                ),
            ));
        } else if vt.harmless_ratio() >= crate::constants::VT_CLEAN_HARMLESS_RATIO {
            let bonus = self.weights.get(weights::VIRUSTOTAL_CLEAN);
            *score = (*score + bonus).max(0);
            signals.push(Signal::new(
                weights::VIRUSTOTAL_CLEAN,
                Severity::Low,
                bonus,
                json!({
                    "harmless": vt.harmless,
                    "total_engines": vt.total_engines,
                }),
                format!(
                    "VIRUSTOTAL: {} de {} motores confirman que esta URL es segura.",
                    vt.harmless, vt.total_engines
                ),
            ));
        }
    }

    fn apply_whois(
        &self,
        whois: &WhoisVerdict,
        ctx: &safety::UrlContext,
        score: &mut i32,
        signals: &mut Vec<Signal>,
    ) {
        let Some(age_days) = whois.age_days else {
            return;
        };

        if age_days < NEW_DOMAIN_THRESHOLD_DAYS {
            let weight = self.weights.get(weights::DOMAIN_TOO_NEW);
            *score += weight;
            signals.push(Signal::new(
                weights::DOMAIN_TOO_NEW,
                Severity::High,
                weight,
                json!({
                    "domain": ctx.registrable_domain,
                    "age_days": age_days,
                    "threshold_days": NEW_DOMAIN_THRESHOLD_DAYS,
                    "registrar": whois.registrar,
                }),
                format!(
                    "El dominio '{}' fue registrado hace solo {age_days} dias. \
                     Los sitios de phishing usan dominios recien creados.",
                    ctx.registrable_domain
                ),
            ));
        } else if age_days > ESTABLISHED_DOMAIN_THRESHOLD_DAYS {
            let bonus = self.weights.get(weights::DOMAIN_ESTABLISHED);
            *score = (*score + bonus).max(0);
            signals.push(Signal::new(
                weights::DOMAIN_ESTABLISHED,
                Severity::Low,
                bonus,
                json!({
                    "domain": ctx.registrable_domain,
                    "age_days": age_days,
                    "years": (age_days as f64 / 365.0 * 10.0).round() / 10.0,
                }),
                format!(
                    "El dominio tiene {:.1} años de antiguedad.",
                    age_days as f64 / 365.0
                ),
            ));
        }
    }
}

/// Intermediate result of the scoring pipeline (steps 2–8).
struct FusedScore {
    score: i32,
    signals: Vec<Signal>,
    model_used: ModelKind,
    ml_score: Option<i32>,
    heuristic_score: i32,
    in_top_k: bool,
    tranco_consulted: bool,
    vt_consulted: bool,
    whois_consulted: bool,
    /// Shortener, paste service or hosting platform: never earns the
    /// Tranco bonus and always widens the VirusTotal consultation.
    is_infrastructure: bool,
}

// ============================================================================
// TESTS — seed scenarios with primed caches standing in for live intel
// ============================================================================
