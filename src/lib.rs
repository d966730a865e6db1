//! ALERTA-LINK — URL risk classification backend
//!
//! Scoring engine plus HTTP surface for a mobile client: lexical
//! features, a supervised classifier and calibrated heuristic rules,
//! enriched with Tranco / VirusTotal / WHOIS reputation and optional
//! content crawling, fused into explainable verdicts.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod logic;
pub mod middleware;
pub mod models;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use logic::{AnalyzeOptions, Engine, Verdict};
