//! Scoring Engine
//!
//! Complete URL-risk pipeline:
//! Normalize → Features → Heuristics ⊕ ML → Reputation → Crawl → Verdict
//!
//! ## Modules
//! - `safety` — URL normalizer + SSRF gate
//! - `catalog` — static brand/keyword/TLD reference data
//! - `features` — versioned 24-feature extraction
//! - `heuristics` — calibrated weighted rules
//! - `model` — ONNX predictor + artifact integrity
//! - `intel` — Tranco / VirusTotal / WHOIS clients with shared caching
//! - `crawler` — redirect-chain + DOM evidence collection
//! - `engine` — orchestration and score fusion
//! - `verdict`, `signal`, `recommend` — response model

pub mod catalog;
pub mod crawler;
pub mod engine;
pub mod features;
pub mod heuristics;
pub mod intel;
pub mod model;
pub mod recommend;
pub mod safety;
pub mod signal;
pub mod verdict;

pub use engine::Engine;
pub use verdict::{AnalyzeOptions, ConnectionMode, ModelKind, Verdict};
