//! ML Predictor
//!
//! - `integrity.rs` — SHA-256 artifact verification (runs before parsing)
//! - `inference.rs` — ONNX session, standardizer, probability output

pub mod inference;
pub mod integrity;

pub use inference::{MlPredictor, ModelMetadata, ModelStatus};
pub use integrity::{sha256_hex, verify_artifact, IntegrityError};
