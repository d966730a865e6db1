//! ML Predictor — ONNX Runtime integration
//!
//! Loads the supervised classifier (standardizer + model exported as one
//! ONNX pipeline) and produces a calibrated malicious probability. The
//! artifact is integrity-checked before the runtime ever sees the bytes,
//! and its sidecar metadata must carry exactly the feature names of the
//! current layout, in order. Reload is an atomic swap behind the lock.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::integrity::{verify_artifact, IntegrityError};
use crate::logic::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};

// ============================================================================
// METADATA
// ============================================================================

/// Sidecar JSON written at training time, next to the .onnx file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: String,
    /// Ordered feature names the model was trained with
    pub feature_names: Vec<String>,
    /// Standardizer parameters, one per feature
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl ModelMetadata {
    /// The artifact must agree with the engine's layout, name by name.
    pub fn validate_layout(&self) -> Result<(), ModelError> {
        if self.feature_names.len() != FEATURE_COUNT {
            return Err(ModelError::FeatureMismatch(format!(
                "artifact has {} features, layout has {FEATURE_COUNT}",
                self.feature_names.len()
            )));
        }
        for (i, (got, want)) in self
            .feature_names
            .iter()
            .zip(FEATURE_LAYOUT.iter())
            .enumerate()
        {
            if got != want {
                return Err(ModelError::FeatureMismatch(format!(
                    "feature {i}: artifact says '{got}', layout says '{want}'"
                )));
            }
        }
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(ModelError::FeatureMismatch(
                "standardizer parameter count does not match the layout".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// ERRORS / STATUS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("cannot read model metadata {0}")]
    MetadataIo(String),

    #[error("invalid model metadata: {0}")]
    MetadataInvalid(String),

    #[error("feature layout mismatch: {0}")]
    FeatureMismatch(String),

    #[error("onnx session error: {0}")]
    Session(String),

    #[error("inference error: {0}")]
    Inference(String),
}

/// Status block for /health and the settings endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub verified: bool,
    pub version: Option<String>,
    /// First 16 hex chars of the verified artifact hash
    pub hash_prefix: Option<String>,
    pub feature_count: usize,
}

// ============================================================================
// PREDICTOR
// ============================================================================

struct LoadedModel {
    session: Session,
    meta: ModelMetadata,
    hash: String,
}

/// The supervised predictor. `Unavailable` is a state, not an error: the
/// engine falls back to the heuristic model whenever this is unloaded.
pub struct MlPredictor {
    model_path: PathBuf,
    authorized_hash: String,
    state: RwLock<Option<LoadedModel>>,
}

impl MlPredictor {
    /// Build an unloaded predictor; call `load()` to arm it.
    pub fn new(model_path: impl Into<PathBuf>, authorized_hash: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            authorized_hash: authorized_hash.into(),
            state: RwLock::new(None),
        }
    }

    /// Verify, parse and swap in the artifact. Any failure leaves the
    /// previous state untouched (still-loaded models keep serving).
    pub fn load(&self) -> Result<(), ModelError> {
        let (bytes, hash) = verify_artifact(&self.model_path, &self.authorized_hash)?;

        let meta_path = metadata_path(&self.model_path);
        let meta_raw = std::fs::read_to_string(&meta_path)
            .map_err(|_| ModelError::MetadataIo(meta_path.display().to_string()))?;
        let meta: ModelMetadata = serde_json::from_str(&meta_raw)
            .map_err(|e| ModelError::MetadataInvalid(e.to_string()))?;
        meta.validate_layout()?;

        let session = Session::builder()
            .map_err(|e| ModelError::Session(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::Session(e.to_string()))?
            .commit_from_memory(&bytes)
            .map_err(|e| ModelError::Session(e.to_string()))?;

        tracing::info!(
            "ML model v{} loaded and verified (sha256 {}...)",
            meta.version,
            &hash[..16]
        );

        *self.state.write() = Some(LoadedModel { session, meta, hash });
        Ok(())
    }

    /// Load, demoting failure to a log line. Used at boot and on SIGHUP:
    /// the service stays up on the heuristic model either way.
    pub fn load_or_degrade(&self) {
        if let Err(e) = self.load() {
            tracing::error!("ML model unavailable, serving heuristic only: {e}");
        }
    }

    /// Drop the loaded model (artifact replaced by an unauthorized one).
    pub fn unload(&self) {
        *self.state.write() = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn status(&self) -> ModelStatus {
        let state = self.state.read();
        match state.as_ref() {
            Some(loaded) => ModelStatus {
                loaded: true,
                verified: true,
                version: Some(loaded.meta.version.clone()),
                hash_prefix: Some(loaded.hash[..16].to_string()),
                feature_count: FEATURE_COUNT,
            },
            None => ModelStatus {
                loaded: false,
                verified: false,
                version: None,
                hash_prefix: None,
                feature_count: FEATURE_COUNT,
            },
        }
    }

    /// Calibrated malicious probability in [0,1], or `None` when the
    /// model is unavailable.
    pub fn predict(&self, features: &FeatureVector) -> Option<f32> {
        let mut guard = self.state.write();
        let loaded = guard.as_mut()?;

        match run_inference(loaded, features) {
            Ok(p) => Some(p.clamp(0.0, 1.0)),
            Err(e) => {
                tracing::warn!("ML inference failed, falling back to heuristic: {e}");
                None
            }
        }
    }
}

fn run_inference(loaded: &mut LoadedModel, features: &FeatureVector) -> Result<f32, ModelError> {
    let raw = features.to_array();

    // standardize exactly as in training: (x - mean) / scale
    let mut standardized = [0.0f32; FEATURE_COUNT];
    for i in 0..FEATURE_COUNT {
        let scale = loaded.meta.scale[i].abs().max(1e-8);
        standardized[i] = (raw[i] - loaded.meta.mean[i]) / scale;
    }

    let input = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), standardized.to_vec())
        .map_err(|e| ModelError::Inference(e.to_string()))?;

    let output_name = loaded
        .session
        .outputs()
        .last()
        .map(|o| o.name().to_string())
        .ok_or_else(|| ModelError::Inference("model defines no outputs".into()))?;

    let input_tensor =
        Value::from_array(input).map_err(|e| ModelError::Inference(e.to_string()))?;

    let outputs = loaded
        .session
        .run(ort::inputs![input_tensor])
        .map_err(|e| ModelError::Inference(e.to_string()))?;

    let output = outputs
        .get(&output_name)
        .ok_or_else(|| ModelError::Inference("model produced no output".into()))?;

    let tensor = output
        .try_extract_tensor::<f32>()
        .map_err(|e| ModelError::Inference(e.to_string()))?;
    let data = tensor.1;

    // Binary classifiers export either [p_malicious] or
    // [p_benign, p_malicious]; the malicious probability is last.
    data.last()
        .copied()
        .ok_or_else(|| ModelError::Inference("empty output tensor".into()))
}

/// `models/url_classifier.onnx` → `models/url_classifier.meta.json`
fn metadata_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("meta.json")
}

// ============================================================================
// TESTS
// ============================================================================
