//! Model Integrity Verifier
//!
//! The serialized classifier is deserialized by a runtime that trusts its
//! input, so the artifact bytes are hashed and compared against the
//! configured authorized SHA-256 BEFORE any parsing happens. On mismatch
//! the loader refuses and the process keeps serving on the heuristic
//! model.

use std::path::Path;

use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("cannot read model artifact {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("no authorized model hash configured")]
    NoAuthorizedHash,

    #[error("model hash mismatch: expected {expected}, calculated {calculated}")]
    HashMismatch { expected: String, calculated: String },
}

/// Hex SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Read the artifact and verify it against the authorized hash.
/// Returns the verified bytes together with the calculated hash.
pub fn verify_artifact(path: &Path, authorized: &str) -> Result<(Vec<u8>, String), IntegrityError> {
    if authorized.is_empty() {
        return Err(IntegrityError::NoAuthorizedHash);
    }

    let bytes = std::fs::read(path).map_err(|source| IntegrityError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let calculated = sha256_hex(&bytes);
    if !calculated.eq_ignore_ascii_case(authorized) {
        return Err(IntegrityError::HashMismatch {
            expected: authorized.to_lowercase(),
            calculated,
        });
    }

    Ok((bytes, calculated))
}

// ============================================================================
// TESTS
// ============================================================================
