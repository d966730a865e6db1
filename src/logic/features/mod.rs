//! Feature Extraction
//!
//! - `layout.rs` — versioned 24-feature schema (single source of truth)
//! - `extract.rs` — total, pure extraction from a normalized URL context

pub mod extract;
pub mod layout;

pub use extract::{extract, shannon_entropy, FeatureVector};
pub use layout::{feature_index, feature_name, layout_hash, LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};

#[cfg(test)]
mod tests;
