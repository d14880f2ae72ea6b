//! Harvest context identity.
//!
//! Cursor state for a paged harvest is scoped by a context key: a stable
//! hash over the (index, datasource, bundle-set) combination. The hash
//! input is defined explicitly (length-prefixed fields, sorted bundles)
//! rather than relying on any serialization format, so keys are portable
//! across processes and stable under bundle insertion order.

use sha2::{Digest, Sha256};

/// Plugin identifier of this datasource. Indexes declare it to opt in.
pub const DATASOURCE_ID: &str = "custom_tables_datasource";

/// State-store key prefix for persisted harvest cursors.
pub const TRACKING_PAGE_STATE_KEY: &str = "rowdex.custom_tables_datasource.last_ids";

/// Identity of one paged-harvest context.
#[derive(Debug, Clone)]
pub struct TrackingContext {
    pub index_id: String,
    pub datasource_id: String,
    pub bundles: Vec<String>,
}

impl TrackingContext {
    pub fn new(index_id: impl Into<String>, bundles: Vec<String>) -> Self {
        Self {
            index_id: index_id.into(),
            datasource_id: DATASOURCE_ID.to_string(),
            bundles,
        }
    }

    /// Stable hash identifying this (index, datasource, bundle-set)
    /// combination. Same logical combination always yields the same key.
    pub fn context_key(&self) -> String {
        let mut bundles: Vec<&str> = self.bundles.iter().map(|b| b.as_str()).collect();
        bundles.sort_unstable();
        bundles.dedup();

        let mut hasher = Sha256::new();
        for field in [self.index_id.as_str(), self.datasource_id.as_str()] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update((bundles.len() as u64).to_le_bytes());
        for bundle in bundles {
            hasher.update((bundle.len() as u64).to_le_bytes());
            hasher.update(bundle.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Full state-store key for this context's cursor.
    pub fn state_key(&self) -> String {
        format!("{}.{}", TRACKING_PAGE_STATE_KEY, self.context_key())
    }
}
