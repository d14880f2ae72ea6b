//! Error taxonomy for the datasource core.
//!
//! Two failure classes are distinguished from ordinary storage errors:
//! configuration errors (the system cannot function until an operator fixes
//! the settings) and schema violations (one row or one property access is
//! bad, without poisoning the rest of a batch). Everything else flows
//! through `anyhow` at the storage seams.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration value is missing or malformed.
    ///
    /// Fatal for the current operation; never retried automatically.
    #[error("configuration error: {0}")]
    Config(String),

    /// A row or property access violated the fixed document schema.
    ///
    /// Fatal for the single document being constructed or read; other
    /// documents in the same batch are unaffected.
    #[error("schema violation on property '{property}': {message}")]
    Schema { property: String, message: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn schema(property: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            property: property.into(),
            message: message.into(),
        }
    }
}
