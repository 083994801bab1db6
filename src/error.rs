//! Error types for the partial store.

use thiserror::Error;

/// Main error type for store operations.
///
/// The derivation runtime itself never fails: missing fields resolve to
/// null, selections are taken as given, and dispatch is a passthrough.
/// Errors only arise at the interface edges, when parsing a selection
/// from a JSON value or decoding a snapshot into a typed value.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Deserialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
