//! Error types for stage record storage.

use crate::stage::StageKind;

/// Errors returned by substrates and the stage record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The substrate refused a write because it would exceed its capacity.
    #[error("storage quota exceeded writing {key} (limit={limit} bytes)")]
    QuotaExceeded { key: String, limit: usize },
    /// The payload did not serialize to a JSON object.
    #[error("payload for stage {0} must serialize to a JSON object")]
    InvalidPayload(StageKind),
}
