//! Error types for the session subsystem.

use deckflow_store::StoreError;
use thiserror::Error;

/// Errors returned by session and creation-flow operations.
#[derive(Debug, Error)]
pub enum DeckflowCoreError {
    /// Stage record storage failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The slide canvas rejected an update.
    #[error("canvas error: {0}")]
    Canvas(String),
}
