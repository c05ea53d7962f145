//! Stage record persistence for Deckflow.
//!
//! Workflow stages write their results under `"{stage}_{session id}"` keys in
//! a flat key-value substrate. This crate owns the substrate contract, the
//! record model, and the legacy-tolerant decode step.

pub mod clock;
pub mod decode;
pub mod error;
pub mod model;
pub mod stage;
pub mod store;
pub mod substrate;

/// Time sources.
pub use clock::{Clock, SystemClock};
/// Decode step for persisted values.
pub use decode::{DecodedRecord, session_id_millis};
/// Store error type.
pub use error::StoreError;
/// Record model and stage payloads.
pub use model::{
    AssemblyPayload, EditingPayload, OutlineImage, OutlinePayload, StagePayload, StageRecord,
};
/// Workflow stages.
pub use stage::StageKind;
/// Stage record store.
pub use store::StageRecordStore;
/// Substrate contract and implementations.
pub use substrate::{FileSubstrate, MemorySubstrate, Substrate};
