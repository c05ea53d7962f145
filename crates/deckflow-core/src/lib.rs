//! Session aggregation and canvas creation flows for Deckflow.
//!
//! This crate builds the unified session view over per-stage records and
//! owns the bounded wait used when a canvas creates objects without
//! returning a handle.

pub mod error;
pub mod sessions;
pub mod table;
pub mod types;
pub mod waiter;

pub use error::DeckflowCoreError;
/// Session aggregation over stage records.
pub use sessions::SessionAggregator;
pub use table::{
    ElementKind, HistorySink, SlideCanvas, TableAttach, TableCell, TableCellStyle,
    TableCreationFlow, ThemeStyle, build_cells,
};
pub use types::{SessionGroup, SessionSummary};
/// Bounded waits for fire-and-forget creation.
pub use waiter::{CreationOutcome, PollOptions, await_count_change, await_creation};
