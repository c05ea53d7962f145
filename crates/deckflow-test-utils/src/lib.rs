//! Test helpers shared across Deckflow crates.

pub mod canvas;
pub mod clock;
pub mod counter;
pub mod substrate;

pub use canvas::{CreationMode, FakeCanvas, RecordingHistory};
pub use clock::ManualClock;
pub use counter::ScriptedCounter;
pub use substrate::{FailingSubstrate, WriteFailure};
