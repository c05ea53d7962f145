use deckflow_core::{DeckflowCoreError, ElementKind, HistorySink, SlideCanvas};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// When a [`FakeCanvas`] materializes a requested table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMode {
    Immediate,
    /// Added by a spawned task after the delay; needs a tokio runtime.
    Delayed(Duration),
    Never,
}

#[derive(Debug, Default)]
struct CanvasState {
    tables: Vec<String>,
    updates: Vec<(String, Map<String, Value>)>,
    requests: Vec<(usize, usize)>,
    next_id: usize,
}

impl CanvasState {
    fn add_table(&mut self) {
        self.next_id += 1;
        let id = format!("table-{}", self.next_id);
        self.tables.push(id);
    }
}

/// Slide canvas that records requests and updates.
#[derive(Debug, Clone)]
pub struct FakeCanvas {
    state: Arc<Mutex<CanvasState>>,
    mode: CreationMode,
    reject_updates: bool,
}

impl FakeCanvas {
    pub fn new(mode: CreationMode) -> Self {
        Self {
            state: Arc::new(Mutex::new(CanvasState::default())),
            mode,
            reject_updates: false,
        }
    }

    /// Start with `count` tables already on the slide.
    pub fn with_tables(self, count: usize) -> Self {
        {
            let mut state = self.state.lock();
            for _ in 0..count {
                state.add_table();
            }
        }
        self
    }

    pub fn with_rejected_updates(mut self) -> Self {
        self.reject_updates = true;
        self
    }

    /// Add a table as if another creator placed it.
    pub fn add_foreign_table(&self) {
        self.state.lock().add_table();
    }

    pub fn table_ids(&self) -> Vec<String> {
        self.state.lock().tables.clone()
    }

    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.state.lock().requests.clone()
    }

    pub fn updates(&self) -> Vec<(String, Map<String, Value>)> {
        self.state.lock().updates.clone()
    }
}

impl SlideCanvas for FakeCanvas {
    fn create_table(&self, rows: usize, cols: usize) {
        self.state.lock().requests.push((rows, cols));
        match self.mode {
            CreationMode::Immediate => self.state.lock().add_table(),
            CreationMode::Delayed(delay) => {
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    state.lock().add_table();
                });
            }
            CreationMode::Never => {}
        }
    }

    fn element_ids(&self, kind: ElementKind) -> Vec<String> {
        match kind {
            ElementKind::Table => self.state.lock().tables.clone(),
            _ => Vec::new(),
        }
    }

    fn update_element(&self, id: &str, props: Map<String, Value>) -> Result<(), DeckflowCoreError> {
        if self.reject_updates {
            return Err(DeckflowCoreError::Canvas(format!("update rejected for {id}")));
        }
        self.state.lock().updates.push((id.to_string(), props));
        Ok(())
    }
}

/// History sink that counts snapshots.
#[derive(Debug, Default)]
pub struct RecordingHistory {
    snapshots: AtomicUsize,
}

impl RecordingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }
}

impl HistorySink for RecordingHistory {
    fn add_snapshot(&self) {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
    }
}
