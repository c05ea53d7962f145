use std::sync::atomic::{AtomicUsize, Ordering};

/// Count source that replays a fixed script, repeating the last value.
#[derive(Debug)]
pub struct ScriptedCounter {
    values: Vec<usize>,
    calls: AtomicUsize,
}

impl ScriptedCounter {
    pub fn new(values: &[usize]) -> Self {
        Self {
            values: values.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Next scripted value; an empty script always reports zero.
    pub fn observe(&self) -> usize {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.values.get(call) {
            Some(value) => *value,
            None => self.values.last().copied().unwrap_or(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
