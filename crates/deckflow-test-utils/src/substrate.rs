use deckflow_store::{MemorySubstrate, StoreError, Substrate};
use parking_lot::Mutex;

/// Error a [`FailingSubstrate`] returns from writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    Quota { limit: usize },
    Io,
}

/// In-memory substrate whose writes can be switched to fail.
///
/// Reads and removals always go to the backing memory.
#[derive(Debug)]
pub struct FailingSubstrate {
    inner: MemorySubstrate,
    failure: Mutex<Option<WriteFailure>>,
}

impl FailingSubstrate {
    pub fn new(failure: WriteFailure) -> Self {
        Self {
            inner: MemorySubstrate::new(),
            failure: Mutex::new(Some(failure)),
        }
    }

    pub fn quota(limit: usize) -> Self {
        Self::new(WriteFailure::Quota { limit })
    }

    pub fn io() -> Self {
        Self::new(WriteFailure::Io)
    }

    /// Store a value directly, bypassing the configured failure.
    pub fn seed(&self, key: &str, value: &str) {
        if let Err(err) = self.inner.set_item(key, value) {
            panic!("seeding {key} failed: {err}");
        }
    }

    /// Change the failure; `None` lets writes through.
    pub fn set_failure(&self, failure: Option<WriteFailure>) {
        *self.failure.lock() = failure;
    }
}

impl Substrate for FailingSubstrate {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match *self.failure.lock() {
            Some(WriteFailure::Quota { limit }) => Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                limit,
            }),
            Some(WriteFailure::Io) => Err(StoreError::Io(std::io::Error::other(
                "simulated write failure",
            ))),
            None => self.inner.set_item(key, value),
        }
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove_item(key)
    }

    fn key(&self, index: usize) -> Option<String> {
        self.inner.key(index)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
