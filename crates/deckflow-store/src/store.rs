//! Timestamp-aware stage record access over a substrate.

use crate::clock::{Clock, SystemClock};
use crate::decode::DecodedRecord;
use crate::error::StoreError;
use crate::model::{StagePayload, StageRecord};
use crate::stage::StageKind;
use crate::substrate::Substrate;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Typed get/set of stage records keyed by `(stage, session id)`.
#[derive(Clone)]
pub struct StageRecordStore {
    /// Backing key-value storage.
    substrate: Arc<dyn Substrate>,
    /// Time source for record stamps and generated session ids.
    clock: Arc<dyn Clock>,
}

impl StageRecordStore {
    /// Create a store stamped by the system clock.
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self::with_clock(substrate, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source.
    pub fn with_clock(substrate: Arc<dyn Substrate>, clock: Arc<dyn Clock>) -> Self {
        Self { substrate, clock }
    }

    /// Backing substrate handle.
    pub fn substrate(&self) -> &Arc<dyn Substrate> {
        &self.substrate
    }

    /// Current time according to the store's clock.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Write a stage payload with the stage name as progress label.
    ///
    /// See [`StageRecordStore::write_stage`].
    pub fn write<P: StagePayload>(
        &self,
        payload: &P,
        session_id: Option<&str>,
    ) -> Result<String, StoreError> {
        self.write_stage(P::STAGE, payload, session_id, P::STAGE.as_str())
    }

    /// Write a stage payload with an explicit progress label.
    pub fn write_with_progress<P: StagePayload>(
        &self,
        payload: &P,
        session_id: Option<&str>,
        progress: &str,
    ) -> Result<String, StoreError> {
        self.write_stage(P::STAGE, payload, session_id, progress)
    }

    /// Persist `payload` for `stage` and return the resolved session id.
    ///
    /// Without a session id (or with an empty one) a new id is generated from
    /// the current millisecond; two writes in the same millisecond would
    /// collide, so callers needing stronger uniqueness must pass their own id.
    /// An existing record keeps its `createdAt`; `updatedAt` never moves
    /// backwards for a key.
    pub fn write_stage<T: Serialize + ?Sized>(
        &self,
        stage: StageKind,
        payload: &T,
        session_id: Option<&str>,
        progress: &str,
    ) -> Result<String, StoreError> {
        let now = self.clock.now_millis();
        let session_id = match session_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => now.to_string(),
        };

        let Value::Object(mut fields) = serde_json::to_value(payload)? else {
            return Err(StoreError::InvalidPayload(stage));
        };

        let (created_at, updated_at) = match self.read_value(stage, &session_id) {
            Some(existing) => {
                let updated_at = now.max(existing.updated_at);
                (existing.created_at.min(updated_at), updated_at)
            }
            None => (now, now),
        };

        fields.insert("progress".to_string(), Value::String(progress.to_string()));
        fields.insert("updatedAt".to_string(), Value::from(updated_at));
        fields.insert("createdAt".to_string(), Value::from(created_at));

        let key = stage.storage_key(&session_id);
        let serialized = serde_json::to_string(&Value::Object(fields))?;
        self.substrate.set_item(&key, &serialized)?;
        debug!(
            "stored stage record (key={}, progress={}, updated_at={})",
            key, progress, updated_at
        );
        Ok(session_id)
    }

    /// Read a typed stage record.
    ///
    /// Values that fail to decode, or whose payload does not match `P`, are
    /// reported as absent.
    pub fn read<P: StagePayload>(&self, session_id: &str) -> Option<StageRecord<P>> {
        let record = self.read_value(P::STAGE, session_id)?;
        match record.into_typed() {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    "ignoring stage record with unexpected payload (key={}): {err}",
                    P::STAGE.storage_key(session_id)
                );
                None
            }
        }
    }

    /// Read a stage record with an untyped payload.
    ///
    /// Legacy values are back-filled; corrupt values are logged and treated
    /// as absent.
    pub fn read_value(&self, stage: StageKind, session_id: &str) -> Option<StageRecord> {
        let key = stage.storage_key(session_id);
        let raw = self.substrate.get_item(&key)?;
        match DecodedRecord::decode(&raw) {
            Ok(decoded) => {
                if decoded.is_legacy() {
                    debug!("back-filling legacy stage record (key={key})");
                }
                Some(decoded.normalize(stage, session_id))
            }
            Err(err) => {
                warn!("ignoring unparseable stage record (key={key}): {err}");
                None
            }
        }
    }

    /// Delete the record for `stage` and `session_id`; missing keys are fine.
    pub fn remove(&self, stage: StageKind, session_id: &str) -> Result<(), StoreError> {
        let key = stage.storage_key(session_id);
        self.substrate.remove_item(&key)?;
        debug!("removed stage record (key={key})");
        Ok(())
    }
}
