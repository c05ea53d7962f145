//! Decoding of persisted stage values, including records written before
//! progress and timestamps were tracked.

use crate::model::StageRecord;
use crate::stage::StageKind;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Wire shape of a stored value; bookkeeping fields are optional.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    progress: Option<String>,
    #[serde(default, rename = "updatedAt")]
    updated_at: Option<i64>,
    #[serde(default, rename = "createdAt")]
    created_at: Option<i64>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

/// A stored value classified by which bookkeeping fields it carries.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRecord {
    /// All bookkeeping fields are present.
    Current {
        payload: Map<String, Value>,
        progress: String,
        created_at: i64,
        updated_at: i64,
    },
    /// At least one bookkeeping field is missing or empty.
    Legacy {
        payload: Map<String, Value>,
        progress: Option<String>,
        created_at: Option<i64>,
        updated_at: Option<i64>,
    },
}

impl DecodedRecord {
    /// Decode a stored JSON object.
    ///
    /// Empty labels and zero timestamps count as missing.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        let record: RawRecord = serde_json::from_str(raw)?;
        let progress = record.progress.filter(|label| !label.is_empty());
        let created_at = record.created_at.filter(|ts| *ts != 0);
        let updated_at = record.updated_at.filter(|ts| *ts != 0);
        Ok(match (progress, created_at, updated_at) {
            (Some(progress), Some(created_at), Some(updated_at)) => DecodedRecord::Current {
                payload: record.payload,
                progress,
                created_at,
                updated_at,
            },
            (progress, created_at, updated_at) => DecodedRecord::Legacy {
                payload: record.payload,
                progress,
                created_at,
                updated_at,
            },
        })
    }

    /// Whether default filling will be needed.
    pub fn is_legacy(&self) -> bool {
        matches!(self, DecodedRecord::Legacy { .. })
    }

    /// Normalize into the current record shape, back-filling legacy gaps from
    /// the stage name and the session id.
    pub fn normalize(self, stage: StageKind, session_id: &str) -> StageRecord {
        match self {
            DecodedRecord::Current {
                payload,
                progress,
                created_at,
                updated_at,
            } => StageRecord {
                session_id: session_id.to_string(),
                stage,
                payload: Value::Object(payload),
                progress,
                created_at,
                updated_at,
            },
            DecodedRecord::Legacy {
                payload,
                progress,
                created_at,
                updated_at,
            } => {
                let fallback = session_id_millis(session_id).unwrap_or(0);
                let created_at = created_at.unwrap_or(fallback);
                let updated_at = updated_at.unwrap_or(fallback).max(created_at);
                StageRecord {
                    session_id: session_id.to_string(),
                    stage,
                    payload: Value::Object(payload),
                    progress: progress.unwrap_or_else(|| stage.as_str().to_string()),
                    created_at,
                    updated_at,
                }
            }
        }
    }
}

/// Interpret a session id as the millisecond timestamp it was generated from.
///
/// Ids supplied by callers need not be numeric; those yield `None`.
pub fn session_id_millis(session_id: &str) -> Option<i64> {
    session_id.trim().parse::<i64>().ok()
}
