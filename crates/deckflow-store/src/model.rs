//! Stage record model and the typed payloads written by each stage.

use crate::stage::StageKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload type bound to a single workflow stage.
pub trait StagePayload: Serialize + DeserializeOwned {
    /// Stage this payload is stored under.
    const STAGE: StageKind;
}

/// A stage record after decoding and default filling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord<P = Value> {
    /// Session the record belongs to.
    pub session_id: String,
    /// Stage the record was written by.
    pub stage: StageKind,
    /// Stage-specific data.
    pub payload: P,
    /// Finer-grained state within the stage.
    pub progress: String,
    /// First write for this stage and session, in epoch milliseconds.
    pub created_at: i64,
    /// Most recent write, in epoch milliseconds.
    pub updated_at: i64,
}

impl StageRecord<Value> {
    /// Convert the untyped payload into a stage payload type.
    pub fn into_typed<P: StagePayload>(self) -> Result<StageRecord<P>, serde_json::Error> {
        let payload = serde_json::from_value(self.payload)?;
        Ok(StageRecord {
            session_id: self.session_id,
            stage: self.stage,
            payload,
            progress: self.progress,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Image attached to an outline request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineImage {
    /// Encoded image data.
    pub data: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Original file name.
    pub name: String,
}

/// Data produced by the outline generation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutlinePayload {
    /// Generated outline text; its first line doubles as the session title.
    #[serde(default)]
    pub outline: String,
    /// Output language chosen for generation.
    #[serde(default)]
    pub language: String,
    /// Model chosen for generation.
    #[serde(default)]
    pub model: String,
    /// Reference images uploaded with the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<OutlineImage>>,
}

impl StagePayload for OutlinePayload {
    const STAGE: StageKind = StageKind::Outline;
}

/// Data produced by the presentation assembly stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssemblyPayload {
    /// Slide collection, opaque to this crate.
    #[serde(default)]
    pub slides: Vec<Value>,
    /// Theme definition, opaque to this crate.
    #[serde(default)]
    pub theme: Value,
    /// Content the user filled into the outline sections.
    #[serde(
        default,
        rename = "userSections",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_sections: Option<Vec<Value>>,
}

impl StagePayload for AssemblyPayload {
    const STAGE: StageKind = StageKind::Assembly;
}

/// Free-form data recorded by the editing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EditingPayload {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StagePayload for EditingPayload {
    const STAGE: StageKind = StageKind::Editing;
}
