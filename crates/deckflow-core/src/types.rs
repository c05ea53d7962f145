//! Session views derived from stage records.

use deckflow_store::StageRecord;
use serde::Serialize;

/// Unified view of one workflow session across all of its stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: String,
    /// First outline line, or the configured placeholder.
    pub title: String,
    /// Raw outline text when an outline record exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,
    /// Progress label of the most recently updated stage.
    pub progress: String,
    /// Latest update across every stage record of the session.
    pub updated_at: i64,
    /// Session id read as a timestamp; `None` for non-numeric ids.
    pub created_at: Option<i64>,
    /// Output language from the outline stage, or the default.
    pub language: String,
    /// Generation model from the outline stage, or the default.
    pub model: String,
}

/// Every decodable stage record of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGroup {
    /// Session identifier.
    pub session_id: String,
    /// Latest update across the records.
    pub updated_at: i64,
    /// Records in stage order.
    pub records: Vec<StageRecord>,
}
