//! Workflow stage kinds and their storage key layout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One phase of the authoring workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageKind {
    /// Outline generation.
    #[serde(rename = "outline")]
    Outline,
    /// Presentation assembly.
    #[serde(rename = "ppt")]
    Assembly,
    /// Editing.
    #[serde(rename = "editor")]
    Editing,
}

impl StageKind {
    /// Every stage, in workflow order.
    pub const ALL: [StageKind; 3] = [StageKind::Outline, StageKind::Assembly, StageKind::Editing];

    /// Wire name used as key prefix and as the default progress label.
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Outline => "outline",
            StageKind::Assembly => "ppt",
            StageKind::Editing => "editor",
        }
    }

    /// Substrate key for this stage and session.
    pub fn storage_key(self, session_id: &str) -> String {
        format!("{}_{session_id}", self.as_str())
    }

    /// Split a substrate key into its stage and session id.
    ///
    /// Returns `None` for keys that do not carry a known stage prefix.
    pub fn split_key(key: &str) -> Option<(StageKind, &str)> {
        Self::ALL.into_iter().find_map(|stage| {
            key.strip_prefix(stage.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|session_id| (stage, session_id))
        })
    }

    /// Parse a stage from its wire name or its descriptive name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "outline" => Some(StageKind::Outline),
            "ppt" | "assembly" => Some(StageKind::Assembly),
            "editor" | "editing" => Some(StageKind::Editing),
            _ => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| format!("unknown stage: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::StageKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn storage_keys_use_wire_prefixes() {
        assert_eq!(StageKind::Outline.storage_key("17"), "outline_17");
        assert_eq!(StageKind::Assembly.storage_key("17"), "ppt_17");
        assert_eq!(StageKind::Editing.storage_key("17"), "editor_17");
    }

    #[test]
    fn split_key_extracts_session_id() {
        assert_eq!(
            StageKind::split_key("ppt_1700000000000"),
            Some((StageKind::Assembly, "1700000000000"))
        );
        assert_eq!(
            StageKind::split_key("editor_a_b"),
            Some((StageKind::Editing, "a_b"))
        );
        assert_eq!(StageKind::split_key("pptx_1"), None);
        assert_eq!(StageKind::split_key("theme"), None);
    }

    #[test]
    fn parse_accepts_both_names() {
        assert_eq!("ppt".parse::<StageKind>(), Ok(StageKind::Assembly));
        assert_eq!("Editing".parse::<StageKind>(), Ok(StageKind::Editing));
        assert!("slides".parse::<StageKind>().is_err());
    }
}
