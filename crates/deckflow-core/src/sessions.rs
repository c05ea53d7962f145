//! Session aggregation over independently written stage records.

use crate::error::DeckflowCoreError;
use crate::types::{SessionGroup, SessionSummary};
use deckflow_config::SessionsConfig;
use deckflow_store::{
    OutlinePayload, StageKind, StageRecord, StageRecordStore, session_id_millis,
};
use log::{debug, info, warn};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Builds the unified, recency-ordered session view from stage records.
#[derive(Clone)]
pub struct SessionAggregator {
    /// Stage record access.
    store: StageRecordStore,
    /// Summary defaults and expiry policy.
    config: SessionsConfig,
}

impl SessionAggregator {
    /// Create an aggregator over `store`.
    pub fn new(store: StageRecordStore, config: SessionsConfig) -> Self {
        Self { store, config }
    }

    /// Underlying stage record store.
    pub fn store(&self) -> &StageRecordStore {
        &self.store
    }

    /// Every decodable stage record in the substrate.
    ///
    /// Keys without a stage prefix are ignored and corrupt values are skipped
    /// with a warning, so one bad record never hides the others. Records are
    /// ordered by `updatedAt` descending, then session id, then stage.
    pub fn list_all_sessions(&self) -> Vec<StageRecord> {
        let mut records = Vec::new();
        for key in self.store.substrate().keys() {
            let Some((stage, session_id)) = StageKind::split_key(&key) else {
                continue;
            };
            match self.store.read_value(stage, session_id) {
                Some(record) => records.push(record),
                None => debug!("skipping stage record while listing sessions (key={key})"),
            }
        }
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
                .then_with(|| a.stage.cmp(&b.stage))
        });
        debug!("listed stage records (count={})", records.len());
        records
    }

    /// Stage records grouped per session, newest session first.
    pub fn group_sessions(&self) -> Vec<SessionGroup> {
        let mut grouped: BTreeMap<String, Vec<StageRecord>> = BTreeMap::new();
        for record in self.list_all_sessions() {
            grouped
                .entry(record.session_id.clone())
                .or_default()
                .push(record);
        }
        let mut groups: Vec<SessionGroup> = grouped
            .into_iter()
            .map(|(session_id, mut records)| {
                records.sort_by_key(|record| record.stage);
                let updated_at = records
                    .iter()
                    .map(|record| record.updated_at)
                    .max()
                    .unwrap_or(0);
                SessionGroup {
                    session_id,
                    updated_at,
                    records,
                }
            })
            .collect();
        groups.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        groups
    }

    /// Progress label of the most recently updated stage of a session.
    ///
    /// On equal timestamps assembly wins over outline, and outline over
    /// editing. Sessions without records report the outline stage.
    pub fn get_progress(&self, session_id: &str) -> String {
        latest_record(&self.stage_records(session_id))
            .map(|record| record.progress.clone())
            .unwrap_or_else(|| StageKind::Outline.as_str().to_string())
    }

    /// Assemble the unified summary for one session.
    pub fn get_session_summary(&self, session_id: &str) -> SessionSummary {
        let records = self.stage_records(session_id);
        let progress = latest_record(&records)
            .map(|record| record.progress.clone())
            .unwrap_or_else(|| StageKind::Outline.as_str().to_string());
        let updated_at = records
            .iter()
            .map(|record| record.updated_at)
            .max()
            .unwrap_or_else(|| session_id_millis(session_id).unwrap_or(0));

        let outline = records
            .iter()
            .find(|record| record.stage == StageKind::Outline)
            .and_then(|record| match record.clone().into_typed::<OutlinePayload>() {
                Ok(record) => Some(record.payload),
                Err(err) => {
                    warn!("outline payload unreadable for summary (session_id={session_id}): {err}");
                    None
                }
            });

        let title = outline
            .as_ref()
            .and_then(|payload| title_from_outline(&payload.outline, self.config.title_max_chars))
            .unwrap_or_else(|| self.config.untitled_title.clone());
        let language = outline
            .as_ref()
            .map(|payload| payload.language.clone())
            .filter(|language| !language.is_empty())
            .unwrap_or_else(|| self.config.default_language.clone());
        let model = outline
            .as_ref()
            .map(|payload| payload.model.clone())
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| self.config.default_model.clone());

        SessionSummary {
            session_id: session_id.to_string(),
            title,
            outline: outline.map(|payload| payload.outline),
            progress,
            updated_at,
            created_at: session_id_millis(session_id),
            language,
            model,
        }
    }

    /// Summaries for every session, newest first.
    ///
    /// Ties on `updatedAt` are broken by ascending session id so the order
    /// never depends on substrate enumeration order.
    pub fn list_session_summaries(&self) -> Vec<SessionSummary> {
        let mut seen = HashSet::new();
        let mut summaries: Vec<SessionSummary> = self
            .list_all_sessions()
            .into_iter()
            .filter(|record| seen.insert(record.session_id.clone()))
            .map(|record| self.get_session_summary(&record.session_id))
            .collect();
        summaries.sort_by(|a, b| {
            (Reverse(a.updated_at), &a.session_id).cmp(&(Reverse(b.updated_at), &b.session_id))
        });
        summaries
    }

    /// Delete every stage record last updated more than `max_age` ago.
    ///
    /// Values that cannot be decoded are left in place. Returns the number of
    /// removed records.
    pub fn clear_expired(&self, max_age: Duration) -> Result<usize, DeckflowCoreError> {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.store.now_millis().saturating_sub(max_age_ms);
        let mut removed = 0;
        for key in self.store.substrate().keys() {
            let Some((stage, session_id)) = StageKind::split_key(&key) else {
                continue;
            };
            let Some(record) = self.store.read_value(stage, session_id) else {
                continue;
            };
            if record.updated_at < cutoff {
                self.store.remove(stage, session_id)?;
                removed += 1;
            }
        }
        info!("cleared expired stage records (removed={removed}, cutoff={cutoff})");
        Ok(removed)
    }

    /// Apply the configured expiry policy; a disabled policy removes nothing.
    pub fn clear_expired_with_policy(&self) -> Result<usize, DeckflowCoreError> {
        match self.config.max_age_ms {
            Some(max_age_ms) => self.clear_expired(Duration::from_millis(max_age_ms)),
            None => {
                debug!("session expiry disabled");
                Ok(0)
            }
        }
    }

    /// Existing records for a session, in stage order.
    pub fn stage_records(&self, session_id: &str) -> Vec<StageRecord> {
        StageKind::ALL
            .into_iter()
            .filter_map(|stage| self.store.read_value(stage, session_id))
            .collect()
    }
}

/// Newest record; equal timestamps resolve by [`tie_rank`].
fn latest_record(records: &[StageRecord]) -> Option<&StageRecord> {
    records
        .iter()
        .max_by_key(|record| (record.updated_at, tie_rank(record.stage)))
}

/// Precedence among records stamped in the same millisecond.
///
/// Legacy records of one session all share the id-derived timestamp, so this
/// order decides their progress.
fn tie_rank(stage: StageKind) -> u8 {
    match stage {
        StageKind::Assembly => 2,
        StageKind::Outline => 1,
        StageKind::Editing => 0,
    }
}

/// First outline line when it is non-empty and shorter than `max_chars`.
fn title_from_outline(outline: &str, max_chars: usize) -> Option<String> {
    let first_line = outline.split('\n').next()?.trim();
    if first_line.is_empty() || first_line.chars().count() >= max_chars {
        return None;
    }
    Some(first_line.to_string())
}

#[cfg(test)]
mod tests {
    use super::{tie_rank, title_from_outline};
    use deckflow_store::StageKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn tie_rank_orders_assembly_outline_editing() {
        assert!(tie_rank(StageKind::Assembly) > tie_rank(StageKind::Outline));
        assert!(tie_rank(StageKind::Outline) > tie_rank(StageKind::Editing));
    }

    #[test]
    fn title_uses_trimmed_first_line() {
        assert_eq!(
            title_from_outline("  Quarterly review \n## Agenda", 50),
            Some("Quarterly review".to_string())
        );
    }

    #[test]
    fn title_rejects_blank_or_long_first_lines() {
        assert_eq!(title_from_outline("\nSecond line", 50), None);
        assert_eq!(title_from_outline("", 50), None);
        assert_eq!(title_from_outline(&"x".repeat(50), 50), None);
        assert_eq!(
            title_from_outline(&"x".repeat(49), 50),
            Some("x".repeat(49))
        );
    }

    #[test]
    fn title_counts_characters_not_bytes() {
        let title = "季度总结汇报".repeat(5);
        assert_eq!(title_from_outline(&title, 50), Some(title.clone()));
    }
}
