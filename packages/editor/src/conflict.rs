//! # Conflict detection and auto-merge
//!
//! Three-way comparison at top-level-field granularity. A field counts as
//! changed on one side when its JSON value differs from the last-synced
//! baseline (a field present on only one side differs). When the local and
//! remote change sets are disjoint, the merge candidate is the remote
//! document with every locally changed field taken from the local one.
//!
//! Whole fields win or lose together: two edits to different nodes inside
//! `components` still overlap.

use chrono::{DateTime, Utc};
use screenkit_model::ScreenDocument;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Divergence between the local draft and the server copy
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftConflict {
    pub has_conflict: bool,
    pub message: String,
    pub expected_updated_at: Option<DateTime<Utc>>,
    pub server_updated_at: Option<DateTime<Utc>>,
    pub server_snapshot: ScreenDocument,
    pub auto_merged_snapshot: Option<ScreenDocument>,
    pub local_changes: BTreeSet<String>,
    pub remote_changes: BTreeSet<String>,
    pub overlapping: BTreeSet<String>,
}

/// Result of comparing baseline, local and remote
#[derive(Debug, Clone, PartialEq)]
pub struct MergeAnalysis {
    pub local_changes: BTreeSet<String>,
    pub remote_changes: BTreeSet<String>,
    pub overlapping: BTreeSet<String>,
    pub candidate: Option<ScreenDocument>,
}

impl MergeAnalysis {
    pub fn can_auto_merge(&self) -> bool {
        self.candidate.is_some()
    }
}

/// Top-level keys whose values differ between two JSON objects
pub fn changed_keys(base: &Map<String, Value>, other: &Map<String, Value>) -> BTreeSet<String> {
    base.keys()
        .chain(other.keys())
        .filter(|key| base.get(key.as_str()) != other.get(key.as_str()))
        .cloned()
        .collect()
}

/// Compare both sides against the baseline and build a candidate when possible.
///
/// Without a baseline every differing field is contested and there is no
/// candidate.
pub fn analyze(
    base: Option<&ScreenDocument>,
    local: &ScreenDocument,
    remote: &ScreenDocument,
) -> MergeAnalysis {
    let local_fields = local.top_level_fields();
    let remote_fields = remote.top_level_fields();

    let Some(base) = base else {
        let differing = changed_keys(&local_fields, &remote_fields);
        return MergeAnalysis {
            local_changes: differing.clone(),
            remote_changes: differing.clone(),
            overlapping: differing,
            candidate: None,
        };
    };

    let base_fields = base.top_level_fields();
    let local_changes = changed_keys(&base_fields, &local_fields);
    let remote_changes = changed_keys(&base_fields, &remote_fields);
    let overlapping: BTreeSet<String> = local_changes
        .intersection(&remote_changes)
        .cloned()
        .collect();

    let candidate = if overlapping.is_empty() {
        merge_fields(&local_fields, remote_fields, &local_changes)
    } else {
        None
    };

    MergeAnalysis {
        local_changes,
        remote_changes,
        overlapping,
        candidate,
    }
}

/// Auto-merge candidate, or `None` when both sides touched a common field
pub fn auto_merge(
    base: &ScreenDocument,
    local: &ScreenDocument,
    remote: &ScreenDocument,
) -> Option<ScreenDocument> {
    analyze(Some(base), local, remote).candidate
}

fn merge_fields(
    local: &Map<String, Value>,
    mut merged: Map<String, Value>,
    local_changes: &BTreeSet<String>,
) -> Option<ScreenDocument> {
    for key in local_changes {
        match local.get(key) {
            Some(value) => {
                merged.insert(key.clone(), value.clone());
            }
            None => {
                merged.remove(key);
            }
        }
    }

    match serde_json::from_value(Value::Object(merged)) {
        Ok(document) => Some(document),
        Err(err) => {
            tracing::warn!(error = %err, "merged fields do not form a valid document");
            None
        }
    }
}

impl DraftConflict {
    /// Build the conflict record for a diverged draft
    pub fn detect(
        base: Option<&ScreenDocument>,
        local: &ScreenDocument,
        remote: &ScreenDocument,
        expected_updated_at: Option<DateTime<Utc>>,
        server_updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        let analysis = analyze(base, local, remote);

        let message = if analysis.can_auto_merge() {
            "The screen was changed elsewhere. Your edits touch different fields and can be merged."
                .to_string()
        } else {
            let fields: Vec<&str> = analysis.overlapping.iter().map(String::as_str).collect();
            format!(
                "The screen was changed elsewhere. Both versions changed: {}",
                fields.join(", ")
            )
        };

        tracing::info!(
            document = %local.id,
            local = ?analysis.local_changes,
            remote = ?analysis.remote_changes,
            overlapping = ?analysis.overlapping,
            mergeable = analysis.can_auto_merge(),
            "draft conflict detected"
        );

        Self {
            has_conflict: true,
            message,
            expected_updated_at,
            server_updated_at,
            server_snapshot: remote.clone(),
            auto_merged_snapshot: analysis.candidate,
            local_changes: analysis.local_changes,
            remote_changes: analysis.remote_changes,
            overlapping: analysis.overlapping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenkit_model::{ActionSpec, ComponentNode, ComponentType, Layout, ScreenAction};

    fn base() -> ScreenDocument {
        let mut doc = ScreenDocument::new("orders", "Orders");
        doc.components = vec![ComponentNode::new("table_1", ComponentType::Table)];
        doc
    }

    #[test]
    fn test_disjoint_changes_merge() {
        let base = base();
        let mut local = base.clone();
        local.layout = Layout::Grid { columns: 2, gap: 8 };
        let mut remote = base.clone();
        remote
            .actions
            .push(ScreenAction::new("load", ActionSpec::new("orders.load")));

        let merged = auto_merge(&base, &local, &remote).unwrap();
        assert_eq!(merged.layout, local.layout);
        assert_eq!(merged.actions, remote.actions);
        assert_eq!(merged.components, base.components);
    }

    #[test]
    fn test_overlap_has_no_candidate() {
        let base = base();
        let mut local = base.clone();
        local.components.push(ComponentNode::new("text_1", ComponentType::Text));
        let mut remote = base.clone();
        remote.components.push(ComponentNode::new("badge_1", ComponentType::Badge));

        assert!(auto_merge(&base, &local, &remote).is_none());

        let conflict = DraftConflict::detect(Some(&base), &local, &remote, None, None);
        assert!(conflict.has_conflict);
        assert!(conflict.auto_merged_snapshot.is_none());
        assert!(conflict.overlapping.contains("components"));
        assert!(conflict.message.contains("components"));
        assert_eq!(conflict.server_snapshot, remote);
    }

    #[test]
    fn test_field_removed_locally_stays_removed() {
        let mut base = base();
        base.metadata.insert("owner".into(), serde_json::json!("ops"));
        let mut local = base.clone();
        local.metadata.clear();
        let mut remote = base.clone();
        remote.display_name = "Open orders".to_string();

        let merged = auto_merge(&base, &local, &remote).unwrap();
        assert!(merged.metadata.is_empty());
        assert_eq!(merged.display_name, "Open orders");
    }

    #[test]
    fn test_without_baseline_everything_is_contested() {
        let local = base();
        let mut remote = base();
        remote.display_name = "Renamed".to_string();

        let analysis = analyze(None, &local, &remote);
        assert!(analysis.candidate.is_none());
        assert_eq!(analysis.overlapping.len(), 1);
        assert!(analysis.overlapping.contains("displayName"));
    }

    #[test]
    fn test_changed_keys_counts_missing_fields() {
        let mut a = Map::new();
        a.insert("x".into(), serde_json::json!(1));
        a.insert("y".into(), serde_json::json!(2));
        let mut b = Map::new();
        b.insert("y".into(), serde_json::json!(2));
        b.insert("z".into(), serde_json::json!(3));

        let keys: Vec<_> = changed_keys(&a, &b).into_iter().collect();
        assert_eq!(keys, vec!["x", "z"]);
    }
}
