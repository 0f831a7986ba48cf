//! Ordered multi-selection over component ids.
//!
//! The primary id is the most recently selected one; range selection
//! extends from it. Range order comes from a depth-first id list the caller
//! computes fresh from the current tree.

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
    primary: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Single select
    pub fn select(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.ids = vec![id.clone()];
        self.primary = Some(id);
    }

    /// Add or remove one id, keeping the order of the rest
    pub fn toggle(&mut self, id: &str) {
        if self.contains(id) {
            self.ids.retain(|selected| selected != id);
            if self.primary.as_deref() == Some(id) {
                self.primary = self.ids.last().cloned();
            }
        } else {
            self.ids.push(id.to_string());
            self.primary = Some(id.to_string());
        }
    }

    /// Select everything between the primary id and `id`, inclusive
    pub fn select_range(&mut self, order: &[String], id: &str) {
        let Some(end) = order.iter().position(|candidate| candidate == id) else {
            return;
        };
        let start = self
            .primary
            .as_ref()
            .and_then(|anchor| order.iter().position(|candidate| candidate == anchor));

        match start {
            Some(start) => {
                let (low, high) = if start <= end { (start, end) } else { (end, start) };
                self.ids = order[low..=high].to_vec();
                self.primary = Some(id.to_string());
            }
            None => self.select(id),
        }
    }

    pub fn select_all(&mut self, order: &[String]) {
        self.ids = order.to_vec();
        self.primary = order.last().cloned();
    }

    /// Replace the selection with `ids`, the last one primary
    pub fn set(&mut self, ids: Vec<String>) {
        self.primary = ids.last().cloned();
        self.ids = ids;
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
    }

    /// Drop ids that no longer exist.
    ///
    /// A removed primary falls back to the nearest earlier surviving id in
    /// the selection list, then to the last survivor, then to nothing.
    pub fn prune(&mut self, existing: &HashSet<String>) {
        if self.ids.iter().all(|id| existing.contains(id)) {
            if let Some(primary) = &self.primary {
                if !existing.contains(primary) {
                    self.primary = self.ids.last().cloned();
                }
            }
            return;
        }

        let fallback = self.primary.as_ref().and_then(|primary| {
            let position = self.ids.iter().position(|id| id == primary)?;
            self.ids[..position]
                .iter()
                .rev()
                .find(|id| existing.contains(*id))
                .cloned()
        });

        self.ids.retain(|id| existing.contains(id));
        let primary_alive = self
            .primary
            .as_ref()
            .map(|primary| existing.contains(primary))
            .unwrap_or(false);

        if !primary_alive {
            self.primary = fallback.or_else(|| self.ids.last().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Vec<String> {
        ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_toggle_keeps_order() {
        let mut selection = Selection::new();
        selection.select("b");
        selection.toggle("d");
        selection.toggle("a");
        assert_eq!(selection.ids(), ["b", "d", "a"]);
        assert_eq!(selection.primary(), Some("a"));

        selection.toggle("a");
        assert_eq!(selection.ids(), ["b", "d"]);
        assert_eq!(selection.primary(), Some("d"));
    }

    #[test]
    fn test_range_in_both_directions() {
        let mut selection = Selection::new();
        selection.select("d");
        selection.select_range(&order(), "b");
        assert_eq!(selection.ids(), ["b", "c", "d"]);
        assert_eq!(selection.primary(), Some("b"));

        selection.select_range(&order(), "e");
        assert_eq!(selection.ids(), ["b", "c", "d", "e"]);

        selection.select_range(&order(), "missing");
        assert_eq!(selection.len(), 4);
    }

    #[test]
    fn test_range_without_anchor_selects_single() {
        let mut selection = Selection::new();
        selection.select_range(&order(), "c");
        assert_eq!(selection.ids(), ["c"]);
    }

    #[test]
    fn test_prune_falls_back_to_previous() {
        let mut selection = Selection::new();
        selection.set(vec!["a".into(), "c".into(), "e".into()]);
        let existing: HashSet<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        selection.prune(&existing);
        assert_eq!(selection.ids(), ["a", "c"]);
        assert_eq!(selection.primary(), Some("c"));

        selection.prune(&HashSet::new());
        assert!(selection.is_empty());
        assert_eq!(selection.primary(), None);
    }
}
