//! Per-node expand/collapse flags

use crate::models::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Expand/collapse state for one tree instance.
///
/// Only explicit toggles are stored; every other node reports the configured
/// default. State survives reloads because it is keyed by `NodeId`, never by
/// arena position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandState {
    default_expanded: bool,
    #[serde(default)]
    overrides: HashMap<NodeId, bool>,
}

impl Default for ExpandState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ExpandState {
    pub fn new(default_expanded: bool) -> Self {
        Self {
            default_expanded,
            overrides: HashMap::new(),
        }
    }

    pub fn default_expanded(&self) -> bool {
        self.default_expanded
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.overrides
            .get(id)
            .copied()
            .unwrap_or(self.default_expanded)
    }

    /// Flip the flag for `id` and return the new value
    pub fn toggle(&mut self, id: &NodeId) -> bool {
        let next = !self.is_expanded(id);
        self.set(id.clone(), next);
        next
    }

    pub fn set(&mut self, id: NodeId, expanded: bool) {
        if expanded == self.default_expanded {
            self.overrides.remove(&id);
        } else {
            self.overrides.insert(id, expanded);
        }
    }

    /// Expand every node, including ones loaded later
    pub fn expand_all(&mut self) {
        self.default_expanded = true;
        self.overrides.clear();
    }

    /// Collapse every node, including ones loaded later
    pub fn collapse_all(&mut self) {
        self.default_expanded = false;
        self.overrides.clear();
    }

    /// Drop flags for nodes that no longer exist
    pub fn retain_known<'a>(&mut self, known: impl IntoIterator<Item = &'a NodeId>) {
        let known: std::collections::HashSet<&NodeId> = known.into_iter().collect();
        self.overrides.retain(|id, _| known.contains(id));
    }
}
