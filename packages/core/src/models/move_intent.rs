//! Move instructions
//!
//! A [`MoveIntent`] is produced by the drag state machine on a successful
//! drop, applied once to the rendered tree and then either forwarded to the
//! move processor straight away or parked in the pending batch.

use crate::models::NodeId;
use serde::{Deserialize, Serialize};

/// Where the moved node lands relative to the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePosition {
    Before,
    After,
    /// Last child of `new_parent_id`
    Inside,
}

/// A validated, not-yet-persisted instruction to relocate one node.
///
/// `reference_id` names the sibling to position against for `Before` and
/// `After`; it is ignored for `Inside`. A missing reference degrades to
/// "append as last" in both the mutator and the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub node_id: NodeId,

    #[serde(with = "crate::models::root_marker", default)]
    pub new_parent_id: Option<NodeId>,

    #[serde(default = "default_position")]
    pub position: MovePosition,

    #[serde(default)]
    pub reference_id: Option<NodeId>,
}

fn default_position() -> MovePosition {
    MovePosition::After
}

impl MoveIntent {
    /// Become the last child of `parent` (`None` = last root)
    pub fn inside(node_id: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            node_id,
            new_parent_id: parent,
            position: MovePosition::Inside,
            reference_id: None,
        }
    }

    pub fn before(node_id: NodeId, parent: Option<NodeId>, reference: NodeId) -> Self {
        Self {
            node_id,
            new_parent_id: parent,
            position: MovePosition::Before,
            reference_id: Some(reference),
        }
    }

    pub fn after(node_id: NodeId, parent: Option<NodeId>, reference: NodeId) -> Self {
        Self {
            node_id,
            new_parent_id: parent,
            position: MovePosition::After,
            reference_id: Some(reference),
        }
    }

    /// The reference that actually matters for placement, if any
    pub fn effective_reference(&self) -> Option<&NodeId> {
        match self.position {
            MovePosition::Inside => None,
            MovePosition::Before | MovePosition::After => self.reference_id.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format_matches_client_payload() {
        let payload = json!({
            "nodeId": 5,
            "newParentId": -1,
            "position": "after",
            "referenceId": 2
        });
        let intent: MoveIntent = serde_json::from_value(payload).unwrap();
        assert_eq!(intent, MoveIntent::after(NodeId::from(5), None, NodeId::from(2)));
    }

    #[test]
    fn test_inside_ignores_reference() {
        let mut intent = MoveIntent::inside(NodeId::from(5), Some(NodeId::from(1)));
        intent.reference_id = Some(NodeId::from(9));
        assert_eq!(intent.effective_reference(), None);
    }

    #[test]
    fn test_missing_fields_default_to_append_at_root() {
        let intent: MoveIntent = serde_json::from_value(json!({"nodeId": "abc"})).unwrap();
        assert_eq!(intent.new_parent_id, None);
        assert_eq!(intent.position, MovePosition::After);
        assert_eq!(intent.reference_id, None);
    }
}
