//! Optimistic mutator
//!
//! Applies a committed [`MoveIntent`] to the rendered tree right away, before
//! (or without) persisting it. The persisted store is never touched here; a
//! full reload always restores the stored state.
//!
//! - `inside`: the subtree becomes the last child of the target and every
//!   node in it gets `target.depth + 1 + distance`.
//! - `before` / `after`: the node joins the reference's sibling group next to
//!   it and takes the reference's depth and parent.
//!
//! Only the moved node's `parent_id` changes. Both affected sibling groups are
//! renumbered to `1..=N` so the visible tree already matches what the move
//! processor will store.

use crate::models::{MoveIntent, MovePosition, NodeId, NodeIndex, Tree};
use crate::operations::{is_descendant_of, placement};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Node '{0}' is not in the rendered tree")]
    UnknownNode(NodeId),

    #[error("Moving node '{node}' under '{parent}' would create a cycle")]
    WouldCreateCycle { node: NodeId, parent: NodeId },
}

/// What a mutation changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationSummary {
    pub old_parent: Option<NodeId>,
    pub new_parent: Option<NodeId>,
    /// Records whose order changed, across both groups
    pub renumbered: usize,
}

/// Apply `intent` to `tree` in place
pub fn apply_move(tree: &mut Tree, intent: &MoveIntent) -> Result<MutationSummary, MutationError> {
    let source = tree
        .index_of(&intent.node_id)
        .ok_or_else(|| MutationError::UnknownNode(intent.node_id.clone()))?;
    let old_parent_id = tree.node(source).parent_id.clone();

    let reference = intent.effective_reference();
    if reference == Some(&intent.node_id) {
        return Ok(MutationSummary {
            old_parent: old_parent_id.clone(),
            new_parent: old_parent_id,
            renumbered: 0,
        });
    }

    let target_parent = resolve_parent(tree, intent)?;
    if let Some(parent) = target_parent {
        if parent == source || is_descendant_of(tree, source, parent) {
            return Err(MutationError::WouldCreateCycle {
                node: intent.node_id.clone(),
                parent: tree.node(parent).id.clone(),
            });
        }
    }

    let old_parent = tree.detach(source);
    let position = {
        let group = tree.group(target_parent);
        let siblings = group.iter().map(|ix| &tree.node(*ix).id);
        placement(siblings, intent.position, reference).index(group.len())
    };
    tree.attach(source, target_parent, position);

    let depth = target_parent.map_or(0, |parent| tree.node(parent).depth + 1);
    tree.set_depth(source, depth);

    let mut renumbered = 0;
    if old_parent != target_parent {
        renumbered += tree.renumber(old_parent);
    }
    renumbered += tree.renumber(target_parent);

    let new_parent = tree.node(source).parent_id.clone();
    tracing::debug!(
        "Applied move of node {} from {:?} to {:?} ({} renumbered)",
        intent.node_id,
        old_parent_id,
        new_parent,
        renumbered
    );

    Ok(MutationSummary {
        old_parent: old_parent_id,
        new_parent,
        renumbered,
    })
}

// Before/after follow the reference's parent when it is rendered; otherwise
// the intent's parent is used and the node is appended there.
fn resolve_parent(tree: &Tree, intent: &MoveIntent) -> Result<Option<NodeIndex>, MutationError> {
    if intent.position != MovePosition::Inside {
        if let Some(reference) = intent.effective_reference().and_then(|id| tree.index_of(id)) {
            return Ok(tree.parent(reference));
        }
    }

    match &intent.new_parent_id {
        None => Ok(None),
        Some(parent) => tree
            .index_of(parent)
            .map(Some)
            .ok_or_else(|| MutationError::UnknownNode(parent.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TreeNode;
    use crate::operations::ordering::is_dense;

    fn id(value: i64) -> NodeId {
        NodeId::from(value)
    }

    // 1 ─ 2 ─ 3
    //   └ 4
    // 5
    // 6
    fn fixture() -> Tree {
        Tree::from_flat(vec![
            TreeNode::root(id(1), 1),
            TreeNode::new(id(2), Some(id(1)), 1),
            TreeNode::new(id(3), Some(id(2)), 1),
            TreeNode::new(id(4), Some(id(1)), 2),
            TreeNode::root(id(5), 2),
            TreeNode::root(id(6), 3),
        ])
    }

    fn group_ids(tree: &Tree, parent: Option<i64>) -> Vec<NodeId> {
        let parent = parent.map(|p| tree.index_of(&id(p)).unwrap());
        tree.group(parent)
            .iter()
            .map(|ix| tree.node(*ix).id.clone())
            .collect()
    }

    fn assert_all_dense(tree: &Tree) {
        let mut groups: std::collections::HashMap<Option<NodeId>, Vec<TreeNode>> =
            Default::default();
        for row in tree.render_rows() {
            groups.entry(row.parent_id.clone()).or_default().push(row);
        }
        for (parent, group) in groups {
            assert!(is_dense(&group), "group under {:?} is not dense", parent);
        }
    }

    #[test]
    fn test_reorder_before_at_root() {
        let mut tree = fixture();
        apply_move(&mut tree, &MoveIntent::before(id(6), None, id(1))).unwrap();
        assert_eq!(group_ids(&tree, None), vec![id(6), id(1), id(5)]);
        assert_eq!(tree.get(&id(6)).unwrap().order, 1);
        assert_all_dense(&tree);
    }

    #[test]
    fn test_inside_moves_subtree_and_recomputes_depth() {
        let mut tree = fixture();
        let summary = apply_move(&mut tree, &MoveIntent::inside(id(2), Some(id(5)))).unwrap();

        assert_eq!(summary.old_parent, Some(id(1)));
        assert_eq!(summary.new_parent, Some(id(5)));
        assert_eq!(group_ids(&tree, Some(5)), vec![id(2)]);
        assert_eq!(tree.get(&id(2)).unwrap().depth, 1);
        assert_eq!(tree.get(&id(3)).unwrap().depth, 2);
        // Child keeps its own parent
        assert_eq!(tree.get(&id(3)).unwrap().parent_id, Some(id(2)));
        // Old group closed its gap
        assert_eq!(tree.get(&id(4)).unwrap().order, 1);
        assert_all_dense(&tree);
    }

    #[test]
    fn test_moving_last_child_leaves_no_children() {
        let mut tree = fixture();
        apply_move(&mut tree, &MoveIntent::after(id(3), None, id(6))).unwrap();
        let two = tree.index_of(&id(2)).unwrap();
        assert!(!tree.has_children(two));
        assert_eq!(tree.get(&id(3)).unwrap().depth, 0);
        assert_eq!(tree.get(&id(3)).unwrap().parent_id, None);
    }

    #[test]
    fn test_reorder_takes_reference_parent_and_depth() {
        let mut tree = fixture();
        // Intent claims root, but the reference lives under 2
        apply_move(&mut tree, &MoveIntent::after(id(6), None, id(3))).unwrap();
        assert_eq!(tree.get(&id(6)).unwrap().parent_id, Some(id(2)));
        assert_eq!(tree.get(&id(6)).unwrap().depth, 2);
        assert_eq!(group_ids(&tree, Some(2)), vec![id(3), id(6)]);
    }

    #[test]
    fn test_missing_reference_appends_to_intent_parent() {
        let mut tree = fixture();
        apply_move(&mut tree, &MoveIntent::before(id(5), Some(id(1)), id(99))).unwrap();
        assert_eq!(group_ids(&tree, Some(1)), vec![id(2), id(4), id(5)]);
        assert_all_dense(&tree);
    }

    #[test]
    fn test_reference_self_is_noop() {
        let mut tree = fixture();
        let before = tree.render_rows();
        let summary = apply_move(&mut tree, &MoveIntent::after(id(5), None, id(5))).unwrap();
        assert_eq!(summary.renumbered, 0);
        assert_eq!(tree.render_rows(), before);
    }

    #[test]
    fn test_cycle_is_refused_and_tree_unchanged() {
        let mut tree = fixture();
        let before = tree.render_rows();
        let result = apply_move(&mut tree, &MoveIntent::inside(id(1), Some(id(3))));
        assert!(matches!(result, Err(MutationError::WouldCreateCycle { .. })));
        assert_eq!(tree.render_rows(), before);
    }

    #[test]
    fn test_unknown_node() {
        let mut tree = fixture();
        assert_eq!(
            apply_move(&mut tree, &MoveIntent::inside(id(42), None)),
            Err(MutationError::UnknownNode(id(42)))
        );
    }

    #[test]
    fn test_inside_root_appends_as_last_root() {
        let mut tree = fixture();
        apply_move(&mut tree, &MoveIntent::inside(id(4), None)).unwrap();
        assert_eq!(group_ids(&tree, None), vec![id(1), id(5), id(6), id(4)]);
        assert_eq!(tree.get(&id(4)).unwrap().order, 4);
    }
}
