//! Structural checks for candidate moves
//!
//! Pure functions over the rendered [`Tree`]. The drag state machine calls
//! [`evaluate_operations`] on every hover to tag each drop operation as
//! available or blocked; the move processor can call [`check_move`] to repeat
//! the acyclicity and depth checks against the persisted tree.
//!
//! Depth is measured over loaded descendants only. Nodes that were never
//! materialised (collapsed and not loaded) do not contribute to
//! [`subtree_depth`].

use crate::models::{MoveIntent, MovePosition, NodeId, NodeIndex, Tree};
use serde::Serialize;
use std::fmt;

/// Why a drop operation is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum BlockReason {
    DropOntoSelf,
    TargetIsDescendant,
    ExceedsMaxDepth { resulting: u32, max: u32 },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropOntoSelf => f.write_str("cannot drop a node onto itself"),
            Self::TargetIsDescendant => f.write_str("target is a descendant of the dragged node"),
            Self::ExceedsMaxDepth { resulting, max } => {
                write!(f, "resulting depth {} reaches the limit of {}", resulting, max)
            }
        }
    }
}

/// Availability of one drop operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Availability {
    Available,
    Blocked(BlockReason),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn block_reason(&self) -> Option<BlockReason> {
        match self {
            Self::Available => None,
            Self::Blocked(reason) => Some(*reason),
        }
    }

    fn from_check(check: Result<(), BlockReason>) -> Self {
        match check {
            Ok(()) => Self::Available,
            Err(reason) => Self::Blocked(reason),
        }
    }
}

/// Per-operation legality for one (source, target) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationAvailability {
    pub combine: Availability,
    pub reorder_before: Availability,
    pub reorder_after: Availability,
}

/// 0 for a leaf, otherwise `1 + max(subtree_depth(child))`.
///
/// Walks the arena links rather than trusting each record's cached depth.
pub fn subtree_depth(tree: &Tree, node: NodeIndex) -> u32 {
    let mut deepest = 0;
    let mut stack = vec![(node, 0u32)];
    while let Some((current, level)) = stack.pop() {
        deepest = deepest.max(level);
        stack.extend(tree.children(current).iter().map(|child| (*child, level + 1)));
    }
    deepest
}

/// True iff `node` sits anywhere below `candidate_ancestor`
pub fn is_descendant_of(tree: &Tree, candidate_ancestor: NodeIndex, node: NodeIndex) -> bool {
    tree.ancestors(node).any(|ancestor| ancestor == candidate_ancestor)
}

/// True iff a depth limit is set and
/// `target_depth + 1 + moving_subtree_depth >= max_depth`.
///
/// The boundary level itself counts as over the limit.
pub fn would_exceed_depth(target_depth: u32, moving_subtree_depth: u32, max_depth: Option<u32>) -> bool {
    match max_depth {
        Some(max) => target_depth + 1 + moving_subtree_depth >= max,
        None => false,
    }
}

fn check_not_self_or_descendant(
    tree: &Tree,
    source: NodeIndex,
    target: NodeIndex,
) -> Result<(), BlockReason> {
    if source == target {
        return Err(BlockReason::DropOntoSelf);
    }
    if is_descendant_of(tree, source, target) {
        return Err(BlockReason::TargetIsDescendant);
    }
    Ok(())
}

fn check_combine(
    tree: &Tree,
    source: NodeIndex,
    target: NodeIndex,
    max_depth: Option<u32>,
) -> Result<(), BlockReason> {
    check_not_self_or_descendant(tree, source, target)?;
    let target_depth = tree.node(target).depth;
    let moving = subtree_depth(tree, source);
    if would_exceed_depth(target_depth, moving, max_depth) {
        return Err(BlockReason::ExceedsMaxDepth {
            resulting: target_depth + 1 + moving,
            max: max_depth.unwrap_or_default(),
        });
    }
    Ok(())
}

/// Tag combine / reorder-before / reorder-after for dropping `source` on
/// `target`. Returns `None` when either node is not in the tree.
pub fn evaluate_operations(
    tree: &Tree,
    source: &NodeId,
    target: &NodeId,
    max_depth: Option<u32>,
) -> Option<OperationAvailability> {
    let source = tree.index_of(source)?;
    let target = tree.index_of(target)?;

    // Reordering keeps the nesting level, so depth is not re-checked
    let reorder = Availability::from_check(check_not_self_or_descendant(tree, source, target));
    Some(OperationAvailability {
        combine: Availability::from_check(check_combine(tree, source, target, max_depth)),
        reorder_before: reorder,
        reorder_after: reorder,
    })
}

/// Re-check a move against `tree` (usually the persisted one).
///
/// Unknown nodes pass: a missing moved node is the processor's silent no-op
/// and a missing reference degrades to append.
pub fn check_move(tree: &Tree, intent: &MoveIntent, max_depth: Option<u32>) -> Result<(), BlockReason> {
    let Some(source) = tree.index_of(&intent.node_id) else {
        return Ok(());
    };

    if let Some(reference) = intent.effective_reference().and_then(|id| tree.index_of(id)) {
        check_not_self_or_descendant(tree, source, reference)?;
    }

    let Some(parent) = intent.new_parent_id.as_ref().and_then(|id| tree.index_of(id)) else {
        return Ok(());
    };

    match intent.position {
        MovePosition::Inside => check_combine(tree, source, parent, max_depth),
        MovePosition::Before | MovePosition::After => {
            check_not_self_or_descendant(tree, source, parent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TreeNode;

    fn id(value: i64) -> NodeId {
        NodeId::from(value)
    }

    // 1 ─ 2 ─ 3
    //   └ 4
    // 5 ─ 6 ─ 7
    fn fixture() -> Tree {
        Tree::from_flat(vec![
            TreeNode::root(id(1), 1),
            TreeNode::new(id(2), Some(id(1)), 1),
            TreeNode::new(id(3), Some(id(2)), 1),
            TreeNode::new(id(4), Some(id(1)), 2),
            TreeNode::root(id(5), 2),
            TreeNode::new(id(6), Some(id(5)), 1),
            TreeNode::new(id(7), Some(id(6)), 1),
        ])
    }

    #[test]
    fn test_subtree_depth() {
        let tree = fixture();
        let ix = |n| tree.index_of(&id(n)).unwrap();
        assert_eq!(subtree_depth(&tree, ix(1)), 2);
        assert_eq!(subtree_depth(&tree, ix(2)), 1);
        assert_eq!(subtree_depth(&tree, ix(3)), 0);
    }

    #[test]
    fn test_is_descendant_of() {
        let tree = fixture();
        let ix = |n| tree.index_of(&id(n)).unwrap();
        assert!(is_descendant_of(&tree, ix(1), ix(3)));
        assert!(!is_descendant_of(&tree, ix(3), ix(1)));
        assert!(!is_descendant_of(&tree, ix(1), ix(1)));
        assert!(!is_descendant_of(&tree, ix(1), ix(6)));
    }

    #[test]
    fn test_would_exceed_depth_boundary_is_inclusive() {
        assert!(would_exceed_depth(2, 1, Some(3)));
        assert!(would_exceed_depth(1, 1, Some(3)));
        assert!(!would_exceed_depth(0, 1, Some(3)));
        assert!(!would_exceed_depth(50, 50, None));
    }

    #[test]
    fn test_combine_blocked_by_depth() {
        // A (depth 0, one child) inside a node at depth 2 with max 3: 2+1+1 = 4 >= 3
        let tree = fixture();
        let ops = evaluate_operations(&tree, &id(2), &id(7), Some(3)).unwrap();
        assert_eq!(
            ops.combine,
            Availability::Blocked(BlockReason::ExceedsMaxDepth { resulting: 4, max: 3 })
        );
        assert!(ops.reorder_before.is_available());
        assert!(ops.reorder_after.is_available());
    }

    #[test]
    fn test_all_operations_blocked_onto_self() {
        let tree = fixture();
        let ops = evaluate_operations(&tree, &id(2), &id(2), None).unwrap();
        for availability in [ops.combine, ops.reorder_before, ops.reorder_after] {
            assert_eq!(availability.block_reason(), Some(BlockReason::DropOntoSelf));
        }
    }

    #[test]
    fn test_all_operations_blocked_onto_descendant() {
        let tree = fixture();
        let ops = evaluate_operations(&tree, &id(1), &id(3), None).unwrap();
        for availability in [ops.combine, ops.reorder_before, ops.reorder_after] {
            assert_eq!(availability.block_reason(), Some(BlockReason::TargetIsDescendant));
        }
    }

    #[test]
    fn test_unknown_nodes_yield_none() {
        let tree = fixture();
        assert!(evaluate_operations(&tree, &id(99), &id(1), None).is_none());
    }

    #[test]
    fn test_check_move_rejects_inside_descendant() {
        let tree = fixture();
        let intent = MoveIntent::inside(id(1), Some(id(3)));
        assert_eq!(check_move(&tree, &intent, None), Err(BlockReason::TargetIsDescendant));
    }

    #[test]
    fn test_check_move_rejects_reference_self() {
        let tree = fixture();
        let intent = MoveIntent::before(id(2), Some(id(1)), id(2));
        assert_eq!(check_move(&tree, &intent, None), Err(BlockReason::DropOntoSelf));
    }

    #[test]
    fn test_check_move_ignores_depth_for_reorder() {
        let tree = fixture();
        let intent = MoveIntent::after(id(2), Some(id(6)), id(7));
        assert_eq!(check_move(&tree, &intent, Some(2)), Ok(()));
    }

    #[test]
    fn test_check_move_passes_unknown_node() {
        let tree = fixture();
        let intent = MoveIntent::inside(id(42), Some(id(1)));
        assert_eq!(check_move(&tree, &intent, Some(1)), Ok(()));
    }
}
