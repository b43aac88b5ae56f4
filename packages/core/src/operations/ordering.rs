//! Dense sibling ordering
//!
//! Sibling groups are always stored as `1..=N`. Rather than computing
//! fractional positions between neighbours, every move rewrites the affected
//! groups sequentially and only records whose value actually changed are
//! written back.
//!
//! Shared by the optimistic mutator (over the arena) and the move processor
//! (over store records), so both sides agree on where a node lands.

use crate::models::{MovePosition, NodeId, TreeNode};

/// Where a moved node goes inside its new sibling group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Insert at this index of the group (moved node excluded)
    At(usize),
    /// Reference missing, or `Inside`: become the last sibling
    Append,
}

impl Placement {
    pub fn index(self, group_len: usize) -> usize {
        match self {
            Self::At(index) => index.min(group_len),
            Self::Append => group_len,
        }
    }
}

/// Resolve `position`/`reference` against the sibling ids of the target group.
///
/// `siblings` must not contain the moved node.
pub fn placement<'a>(
    siblings: impl IntoIterator<Item = &'a NodeId>,
    position: MovePosition,
    reference: Option<&NodeId>,
) -> Placement {
    let Some(reference) = reference else {
        return Placement::Append;
    };
    let found = siblings.into_iter().position(|id| id == reference);
    match (position, found) {
        (MovePosition::Before, Some(index)) => Placement::At(index),
        (MovePosition::After, Some(index)) => Placement::At(index + 1),
        (MovePosition::Inside, _) | (_, None) => Placement::Append,
    }
}

/// Sort a sibling group by `(order, id)`
pub fn sort_siblings(group: &mut [TreeNode]) {
    group.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Build the new sibling sequence with `moved` inserted.
///
/// Any existing copy of the moved node in `siblings` is dropped first, so the
/// caller may pass the group as read after the parent pointer was saved.
pub fn arrange(
    mut siblings: Vec<TreeNode>,
    moved: TreeNode,
    position: MovePosition,
    reference: Option<&NodeId>,
) -> Vec<TreeNode> {
    siblings.retain(|node| node.id != moved.id);
    sort_siblings(&mut siblings);
    let at = placement(siblings.iter().map(|node| &node.id), position, reference).index(siblings.len());
    siblings.insert(at, moved);
    siblings
}

/// Assign `1..=N` in sequence order and return the records whose order changed
pub fn renumber(sequence: &mut [TreeNode]) -> Vec<TreeNode> {
    let mut changed = Vec::new();
    for (index, node) in sequence.iter_mut().enumerate() {
        let order = index as i64 + 1;
        if node.order != order {
            node.order = order;
            changed.push(node.clone());
        }
    }
    changed
}

/// True iff the group's orders are exactly `1..=N` in some permutation
pub fn is_dense(group: &[TreeNode]) -> bool {
    let mut orders: Vec<i64> = group.iter().map(|node| node.order).collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| *order == index as i64 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: i64) -> NodeId {
        NodeId::from(value)
    }

    fn roots(pairs: &[(i64, i64)]) -> Vec<TreeNode> {
        pairs
            .iter()
            .map(|(node, order)| TreeNode::root(id(*node), *order))
            .collect()
    }

    fn ids(group: &[TreeNode]) -> Vec<NodeId> {
        group.iter().map(|node| node.id.clone()).collect()
    }

    #[test]
    fn test_placement_before_and_after() {
        let group = [id(1), id(2), id(3)];
        assert_eq!(placement(&group, MovePosition::Before, Some(&id(2))), Placement::At(1));
        assert_eq!(placement(&group, MovePosition::After, Some(&id(3))), Placement::At(3));
    }

    #[test]
    fn test_placement_falls_back_to_append() {
        let group = [id(1), id(2)];
        assert_eq!(placement(&group, MovePosition::Before, Some(&id(9))), Placement::Append);
        assert_eq!(placement(&group, MovePosition::Inside, Some(&id(1))), Placement::Append);
        assert_eq!(placement(&group, MovePosition::After, None), Placement::Append);
    }

    #[test]
    fn test_arrange_move_before_first() {
        // [X=1, Y=2, Z=3], Y before X
        let siblings = roots(&[(1, 1), (2, 2), (3, 3)]);
        let moved = TreeNode::root(id(2), 2);
        let mut sequence = arrange(siblings, moved, MovePosition::Before, Some(&id(1)));
        assert_eq!(ids(&sequence), vec![id(2), id(1), id(3)]);

        let changed = renumber(&mut sequence);
        assert_eq!(ids(&changed), vec![id(2), id(1)]);
        assert!(is_dense(&sequence));
    }

    #[test]
    fn test_arrange_breaks_ties_by_id() {
        let siblings = roots(&[(5, 1), (4, 1), (3, 2)]);
        let sequence = arrange(siblings, TreeNode::root(id(9), 0), MovePosition::Inside, None);
        assert_eq!(ids(&sequence), vec![id(4), id(5), id(3), id(9)]);
    }

    #[test]
    fn test_renumber_closes_gaps() {
        let mut group = roots(&[(1, 2), (2, 5), (3, 9)]);
        assert!(!is_dense(&group));
        assert_eq!(renumber(&mut group).len(), 3);
        assert!(is_dense(&group));
        assert!(renumber(&mut group).is_empty());
    }
}
