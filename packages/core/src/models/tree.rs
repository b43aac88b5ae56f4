//! Arena tree built from a flat record list
//!
//! The store hands out a flat list; rendering and drag validation need a
//! nested view. [`Tree::from_flat`] sorts the list by `(order, id)`, groups it
//! by parent and walks it once with an explicit stack, assigning arena slots in
//! pre-order and computing each node's depth on the way.
//!
//! Records that cannot be reached from the root level (their parent is outside
//! the loaded set, or the stored parent pointers loop) are left out of the
//! tree, matching what a recursive nested build would render.
//!
//! Child lists double as the "children container": an empty `Vec` is the same
//! thing as having no children, so there is never an empty placeholder group
//! to prune after a move.

use crate::models::{NodeId, TreeNode};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Position of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: TreeNode,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
}

/// One rendered row: the record plus its computed depth
pub type RenderRow = TreeNode;

/// Nested, serializable view of one node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeItem {
    #[serde(flatten)]
    pub node: TreeNode,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeItem>,
}

/// In-memory tree for one render / interaction cycle
#[derive(Debug, Clone, Default)]
pub struct Tree {
    slots: Vec<Slot>,
    roots: Vec<NodeIndex>,
    index: HashMap<NodeId, NodeIndex>,
}

impl Tree {
    /// Build a tree from a flat list of records in any order
    pub fn from_flat(mut nodes: Vec<TreeNode>) -> Self {
        nodes.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut seen: HashSet<NodeId> = HashSet::with_capacity(nodes.len());
        let mut groups: HashMap<Option<NodeId>, Vec<TreeNode>> = HashMap::new();
        for node in nodes {
            if !seen.insert(node.id.clone()) {
                tracing::debug!("Skipping duplicate record for node {}", node.id);
                continue;
            }
            groups.entry(node.parent_id.clone()).or_default().push(node);
        }

        let mut tree = Tree::default();
        // Stack entries: (record, parent slot, depth). Pushed in reverse so
        // pre-order assignment keeps sibling order.
        let mut stack: Vec<(TreeNode, Option<NodeIndex>, u32)> = groups
            .remove(&None)
            .unwrap_or_default()
            .into_iter()
            .rev()
            .map(|node| (node, None, 0))
            .collect();

        while let Some((mut node, parent, depth)) = stack.pop() {
            node.depth = depth;
            let id = node.id.clone();
            let ix = NodeIndex(tree.slots.len());
            tree.slots.push(Slot {
                node,
                parent,
                children: Vec::new(),
            });
            tree.index.insert(id.clone(), ix);
            match parent {
                Some(parent_ix) => tree.slots[parent_ix.0].children.push(ix),
                None => tree.roots.push(ix),
            }

            if let Some(children) = groups.remove(&Some(id)) {
                stack.extend(
                    children
                        .into_iter()
                        .rev()
                        .map(|child| (child, Some(ix), depth + 1)),
                );
            }
        }

        let unreachable: usize = groups.values().map(Vec::len).sum();
        if unreachable > 0 {
            tracing::debug!(
                "{} record(s) not reachable from the root level were left out of the tree",
                unreachable
            );
        }

        tree
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn index_of(&self, id: &NodeId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, ix: NodeIndex) -> &TreeNode {
        &self.slots[ix.0].node
    }

    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.index_of(id).map(|ix| self.node(ix))
    }

    pub fn parent(&self, ix: NodeIndex) -> Option<NodeIndex> {
        self.slots[ix.0].parent
    }

    pub fn children(&self, ix: NodeIndex) -> &[NodeIndex] {
        &self.slots[ix.0].children
    }

    pub fn has_children(&self, ix: NodeIndex) -> bool {
        !self.slots[ix.0].children.is_empty()
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn last_root(&self) -> Option<NodeIndex> {
        self.roots.last().copied()
    }

    /// Sibling group under `parent` (`None` = root level)
    pub fn group(&self, parent: Option<NodeIndex>) -> &[NodeIndex] {
        match parent {
            Some(ix) => self.children(ix),
            None => &self.roots,
        }
    }

    /// Ancestors from the direct parent up to the root level
    pub fn ancestors(&self, ix: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        std::iter::successors(self.parent(ix), move |current| self.parent(*current))
    }

    /// Every node below `ix` in pre-order, `ix` itself excluded
    pub fn descendants(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.children(ix).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// All attached nodes in pre-order (render order)
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut out = Vec::with_capacity(self.slots.len());
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Flat render contract: every node with `id`, `parentId`, `order` and
    /// `depth`, in render order. Feeding it back to [`Tree::from_flat`]
    /// rebuilds the same tree without a round trip to the store.
    pub fn render_rows(&self) -> Vec<RenderRow> {
        self.preorder()
            .into_iter()
            .map(|ix| self.node(ix).clone())
            .collect()
    }

    /// Nested records for rendering
    pub fn to_items(&self) -> Vec<TreeItem> {
        self.roots.iter().map(|ix| self.item(*ix)).collect()
    }

    fn item(&self, ix: NodeIndex) -> TreeItem {
        TreeItem {
            node: self.node(ix).clone(),
            children: self.children(ix).iter().map(|child| self.item(*child)).collect(),
        }
    }

    //
    // MUTATION (used by the optimistic mutator)
    //

    /// Unlink `ix` from its sibling group. Returns the group it left.
    pub(crate) fn detach(&mut self, ix: NodeIndex) -> Option<NodeIndex> {
        let parent = self.slots[ix.0].parent;
        let group = match parent {
            Some(parent_ix) => &mut self.slots[parent_ix.0].children,
            None => &mut self.roots,
        };
        group.retain(|member| *member != ix);
        parent
    }

    /// Link a detached `ix` into the group under `parent` at `position`
    /// (clamped to the group length)
    pub(crate) fn attach(&mut self, ix: NodeIndex, parent: Option<NodeIndex>, position: usize) {
        let group = match parent {
            Some(parent_ix) => &mut self.slots[parent_ix.0].children,
            None => &mut self.roots,
        };
        let position = position.min(group.len());
        group.insert(position, ix);
        self.slots[ix.0].parent = parent;
        self.slots[ix.0].node.parent_id = parent.map(|p| self.slots[p.0].node.id.clone());
    }

    /// Set the depth of `ix` and propagate `depth + 1` down its subtree
    pub(crate) fn set_depth(&mut self, ix: NodeIndex, depth: u32) {
        let mut stack = vec![(ix, depth)];
        while let Some((current, current_depth)) = stack.pop() {
            self.slots[current.0].node.depth = current_depth;
            stack.extend(
                self.slots[current.0]
                    .children
                    .iter()
                    .map(|child| (*child, current_depth + 1)),
            );
        }
    }

    /// Rewrite the group under `parent` to a dense `1..=N` order.
    /// Returns how many records changed.
    pub(crate) fn renumber(&mut self, parent: Option<NodeIndex>) -> usize {
        let members: Vec<NodeIndex> = self.group(parent).to_vec();
        let mut changed = 0;
        for (position, member) in members.into_iter().enumerate() {
            let order = position as i64 + 1;
            let node = &mut self.slots[member.0].node;
            if node.order != order {
                node.order = order;
                changed += 1;
            }
        }
        changed
    }
}
