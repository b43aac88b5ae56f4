//! Server-side move processor
//!
//! Applies one [`MoveIntent`] to the store:
//!
//! 1. Resolve the node; a missing node is a silent no-op
//! 2. Persist the new parent pointer
//! 3. If the parent changed, close the gap in the group the node left
//! 4. Insert the node into its new group before/after the reference (or last,
//!    when the reference is gone or the move is `inside`) and renumber `1..=N`
//!
//! Only records whose order actually changes are written. Moves in a batch
//! run strictly one after another, because later moves may reference
//! siblings that earlier ones repositioned.
//!
//! # Revalidation
//!
//! With revalidation enabled the processor rebuilds the stored tree before
//! each move and refuses moves that would create a cycle, or (for `inside`)
//! exceed the depth limit. Dropping a node onto itself is always refused.

use crate::config::TreeConfig;
use crate::db::TreeQuery;
use crate::models::{root_marker, MoveIntent, NodeId, Tree, TreeNode};
use crate::operations::ordering::{arrange, renumber, sort_siblings};
use crate::operations::{check_move, BlockReason};
use crate::services::error::TreeServiceError;
use std::sync::Arc;

/// Persisted effect of one move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub node_id: NodeId,
    pub old_parent: Option<NodeId>,
    pub new_parent: Option<NodeId>,
    /// Order writes in the group the node left (0 when the parent is unchanged)
    pub old_group_changed: usize,
    /// Order writes in the group the node joined
    pub new_group_changed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Applied(AppliedMove),
    /// The node was not found; nothing was written
    NodeMissing,
    /// Refused before any write
    Rejected(BlockReason),
}

impl MoveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Outcomes of a batch, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<MoveOutcome>,
}

impl BatchReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }
}

pub struct MoveProcessor {
    store: Arc<dyn TreeQuery>,
    revalidate: bool,
    max_depth: Option<u32>,
}

impl MoveProcessor {
    pub fn new(store: Arc<dyn TreeQuery>) -> Self {
        Self {
            store,
            revalidate: false,
            max_depth: None,
        }
    }

    pub fn from_config(store: Arc<dyn TreeQuery>, config: &TreeConfig) -> Self {
        let processor = Self::new(store);
        if config.revalidate_moves {
            processor.with_revalidation(config.max_depth)
        } else {
            processor
        }
    }

    /// Re-check every move against the stored tree before applying it
    pub fn with_revalidation(mut self, max_depth: Option<u32>) -> Self {
        self.revalidate = true;
        self.max_depth = max_depth;
        self
    }

    /// Apply one move
    pub async fn process(&self, intent: &MoveIntent) -> Result<MoveOutcome, TreeServiceError> {
        let Some(node) = self
            .store
            .fetch_by_id(&intent.node_id)
            .await
            .map_err(TreeServiceError::from_store)?
        else {
            tracing::debug!("Move skipped, node {} not found", intent.node_id);
            return Ok(MoveOutcome::NodeMissing);
        };

        let new_parent = root_marker::from_wire(intent.new_parent_id.clone());
        if new_parent.as_ref() == Some(&node.id) || intent.effective_reference() == Some(&node.id) {
            return Ok(MoveOutcome::Rejected(BlockReason::DropOntoSelf));
        }

        if self.revalidate {
            if let Err(reason) = self.revalidate_against_store(intent).await? {
                tracing::warn!("Move of node {} refused: {}", intent.node_id, reason);
                return Ok(MoveOutcome::Rejected(reason));
            }
        }

        let old_parent = node.parent_id.clone();
        let moved = TreeNode {
            parent_id: new_parent.clone(),
            ..node
        };
        self.write(moved.clone()).await?;

        let mut old_group_changed = 0;
        if old_parent != new_parent {
            let mut old_group = self.children(old_parent.as_ref()).await?;
            old_group.retain(|sibling| sibling.id != moved.id);
            sort_siblings(&mut old_group);
            old_group_changed = self.write_all(renumber(&mut old_group)).await?;
        }

        let siblings = self.children(new_parent.as_ref()).await?;
        let mut new_group = arrange(
            siblings,
            moved,
            intent.position,
            intent.effective_reference(),
        );
        let new_group_changed = self.write_all(renumber(&mut new_group)).await?;

        tracing::debug!(
            "Moved node {} from {:?} to {:?} ({} + {} order writes)",
            intent.node_id,
            old_parent,
            new_parent,
            old_group_changed,
            new_group_changed
        );

        Ok(MoveOutcome::Applied(AppliedMove {
            node_id: intent.node_id.clone(),
            old_parent,
            new_parent,
            old_group_changed,
            new_group_changed,
        }))
    }

    /// Apply moves strictly in order. Stops at the first store failure;
    /// moves already applied stay persisted.
    pub async fn process_batch(&self, moves: &[MoveIntent]) -> Result<BatchReport, TreeServiceError> {
        let mut report = BatchReport::default();
        for (index, intent) in moves.iter().enumerate() {
            match self.process(intent).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    tracing::warn!("Move batch aborted at {}: {}", index, e);
                    return Err(TreeServiceError::batch_aborted(
                        index,
                        report.applied(),
                        e.to_string(),
                    ));
                }
            }
        }
        tracing::info!(
            "Processed {} move(s), {} applied",
            moves.len(),
            report.applied()
        );
        Ok(report)
    }

    async fn revalidate_against_store(
        &self,
        intent: &MoveIntent,
    ) -> Result<Result<(), BlockReason>, TreeServiceError> {
        let nodes = self
            .store
            .fetch_all()
            .await
            .map_err(TreeServiceError::from_store)?;
        let tree = Tree::from_flat(nodes);
        Ok(check_move(&tree, intent, self.max_depth))
    }

    async fn children(&self, parent: Option<&NodeId>) -> Result<Vec<TreeNode>, TreeServiceError> {
        self.store
            .fetch_children(parent)
            .await
            .map_err(TreeServiceError::from_store)
    }

    async fn write(&self, node: TreeNode) -> Result<(), TreeServiceError> {
        self.store
            .save(node)
            .await
            .map_err(TreeServiceError::from_store)
    }

    async fn write_all(&self, nodes: Vec<TreeNode>) -> Result<usize, TreeServiceError> {
        let count = nodes.len();
        for node in nodes {
            self.write(node).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryTreeStore;
    use crate::models::MovePosition;

    fn id(value: i64) -> NodeId {
        NodeId::from(value)
    }

    async fn orders(store: &MemoryTreeStore, parent: Option<i64>) -> Vec<(NodeId, i64)> {
        let parent = parent.map(id);
        store
            .fetch_children(parent.as_ref())
            .await
            .unwrap()
            .into_iter()
            .map(|node| (node.id, node.order))
            .collect()
    }

    fn roots_xyz() -> MemoryTreeStore {
        MemoryTreeStore::with_nodes([
            TreeNode::root(id(1), 1),
            TreeNode::root(id(2), 2),
            TreeNode::root(id(3), 3),
        ])
    }

    #[tokio::test]
    async fn test_move_before_first_root() {
        let store = roots_xyz();
        let processor = MoveProcessor::new(Arc::new(store.clone()));

        let outcome = processor
            .process(&MoveIntent::before(id(2), None, id(1)))
            .await
            .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(
            orders(&store, None).await,
            vec![(id(2), 1), (id(1), 2), (id(3), 3)]
        );
    }

    #[tokio::test]
    async fn test_missing_node_is_noop() {
        let store = roots_xyz();
        let processor = MoveProcessor::new(Arc::new(store.clone()));
        let outcome = processor
            .process(&MoveIntent::inside(id(42), Some(id(1))))
            .await
            .unwrap();
        assert_eq!(outcome, MoveOutcome::NodeMissing);
        assert_eq!(orders(&store, None).await.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_reference_appends() {
        let store = roots_xyz();
        store.insert(TreeNode::new(id(4), Some(id(1)), 1)).await.unwrap();
        let processor = MoveProcessor::new(Arc::new(store.clone()));

        processor
            .process(&MoveIntent::before(id(4), None, id(99)))
            .await
            .unwrap();
        assert_eq!(
            orders(&store, None).await,
            vec![(id(1), 1), (id(2), 2), (id(3), 3), (id(4), 4)]
        );
        assert!(orders(&store, Some(1)).await.is_empty());
    }

    #[tokio::test]
    async fn test_old_group_is_closed() {
        let store = MemoryTreeStore::with_nodes([
            TreeNode::root(id(1), 1),
            TreeNode::new(id(2), Some(id(1)), 1),
            TreeNode::new(id(3), Some(id(1)), 2),
            TreeNode::new(id(4), Some(id(1)), 3),
            TreeNode::root(id(5), 2),
        ]);
        let processor = MoveProcessor::new(Arc::new(store.clone()));

        let outcome = processor
            .process(&MoveIntent::inside(id(2), Some(id(5))))
            .await
            .unwrap();
        let MoveOutcome::Applied(applied) = outcome else {
            panic!("expected applied move");
        };
        assert_eq!(applied.old_parent, Some(id(1)));
        assert_eq!(applied.new_parent, Some(id(5)));
        assert_eq!(applied.old_group_changed, 2);
        assert_eq!(orders(&store, Some(1)).await, vec![(id(3), 1), (id(4), 2)]);
        assert_eq!(orders(&store, Some(5)).await, vec![(id(2), 1)]);
    }

    #[tokio::test]
    async fn test_wire_root_marker_is_translated() {
        let store = MemoryTreeStore::with_nodes([
            TreeNode::root(id(1), 1),
            TreeNode::new(id(2), Some(id(1)), 1),
        ]);
        let processor = MoveProcessor::new(Arc::new(store.clone()));
        let intent = MoveIntent {
            node_id: id(2),
            new_parent_id: Some(id(-1)),
            position: MovePosition::After,
            reference_id: Some(id(1)),
        };
        processor.process(&intent).await.unwrap();
        assert_eq!(store.fetch_by_id(&id(2)).await.unwrap().unwrap().parent_id, None);
        assert_eq!(orders(&store, None).await, vec![(id(1), 1), (id(2), 2)]);
    }

    #[tokio::test]
    async fn test_self_reference_is_rejected() {
        let store = roots_xyz();
        let processor = MoveProcessor::new(Arc::new(store.clone()));
        let outcome = processor
            .process(&MoveIntent::after(id(2), None, id(2)))
            .await
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Rejected(BlockReason::DropOntoSelf));
        assert_eq!(
            orders(&store, None).await,
            vec![(id(1), 1), (id(2), 2), (id(3), 3)]
        );
    }

    #[tokio::test]
    async fn test_revalidation_refuses_cycle() {
        let store = MemoryTreeStore::with_nodes([
            TreeNode::root(id(1), 1),
            TreeNode::new(id(2), Some(id(1)), 1),
        ]);
        let processor =
            MoveProcessor::new(Arc::new(store.clone())).with_revalidation(Some(10));
        let outcome = processor
            .process(&MoveIntent::inside(id(1), Some(id(2))))
            .await
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Rejected(BlockReason::TargetIsDescendant));
        assert_eq!(store.fetch_by_id(&id(1)).await.unwrap().unwrap().parent_id, None);
    }

    #[tokio::test]
    async fn test_same_group_reorder_writes_only_changes() {
        let store = MemoryTreeStore::with_nodes([
            TreeNode::root(id(1), 1),
            TreeNode::root(id(2), 2),
            TreeNode::root(id(3), 3),
            TreeNode::root(id(4), 4),
        ]);
        let processor = MoveProcessor::new(Arc::new(store.clone()));
        let MoveOutcome::Applied(applied) = processor
            .process(&MoveIntent::after(id(2), None, id(3)))
            .await
            .unwrap()
        else {
            panic!("expected applied move");
        };
        assert_eq!(applied.old_group_changed, 0);
        assert_eq!(applied.new_group_changed, 2);
        assert_eq!(
            orders(&store, None).await,
            vec![(id(1), 1), (id(3), 2), (id(2), 3), (id(4), 4)]
        );
    }
}
