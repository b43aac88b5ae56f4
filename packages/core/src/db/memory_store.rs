//! In-process tree store
//!
//! A [`TreeQuery`] backed by a `BTreeMap` behind a tokio `RwLock`. Used by the
//! replay tool, by tests, and by hosts that keep the tree in memory.

use crate::db::TreeQuery;
use crate::models::{NodeId, TreeNode};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

type ScopeFn = Arc<dyn Fn(&TreeNode) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct MemoryTreeStore {
    nodes: Arc<RwLock<BTreeMap<NodeId, TreeNode>>>,
    scope: Option<ScopeFn>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with `nodes`
    pub fn with_nodes(nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        let map = nodes
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect();
        Self {
            nodes: Arc::new(RwLock::new(map)),
            scope: None,
        }
    }

    /// Restrict every read and write to records matching `predicate`
    pub fn scoped(mut self, predicate: impl Fn(&TreeNode) -> bool + Send + Sync + 'static) -> Self {
        self.scope = Some(Arc::new(predicate));
        self
    }

    fn in_scope(&self, node: &TreeNode) -> bool {
        self.scope.as_ref().map_or(true, |scope| scope(node))
    }

    /// Total records, ignoring the scope
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

#[async_trait]
impl TreeQuery for MemoryTreeStore {
    async fn fetch_all(&self) -> Result<Vec<TreeNode>> {
        let nodes = self.nodes.read().await;
        let mut all: Vec<TreeNode> = nodes
            .values()
            .filter(|node| self.in_scope(node))
            .cloned()
            .collect();
        all.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(all)
    }

    async fn fetch_by_id(&self, id: &NodeId) -> Result<Option<TreeNode>> {
        let nodes = self.nodes.read().await;
        Ok(nodes.get(id).filter(|node| self.in_scope(node)).cloned())
    }

    async fn save(&self, node: TreeNode) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&node.id) {
            Some(stored) if self.in_scope(stored) => {
                stored.parent_id = node.parent_id;
                stored.order = node.order;
                Ok(())
            }
            _ => {
                tracing::debug!("Save skipped, node {} not in store", node.id);
                Ok(())
            }
        }
    }

    async fn insert(&self, node: TreeNode) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(&node.id) {
            bail!("Node '{}' already exists", node.id);
        }
        nodes.insert(node.id.clone(), node);
        Ok(())
    }

    async fn delete_subtree(&self, id: &NodeId) -> Result<usize> {
        let mut nodes = self.nodes.write().await;
        if !nodes.get(id).is_some_and(|node| self.in_scope(node)) {
            return Ok(0);
        }

        let mut doomed: HashSet<NodeId> = HashSet::from([id.clone()]);
        let mut frontier = vec![id.clone()];
        while let Some(parent) = frontier.pop() {
            for node in nodes.values() {
                if node.parent_id.as_ref() == Some(&parent) && doomed.insert(node.id.clone()) {
                    frontier.push(node.id.clone());
                }
            }
        }

        nodes.retain(|key, _| !doomed.contains(key));
        tracing::debug!("Deleted subtree of {} ({} records)", id, doomed.len());
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: i64) -> NodeId {
        NodeId::from(value)
    }

    fn store() -> MemoryTreeStore {
        MemoryTreeStore::with_nodes([
            TreeNode::root(id(1), 1),
            TreeNode::new(id(2), Some(id(1)), 2),
            TreeNode::new(id(3), Some(id(1)), 1),
            TreeNode::new(id(4), Some(id(2)), 1),
            TreeNode::root(id(5), 2),
        ])
    }

    #[tokio::test]
    async fn test_fetch_children_is_ordered() {
        let children = store().fetch_children(Some(&id(1))).await.unwrap();
        let ids: Vec<NodeId> = children.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![id(3), id(2)]);
    }

    #[tokio::test]
    async fn test_save_writes_parent_and_order_only() {
        let store = store();
        let mut node = store.fetch_by_id(&id(4)).await.unwrap().unwrap();
        node.parent_id = None;
        node.order = 3;
        node.depth = 99;
        store.save(node).await.unwrap();

        let stored = store.fetch_by_id(&id(4)).await.unwrap().unwrap();
        assert_eq!(stored.parent_id, None);
        assert_eq!(stored.order, 3);
        assert_eq!(stored.depth, 0);
    }

    #[tokio::test]
    async fn test_delete_subtree_cascades() {
        let store = store();
        assert_eq!(store.delete_subtree(&id(1)).await.unwrap(), 4);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.delete_subtree(&id(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = store();
        assert!(store.insert(TreeNode::root(id(1), 9)).await.is_err());
    }

    #[tokio::test]
    async fn test_scope_hides_records() {
        let store = store().scoped(|node| node.id != NodeId::from(5));
        assert_eq!(store.fetch_all().await.unwrap().len(), 4);
        assert!(store.fetch_by_id(&id(5)).await.unwrap().is_none());
        assert_eq!(store.fetch_children(None).await.unwrap().len(), 1);
    }
}
