//! TreeQuery Trait - Storage Abstraction for tree records
//!
//! The reorder engine never talks to a database directly. It reads and writes
//! flat [`TreeNode`] records through this trait, so hosts can plug in any
//! backend and restrict the visible tree to a subset (a scope) of a larger
//! table.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async so embedded and networked
//!    backends look the same to the move processor
//! 2. **Ownership Semantics**: writes take the record by value
//! 3. **Error Handling**: `anyhow::Result` for backend-specific context
//! 4. **Narrow Writes**: [`TreeQuery::save`] persists the parent pointer and
//!    order only. Other columns (names, materialised depth or path) are left
//!    untouched.
//!
//! # Examples
//!
//! ```rust,no_run
//! use arbor_core::db::{MemoryTreeStore, TreeQuery};
//! use arbor_core::models::{NodeId, TreeNode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryTreeStore::new();
//!     store.insert(TreeNode::root(NodeId::from(1), 1)).await?;
//!
//!     let roots = store.fetch_children(None).await?;
//!     assert_eq!(roots.len(), 1);
//!     Ok(())
//! }
//! ```

use crate::models::{NodeId, TreeNode};
use crate::operations::ordering::sort_siblings;
use anyhow::Result;
use async_trait::async_trait;

/// Persistence operations the reorder engine depends on
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the move processor holds them behind
/// an `Arc` and may be driven from any runtime thread.
#[async_trait]
pub trait TreeQuery: Send + Sync {
    /// Every record in scope, ordered by `(order, id)`
    async fn fetch_all(&self) -> Result<Vec<TreeNode>>;

    /// One record, or `None` when it is absent or out of scope
    async fn fetch_by_id(&self, id: &NodeId) -> Result<Option<TreeNode>>;

    /// Sibling group under `parent` (`None` = root level), ordered by
    /// `(order, id)`
    async fn fetch_children(&self, parent: Option<&NodeId>) -> Result<Vec<TreeNode>> {
        let mut group: Vec<TreeNode> = self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|node| node.parent_id.as_ref() == parent)
            .collect();
        sort_siblings(&mut group);
        Ok(group)
    }

    /// Persist `node.parent_id` and `node.order` for an existing record
    async fn save(&self, node: TreeNode) -> Result<()>;

    /// Add a new record
    async fn insert(&self, node: TreeNode) -> Result<()>;

    /// Remove a record and every descendant. Returns how many were removed.
    async fn delete_subtree(&self, id: &NodeId) -> Result<usize>;
}
