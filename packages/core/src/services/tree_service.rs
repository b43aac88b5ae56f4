//! Tree Service - load, reorder and delete
//!
//! [`TreeService`] is the server-side entry point a host wires to its
//! persistence layer. It owns:
//!
//! - the [`TreeQuery`] store
//! - a [`MoveProcessor`] configured from [`TreeConfig`]
//! - the expand/collapse state of the tree instance it serves
//! - a broadcast channel of [`TreeEvent`]s
//!
//! It also implements [`TreeBackend`], so a [`crate::client::TreeView`] can be
//! mounted directly on top of it in-process.

use crate::client::TreeBackend;
use crate::config::TreeConfig;
use crate::db::{TreeEvent, TreeQuery};
use crate::models::{ExpandState, MoveIntent, NodeId, RenderRow, Tree, TreeNode};
use crate::services::error::TreeServiceError;
use crate::services::move_processor::{BatchReport, MoveOutcome, MoveProcessor};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Broadcast channel capacity for tree events
const TREE_EVENT_CHANNEL_CAPACITY: usize = 128;

#[derive(Clone)]
pub struct TreeService {
    store: Arc<dyn TreeQuery>,
    processor: Arc<MoveProcessor>,
    config: Arc<TreeConfig>,
    expand: Arc<RwLock<ExpandState>>,
    event_tx: broadcast::Sender<TreeEvent>,
}

impl TreeService {
    /// Create a service over `store`. Fails if `config` does not validate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use arbor_core::config::TreeConfig;
    /// # use arbor_core::db::MemoryTreeStore;
    /// # use arbor_core::services::TreeService;
    /// # use std::sync::Arc;
    /// let service = TreeService::new(Arc::new(MemoryTreeStore::new()), TreeConfig::default())?;
    /// # Ok::<(), arbor_core::services::TreeServiceError>(())
    /// ```
    pub fn new(store: Arc<dyn TreeQuery>, config: TreeConfig) -> Result<Self, TreeServiceError> {
        config
            .validate()
            .map_err(TreeServiceError::invalid_config)?;

        let processor = MoveProcessor::from_config(store.clone(), &config);
        let (event_tx, _) = broadcast::channel(TREE_EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            store,
            processor: Arc::new(processor),
            expand: Arc::new(RwLock::new(ExpandState::new(config.default_expanded))),
            config: Arc::new(config),
            event_tx,
        })
    }

    pub fn store(&self) -> &Arc<dyn TreeQuery> {
        &self.store
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Subscribe to tree events
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<TreeEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: TreeEvent) {
        let _ = self.event_tx.send(event);
    }

    //
    // LOADING
    //

    /// Fetch every record and build the nested tree
    pub async fn load_tree(&self) -> Result<Tree, TreeServiceError> {
        let nodes = self
            .store
            .fetch_all()
            .await
            .map_err(TreeServiceError::from_store)?;
        let tree = Tree::from_flat(nodes);

        let known: Vec<NodeId> = tree.render_rows().into_iter().map(|row| row.id).collect();
        self.expand.write().await.retain_known(known.iter());

        tracing::debug!("Loaded tree with {} reachable node(s)", tree.len());
        Ok(tree)
    }

    /// Flat pre-order rows with depth filled in
    pub async fn records(&self) -> Result<Vec<RenderRow>, TreeServiceError> {
        Ok(self.load_tree().await?.render_rows())
    }

    pub async fn node(&self, id: &NodeId) -> Result<TreeNode, TreeServiceError> {
        self.store
            .fetch_by_id(id)
            .await
            .map_err(TreeServiceError::from_store)?
            .ok_or_else(|| TreeServiceError::node_not_found(id.to_string()))
    }

    //
    // MOVES
    //

    /// Persist a batch of moves in order and emit events for what changed
    pub async fn submit_moves(
        &self,
        moves: Vec<MoveIntent>,
    ) -> Result<BatchReport, TreeServiceError> {
        let report = self.processor.process_batch(&moves).await?;

        for outcome in &report.outcomes {
            if let MoveOutcome::Applied(applied) = outcome {
                self.emit_event(TreeEvent::NodeMoved {
                    node_id: applied.node_id.clone(),
                    old_parent: applied.old_parent.clone(),
                    new_parent: applied.new_parent.clone(),
                });
                if applied.old_parent != applied.new_parent && applied.old_group_changed > 0 {
                    self.emit_event(TreeEvent::SiblingsReordered {
                        parent: applied.old_parent.clone(),
                        changed: applied.old_group_changed,
                    });
                }
                if applied.new_group_changed > 0 {
                    self.emit_event(TreeEvent::SiblingsReordered {
                        parent: applied.new_parent.clone(),
                        changed: applied.new_group_changed,
                    });
                }
            }
        }

        self.emit_event(TreeEvent::TreeReordered {
            applied: report.applied(),
            moves,
            at: Utc::now(),
        });
        Ok(report)
    }

    //
    // DELETION
    //

    /// Delete a node and all of its descendants. Returns the number removed.
    pub async fn delete_subtree(&self, id: &NodeId) -> Result<usize, TreeServiceError> {
        let removed = self
            .store
            .delete_subtree(id)
            .await
            .map_err(TreeServiceError::from_store)?;
        tracing::info!("Deleted {} node(s) under {}", removed, id);
        Ok(removed)
    }

    //
    // EXPAND / COLLAPSE
    //

    pub async fn is_expanded(&self, id: &NodeId) -> bool {
        !self.config.collapsible || self.expand.read().await.is_expanded(id)
    }

    /// Toggle one node and return its new state
    pub async fn toggle_expanded(&self, id: &NodeId) -> bool {
        if !self.config.collapsible {
            return true;
        }
        self.expand.write().await.toggle(id)
    }

    pub async fn expand_all(&self) {
        self.expand.write().await.expand_all();
    }

    pub async fn collapse_all(&self) {
        if self.config.collapsible {
            self.expand.write().await.collapse_all();
        }
    }

    pub async fn expand_state(&self) -> ExpandState {
        self.expand.read().await.clone()
    }
}

#[async_trait]
impl TreeBackend for TreeService {
    async fn submit_moves(&self, moves: Vec<MoveIntent>) -> anyhow::Result<()> {
        TreeService::submit_moves(self, moves).await?;
        Ok(())
    }

    async fn load_nodes(&self) -> anyhow::Result<Vec<TreeNode>> {
        self.store.fetch_all().await
    }
}
