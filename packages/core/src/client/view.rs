//! Tree view controller
//!
//! [`TreeView`] is the per-view owner of everything the interaction layer
//! needs: the rendered [`Tree`], the [`DragMachine`] (with its indicator), the
//! [`ChangeAccumulator`] and expand state. Nothing here is global; a host
//! creates one view per mounted tree and drops it on unmount.
//!
//! # Persistence flow
//!
//! Every committed drop is applied to the rendered tree first. In immediate
//! mode the move is then queued to a single submission worker spawned at
//! mount. The worker sends queued moves to the backend one at a time, in drop
//! order, waits `settle_delay_ms` after each and re-reads the tree. Later
//! drops usually reference siblings that earlier drops repositioned, so a
//! move never reaches the backend before the ones dropped ahead of it.
//!
//! The refreshed records come back through a channel in the same order and
//! are picked up by [`TreeView::poll_backend`]; they are only swapped in while
//! no drag is active and no batch is pending, so a refresh never discards an
//! edit the user is still making.
//!
//! Hosts re-render from [`TreeView::view_model`] and use
//! [`ViewModel::diff`] to attach or release per-row listeners by node id
//! instead of tearing every listener down after each move.

use crate::client::accumulator::{ChangeAccumulator, SaveAffordances, SaveMode};
use crate::client::drag::{DragMachine, DropOutcome, DropTargetHit, HoverState};
use crate::client::indicator::IndicatorStyle;
use crate::client::mutator::apply_move;
use crate::client::ClientError;
use crate::config::TreeConfig;
use crate::models::{ExpandState, MoveIntent, NodeId, RenderRow, Tree, TreeNode};
use crate::operations::Point;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Server side of a tree view
#[async_trait]
pub trait TreeBackend: Send + Sync {
    /// Persist moves in order, as one batch
    async fn submit_moves(&self, moves: Vec<MoveIntent>) -> anyhow::Result<()>;

    /// Read the current flat record list
    async fn load_nodes(&self) -> anyhow::Result<Vec<TreeNode>>;
}

#[derive(Debug)]
enum SyncMessage {
    Refreshed(Vec<TreeNode>),
    Failed(String),
}

/// One rendered row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    #[serde(flatten)]
    pub node: RenderRow,
    pub has_children: bool,
    pub expanded: bool,
    /// False when any ancestor is collapsed
    pub visible: bool,
    pub dragging: bool,
}

/// Immutable snapshot of a view for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub rows: Vec<RowView>,
    pub affordances: SaveAffordances,
    pub indicator: Option<IndicatorStyle>,
}

/// Listener changes between two snapshots, keyed by node id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerDiff {
    /// Rows that appeared
    pub attach: Vec<NodeId>,
    /// Rows that disappeared
    pub detach: Vec<NodeId>,
    /// Rows still present whose parent, order, depth or flags changed
    pub update: Vec<NodeId>,
}

impl ListenerDiff {
    pub fn is_empty(&self) -> bool {
        self.attach.is_empty() && self.detach.is_empty() && self.update.is_empty()
    }
}

impl ViewModel {
    pub fn row(&self, id: &NodeId) -> Option<&RowView> {
        self.rows.iter().find(|row| &row.node.id == id)
    }

    pub fn diff(&self, previous: &ViewModel) -> ListenerDiff {
        let old: HashMap<&NodeId, &RowView> =
            previous.rows.iter().map(|row| (&row.node.id, row)).collect();
        let current: HashSet<&NodeId> = self.rows.iter().map(|row| &row.node.id).collect();

        let mut diff = ListenerDiff::default();
        for row in &self.rows {
            match old.get(&row.node.id) {
                None => diff.attach.push(row.node.id.clone()),
                Some(before) if *before != row => diff.update.push(row.node.id.clone()),
                Some(_) => {}
            }
        }
        diff.detach = previous
            .rows
            .iter()
            .filter(|row| !current.contains(&row.node.id))
            .map(|row| row.node.id.clone())
            .collect();
        diff
    }
}

pub struct TreeView {
    config: TreeConfig,
    tree: Tree,
    expand: ExpandState,
    machine: DragMachine,
    accumulator: ChangeAccumulator,
    backend: Arc<dyn TreeBackend>,
    submit_tx: mpsc::UnboundedSender<Vec<MoveIntent>>,
    sync_rx: mpsc::UnboundedReceiver<SyncMessage>,
    in_flight: usize,
    deferred: Option<Vec<TreeNode>>,
    last_error: Option<String>,
}

impl TreeView {
    /// Load the tree from `backend` and set up a view
    pub async fn mount(
        backend: Arc<dyn TreeBackend>,
        config: TreeConfig,
    ) -> Result<Self, ClientError> {
        let nodes = backend
            .load_nodes()
            .await
            .map_err(|e| ClientError::persistence(e.to_string()))?;
        let (sync_tx, sync_rx) = mpsc::unbounded_channel();
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_submissions(
            backend.clone(),
            config.settle_delay(),
            submit_rx,
            sync_tx,
        ));

        tracing::debug!("Mounted tree view with {} records", nodes.len());
        Ok(Self {
            tree: Tree::from_flat(nodes),
            expand: ExpandState::new(config.default_expanded),
            machine: DragMachine::new(&config),
            accumulator: ChangeAccumulator::new(config.save_mode()),
            config,
            backend,
            submit_tx,
            sync_rx,
            in_flight: 0,
            deferred: None,
            last_error: None,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn mode(&self) -> SaveMode {
        self.accumulator.mode()
    }

    pub fn is_dirty(&self) -> bool {
        self.accumulator.is_dirty()
    }

    pub fn pending_moves(&self) -> &[MoveIntent] {
        self.accumulator.pending()
    }

    pub fn affordances(&self) -> SaveAffordances {
        self.accumulator.affordances()
    }

    /// Last background persistence failure, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of immediate-mode submissions not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    //
    // EXPAND / COLLAPSE
    //

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        !self.config.collapsible || self.expand.is_expanded(id)
    }

    /// Toggle one node; returns the new state. Always `true` when the tree
    /// is not collapsible.
    pub fn toggle_expanded(&mut self, id: &NodeId) -> bool {
        if !self.config.collapsible {
            return true;
        }
        self.expand.toggle(id)
    }

    pub fn expand_all(&mut self) {
        self.expand.expand_all();
    }

    pub fn collapse_all(&mut self) {
        if self.config.collapsible {
            self.expand.collapse_all();
        }
    }

    //
    // DRAG SESSION
    //

    pub fn start_drag(&mut self, id: &NodeId) -> Result<(), ClientError> {
        self.machine.start(&self.tree, id).map(|_| ())
    }

    pub fn hover(
        &mut self,
        hits: &[DropTargetHit],
        pointer: Point,
    ) -> Result<Option<&HoverState>, ClientError> {
        self.machine.hover(&self.tree, hits, pointer)
    }

    pub fn leave_target(&mut self) {
        self.machine.leave();
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.machine.cancel()
    }

    /// Release the pointer.
    ///
    /// A committed move is applied to the rendered tree and then recorded; in
    /// immediate mode it is also queued to the submission worker.
    pub fn release(&mut self) -> Result<DropOutcome, ClientError> {
        let outcome = self.machine.release(&self.tree)?;
        if let DropOutcome::Committed(intent) = &outcome {
            apply_move(&mut self.tree, intent)?;
            if let Some(batch) = self.accumulator.record(intent.clone()) {
                self.queue_submit(batch);
            }
        }
        Ok(outcome)
    }

    fn queue_submit(&mut self, batch: Vec<MoveIntent>) {
        match self.submit_tx.send(batch) {
            Ok(()) => self.in_flight += 1,
            Err(_) => {
                tracing::warn!("Submission worker stopped; move not sent");
                self.last_error = Some("submission worker stopped".to_string());
            }
        }
    }

    /// Apply finished background submissions. Returns whether the rendered
    /// tree was replaced.
    pub fn poll_backend(&mut self) -> bool {
        while let Ok(message) = self.sync_rx.try_recv() {
            self.handle_sync(message);
        }
        self.apply_deferred()
    }

    /// Wait for every in-flight submission, then apply the latest refresh
    pub async fn settle(&mut self) -> bool {
        while self.in_flight > 0 {
            match self.sync_rx.recv().await {
                Some(message) => self.handle_sync(message),
                None => break,
            }
        }
        self.apply_deferred()
    }

    fn handle_sync(&mut self, message: SyncMessage) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match message {
            SyncMessage::Refreshed(nodes) => self.deferred = Some(nodes),
            SyncMessage::Failed(e) => {
                tracing::warn!("Background move submission failed: {}", e);
                self.last_error = Some(e);
            }
        }
    }

    fn apply_deferred(&mut self) -> bool {
        if self.machine.is_active() || self.accumulator.is_dirty() || self.in_flight > 0 {
            return false;
        }
        match self.deferred.take() {
            Some(nodes) => {
                self.replace_tree(nodes);
                true
            }
            None => false,
        }
    }

    fn replace_tree(&mut self, nodes: Vec<TreeNode>) {
        self.tree = Tree::from_flat(nodes);
        let known: Vec<NodeId> = self
            .tree
            .render_rows()
            .into_iter()
            .map(|row| row.id)
            .collect();
        self.expand.retain_known(known.iter());
    }

    //
    // SAVE / CANCEL
    //

    /// Persist the pending batch in order and reload. Returns how many moves
    /// were sent.
    ///
    /// On failure the batch is dropped and the rendered tree keeps its
    /// optimistic state; [`TreeView::reload`] restores the stored state.
    pub async fn save(&mut self) -> Result<usize, ClientError> {
        let batch = self.accumulator.take_batch();
        if batch.is_empty() {
            return Ok(0);
        }
        let count = batch.len();
        self.backend
            .submit_moves(batch)
            .await
            .map_err(|e| ClientError::persistence(e.to_string()))?;

        tracing::info!("Saved {} pending move(s)", count);
        self.reload().await?;
        Ok(count)
    }

    /// Discard the pending batch and every optimistic edit. Returns how many
    /// moves were discarded.
    pub async fn cancel(&mut self) -> Result<usize, ClientError> {
        self.machine.cancel();
        let discarded = self.accumulator.discard();
        tracing::debug!("Cancelled {} pending move(s)", discarded);
        self.reload().await?;
        Ok(discarded)
    }

    /// Rebuild the rendered tree from the backend
    pub async fn reload(&mut self) -> Result<(), ClientError> {
        let nodes = self
            .backend
            .load_nodes()
            .await
            .map_err(|e| ClientError::persistence(e.to_string()))?;
        self.deferred = None;
        self.replace_tree(nodes);
        Ok(())
    }

    //
    // RENDERING
    //

    pub fn view_model(&self) -> ViewModel {
        let dragging = self.machine.payload().map(|payload| &payload.id);
        let mut hidden_below: HashSet<NodeId> = HashSet::new();
        let mut rows = Vec::with_capacity(self.tree.len());

        for ix in self.tree.preorder() {
            let node = self.tree.node(ix);
            let visible = node
                .parent_id
                .as_ref()
                .map_or(true, |parent| !hidden_below.contains(parent));
            let expanded = self.is_expanded(&node.id);
            if !visible || !expanded {
                hidden_below.insert(node.id.clone());
            }

            rows.push(RowView {
                node: node.clone(),
                has_children: self.tree.has_children(ix),
                expanded,
                visible,
                dragging: dragging == Some(&node.id),
            });
        }

        ViewModel {
            rows,
            affordances: self.accumulator.affordances(),
            indicator: self.machine.indicator().copied(),
        }
    }
}

/// Drain queued immediate-mode batches strictly in order. Ends when the
/// owning view is dropped.
async fn run_submissions(
    backend: Arc<dyn TreeBackend>,
    settle_delay: Duration,
    mut submit_rx: mpsc::UnboundedReceiver<Vec<MoveIntent>>,
    sync_tx: mpsc::UnboundedSender<SyncMessage>,
) {
    while let Some(batch) = submit_rx.recv().await {
        let message = match backend.submit_moves(batch).await {
            Ok(()) => {
                tokio::time::sleep(settle_delay).await;
                match backend.load_nodes().await {
                    Ok(nodes) => SyncMessage::Refreshed(nodes),
                    Err(e) => SyncMessage::Failed(e.to_string()),
                }
            }
            Err(e) => SyncMessage::Failed(e.to_string()),
        };
        if sync_tx.send(message).is_err() {
            break;
        }
    }
    tracing::debug!("Submission worker stopped");
}
