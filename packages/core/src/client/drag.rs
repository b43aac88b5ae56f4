//! Drag interaction state machine
//!
//! ```text
//! Idle ──start──▶ Dragging ──hover──▶ Hovering ──release──▶ (outcome) ──▶ Idle
//!                    ▲  │               │  ▲
//!                    │  └─────cancel────┼──┼──────────────────────────▶ Idle
//!                    └──────leave───────┘  └──hover (new target)
//! ```
//!
//! The machine is driven synchronously from a single event loop; at most one
//! session exists at a time. It never mutates the tree: a successful release
//! yields a [`MoveIntent`] for the caller to apply.
//!
//! # Invariants
//!
//! | Invariant | Where |
//! |-----------|-------|
//! | The payload is captured once at start and never re-derived | [`DragMachine::start`] |
//! | Only the nearest hit (first in the slice) is considered | [`DragMachine::hover`] |
//! | A blocked operation is shown but never committed | [`DragMachine::release`] |
//! | Cancel and empty releases have no side effects | [`DragMachine::cancel`] |

use crate::client::indicator::{DropIndicator, IndicatorStyle};
use crate::client::ClientError;
use crate::config::TreeConfig;
use crate::models::{MoveIntent, MovePosition, NodeId, Tree};
use crate::operations::{
    evaluate_operations, Availability, BlockReason, DropOperation, HitboxPolicy,
    OperationAvailability, Point, Rect, ThreeZoneHitbox,
};

/// Snapshot of the dragged node, taken at drag start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub id: NodeId,
    pub depth: u32,
    pub parent_id: Option<NodeId>,
}

/// What the pointer is over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTargetKind {
    Node(NodeId),
    /// Always-present zone after the last root
    DropAtEnd,
}

/// One registered drop target under the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct DropTargetHit {
    pub target: DropTargetKind,
    pub bounds: Rect,
}

impl DropTargetHit {
    pub fn node(id: impl Into<NodeId>, bounds: Rect) -> Self {
        Self {
            target: DropTargetKind::Node(id.into()),
            bounds,
        }
    }

    pub fn drop_at_end(bounds: Rect) -> Self {
        Self {
            target: DropTargetKind::DropAtEnd,
            bounds,
        }
    }
}

/// Current hover evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct HoverState {
    pub target: DropTargetKind,
    pub operation: DropOperation,
    pub availability: Availability,
    /// Legality of every operation for this target (`None` for drop-at-end)
    pub options: Option<OperationAvailability>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragPhase {
    Idle,
    Dragging(DragPayload),
    Hovering {
        payload: DragPayload,
        hover: HoverState,
    },
}

/// Result of releasing the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Released outside every target
    Cancelled,
    /// Released over a blocked operation; nothing changes
    Blocked(BlockReason),
    Committed(MoveIntent),
}

pub struct DragMachine {
    phase: DragPhase,
    policy: Box<dyn HitboxPolicy>,
    max_depth: Option<u32>,
    indicator: DropIndicator,
}

impl DragMachine {
    pub fn new(config: &TreeConfig) -> Self {
        Self {
            phase: DragPhase::Idle,
            policy: Box::new(ThreeZoneHitbox::new(config.hitbox.edge_fraction)),
            max_depth: config.max_depth,
            indicator: DropIndicator::new(config.indicator),
        }
    }

    /// Replace the hitbox policy
    pub fn with_policy(mut self, policy: impl HitboxPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, DragPhase::Idle)
    }

    pub fn payload(&self) -> Option<&DragPayload> {
        match &self.phase {
            DragPhase::Idle => None,
            DragPhase::Dragging(payload) | DragPhase::Hovering { payload, .. } => Some(payload),
        }
    }

    pub fn hover_state(&self) -> Option<&HoverState> {
        match &self.phase {
            DragPhase::Hovering { hover, .. } => Some(hover),
            _ => None,
        }
    }

    pub fn indicator(&self) -> Option<&IndicatorStyle> {
        self.indicator.current()
    }

    /// Begin dragging `node_id`
    pub fn start(&mut self, tree: &Tree, node_id: &NodeId) -> Result<&DragPayload, ClientError> {
        if let Some(active) = self.payload() {
            return Err(ClientError::SessionActive(active.id.clone()));
        }
        let node = tree
            .get(node_id)
            .ok_or_else(|| ClientError::UnknownNode(node_id.clone()))?;

        tracing::debug!("Drag started for node {}", node_id);
        self.phase = DragPhase::Dragging(DragPayload {
            id: node.id.clone(),
            depth: node.depth,
            parent_id: node.parent_id.clone(),
        });
        self.indicator.hide();
        self.payload().ok_or(ClientError::NoSession)
    }

    /// Re-evaluate the hover for the targets under `pointer`, nearest first.
    ///
    /// Returns `None` when no usable target is under the pointer.
    pub fn hover(
        &mut self,
        tree: &Tree,
        hits: &[DropTargetHit],
        pointer: Point,
    ) -> Result<Option<&HoverState>, ClientError> {
        let payload = self.payload().cloned().ok_or(ClientError::NoSession)?;

        let hover = hits
            .first()
            .and_then(|hit| self.evaluate(tree, &payload, hit, pointer));

        self.phase = match hover {
            Some(hover) => DragPhase::Hovering { payload, hover },
            None => {
                self.indicator.hide();
                DragPhase::Dragging(payload)
            }
        };
        Ok(self.hover_state())
    }

    fn evaluate(
        &mut self,
        tree: &Tree,
        payload: &DragPayload,
        hit: &DropTargetHit,
        pointer: Point,
    ) -> Option<HoverState> {
        match &hit.target {
            DropTargetKind::DropAtEnd => {
                self.indicator.show_drop_at_end(hit.bounds);
                Some(HoverState {
                    target: DropTargetKind::DropAtEnd,
                    operation: DropOperation::ReorderAfter,
                    availability: Availability::Available,
                    options: None,
                })
            }
            DropTargetKind::Node(target) => {
                let options = evaluate_operations(tree, &payload.id, target, self.max_depth)?;
                let operation = self.policy.classify(pointer, hit.bounds);
                let availability = match operation {
                    DropOperation::Combine => options.combine,
                    DropOperation::ReorderBefore => options.reorder_before,
                    DropOperation::ReorderAfter => options.reorder_after,
                };
                self.indicator
                    .show(hit.bounds, operation, !availability.is_available());
                Some(HoverState {
                    target: hit.target.clone(),
                    operation,
                    availability,
                    options: Some(options),
                })
            }
        }
    }

    /// Pointer left the current target but the drag continues
    pub fn leave(&mut self) {
        if let DragPhase::Hovering { payload, .. } = &self.phase {
            let payload = payload.clone();
            self.phase = DragPhase::Dragging(payload);
        }
        self.indicator.hide();
    }

    /// Abort the session. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        if was_active {
            tracing::debug!("Drag cancelled");
        }
        self.phase = DragPhase::Idle;
        self.indicator.hide();
        was_active
    }

    /// Release the pointer and end the session
    pub fn release(&mut self, tree: &Tree) -> Result<DropOutcome, ClientError> {
        let phase = std::mem::replace(&mut self.phase, DragPhase::Idle);
        self.indicator.hide();

        let (payload, hover) = match phase {
            DragPhase::Idle => return Err(ClientError::NoSession),
            DragPhase::Dragging(_) => return Ok(DropOutcome::Cancelled),
            DragPhase::Hovering { payload, hover } => (payload, hover),
        };

        if let Availability::Blocked(reason) = hover.availability {
            tracing::debug!("Drop of node {} blocked: {}", payload.id, reason);
            return Ok(DropOutcome::Blocked(reason));
        }

        let intent = match hover.target {
            DropTargetKind::DropAtEnd => {
                let reference = tree
                    .last_root()
                    .map(|ix| tree.node(ix).id.clone())
                    .filter(|id| *id != payload.id);
                MoveIntent {
                    node_id: payload.id,
                    new_parent_id: None,
                    position: MovePosition::After,
                    reference_id: reference,
                }
            }
            DropTargetKind::Node(target) => {
                let Some(target_node) = tree.get(&target) else {
                    return Ok(DropOutcome::Cancelled);
                };
                let parent = target_node.parent_id.clone();
                match hover.operation {
                    DropOperation::Combine => MoveIntent::inside(payload.id, Some(target)),
                    DropOperation::ReorderBefore => MoveIntent::before(payload.id, parent, target),
                    DropOperation::ReorderAfter => MoveIntent::after(payload.id, parent, target),
                }
            }
        };

        tracing::debug!(
            "Drop committed: node {} {:?} (parent {:?}, reference {:?})",
            intent.node_id,
            intent.position,
            intent.new_parent_id,
            intent.reference_id
        );
        Ok(DropOutcome::Committed(intent))
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
    // 4
    fn fixture() -> Tree {
        Tree::from_flat(vec![
            TreeNode::root(id(1), 1),
            TreeNode::new(id(2), Some(id(1)), 1),
            TreeNode::new(id(3), Some(id(2)), 1),
            TreeNode::root(id(4), 2),
        ])
    }

    fn row(index: f32) -> Rect {
        Rect::new(0.0, index * 30.0, 300.0, 30.0)
    }

    // Pointer positions inside a 30px row
    const TOP: f32 = 2.0;
    const MIDDLE: f32 = 15.0;
    const BOTTOM: f32 = 28.0;

    fn machine() -> DragMachine {
        DragMachine::new(&TreeConfig::default())
    }

    #[test]
    fn test_start_captures_payload_once() {
        let tree = fixture();
        let mut machine = machine();
        let payload = machine.start(&tree, &id(2)).unwrap().clone();
        assert_eq!(
            payload,
            DragPayload {
                id: id(2),
                depth: 1,
                parent_id: Some(id(1))
            }
        );
        assert!(matches!(
            machine.start(&tree, &id(4)),
            Err(ClientError::SessionActive(_))
        ));
    }

    #[test]
    fn test_start_unknown_node() {
        let mut machine = machine();
        assert!(matches!(
            machine.start(&fixture(), &id(99)),
            Err(ClientError::UnknownNode(_))
        ));
        assert!(!machine.is_active());
    }

    #[test]
    fn test_hover_and_release_combine() {
        let tree = fixture();
        let mut machine = machine();
        machine.start(&tree, &id(4)).unwrap();

        let hover = machine
            .hover(&tree, &[DropTargetHit::node(2, row(1.0))], Point::new(5.0, 30.0 + MIDDLE))
            .unwrap()
            .cloned()
            .unwrap();
        assert_eq!(hover.operation, DropOperation::Combine);
        assert!(hover.availability.is_available());
        assert!(machine.indicator().is_some());

        let outcome = machine.release(&tree).unwrap();
        assert_eq!(outcome, DropOutcome::Committed(MoveIntent::inside(id(4), Some(id(2)))));
        assert!(!machine.is_active());
        assert!(machine.indicator().is_none());
    }

    #[test]
    fn test_reorder_uses_target_parent() {
        let tree = fixture();
        let mut machine = machine();
        machine.start(&tree, &id(4)).unwrap();
        machine
            .hover(&tree, &[DropTargetHit::node(3, row(2.0))], Point::new(0.0, 60.0 + TOP))
            .unwrap();
        assert_eq!(
            machine.release(&tree).unwrap(),
            DropOutcome::Committed(MoveIntent::before(id(4), Some(id(2)), id(3)))
        );
    }

    #[test]
    fn test_only_nearest_hit_counts() {
        let tree = fixture();
        let mut machine = machine();
        machine.start(&tree, &id(1)).unwrap();
        // Nearest target is the node itself; the outer root must be ignored
        let hits = [DropTargetHit::node(1, row(0.0)), DropTargetHit::node(4, row(3.0))];
        let hover = machine
            .hover(&tree, &hits, Point::new(0.0, BOTTOM))
            .unwrap()
            .cloned()
            .unwrap();
        assert_eq!(hover.target, DropTargetKind::Node(id(1)));
        assert_eq!(hover.availability, Availability::Blocked(BlockReason::DropOntoSelf));
    }

    #[test]
    fn test_blocked_release_has_no_intent() {
        let tree = fixture();
        let mut machine = machine();
        machine.start(&tree, &id(1)).unwrap();
        machine
            .hover(&tree, &[DropTargetHit::node(3, row(2.0))], Point::new(0.0, 60.0 + MIDDLE))
            .unwrap();
        assert_eq!(
            machine.release(&tree).unwrap(),
            DropOutcome::Blocked(BlockReason::TargetIsDescendant)
        );
        assert!(!machine.is_active());
    }

    #[test]
    fn test_release_without_target_cancels() {
        let tree = fixture();
        let mut machine = machine();
        machine.start(&tree, &id(3)).unwrap();
        machine
            .hover(&tree, &[DropTargetHit::node(4, row(3.0))], Point::new(0.0, 90.0 + MIDDLE))
            .unwrap();
        machine.leave();
        assert_eq!(machine.release(&tree).unwrap(), DropOutcome::Cancelled);
        assert!(matches!(machine.release(&tree), Err(ClientError::NoSession)));
    }

    #[test]
    fn test_empty_hit_list_returns_to_dragging() {
        let tree = fixture();
        let mut machine = machine();
        machine.start(&tree, &id(3)).unwrap();
        assert!(machine.hover(&tree, &[], Point::default()).unwrap().is_none());
        assert!(matches!(machine.phase(), DragPhase::Dragging(_)));
    }

    #[test]
    fn test_drop_at_end_targets_last_root() {
        let tree = fixture();
        let mut machine = machine();
        machine.start(&tree, &id(3)).unwrap();
        machine
            .hover(&tree, &[DropTargetHit::drop_at_end(row(4.0))], Point::new(0.0, 125.0))
            .unwrap();
        assert_eq!(
            machine.release(&tree).unwrap(),
            DropOutcome::Committed(MoveIntent::after(id(3), None, id(4)))
        );
    }

    #[test]
    fn test_drop_at_end_when_dragging_last_root() {
        let tree = fixture();
        let mut machine = machine();
        machine.start(&tree, &id(4)).unwrap();
        machine
            .hover(&tree, &[DropTargetHit::drop_at_end(row(4.0))], Point::new(0.0, 125.0))
            .unwrap();
        let DropOutcome::Committed(intent) = machine.release(&tree).unwrap() else {
            panic!("expected a committed move");
        };
        assert_eq!(intent.new_parent_id, None);
        assert_eq!(intent.reference_id, None);
    }

    #[test]
    fn test_cancel_clears_session() {
        let tree = fixture();
        let mut machine = machine();
        assert!(!machine.cancel());
        machine.start(&tree, &id(2)).unwrap();
        assert!(machine.cancel());
        assert_eq!(machine.phase(), &DragPhase::Idle);
    }

    #[test]
    fn test_depth_limit_blocks_combine_only() {
        let tree = fixture();
        let mut config = TreeConfig::default();
        config.max_depth = Some(3);
        let mut machine = DragMachine::new(&config);
        machine.start(&tree, &id(1)).unwrap();
        // 1 has subtree depth 2; combine into 4 (depth 0): 0+1+2 = 3 >= 3
        let hover = machine
            .hover(&tree, &[DropTargetHit::node(4, row(3.0))], Point::new(0.0, 90.0 + MIDDLE))
            .unwrap()
            .cloned()
            .unwrap();
        assert!(matches!(
            hover.availability,
            Availability::Blocked(BlockReason::ExceedsMaxDepth { .. })
        ));
        assert!(hover.options.unwrap().reorder_after.is_available());
    }
}
