//! Interaction layer
//!
//! Everything that runs next to the rendered tree: the drag state machine and
//! its drop indicator, the optimistic mutator, the change accumulator and the
//! [`TreeView`] controller that ties them to a [`TreeBackend`].
//!
//! # Architecture
//!
//! ```text
//! pointer events ──▶ DragMachine ──(MoveIntent)──▶ apply_move ──▶ ChangeAccumulator
//!                        │                                          │
//!                   validator + hitbox                 immediate: submit now
//!                        │                             batched:   queue until save
//!                   DropIndicator                                   │
//!                                                             TreeBackend
//! ```

pub mod accumulator;
pub mod drag;
mod error;
pub mod indicator;
pub mod mutator;
pub mod view;

pub use accumulator::{ChangeAccumulator, SaveAffordances, SaveMode};
pub use drag::{
    DragMachine, DragPayload, DragPhase, DropOutcome, DropTargetHit, DropTargetKind, HoverState,
};
pub use error::ClientError;
pub use indicator::{DropIndicator, IndicatorShape, IndicatorStyle, IndicatorTone};
pub use mutator::{apply_move, MutationError, MutationSummary};
pub use view::{ListenerDiff, RowView, TreeBackend, TreeView, ViewModel};
