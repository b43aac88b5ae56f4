//! Pure tree operations
//!
//! Everything here is synchronous and side-effect free: structural validation,
//! pointer classification and dense sibling ordering. Both the interaction
//! layer ([`crate::client`]) and the server-side move processor
//! ([`crate::services`]) build on these.

pub mod hitbox;
pub mod ordering;
pub mod validator;

pub use hitbox::{classify_drop, DropOperation, HitboxPolicy, Point, Rect, ThreeZoneHitbox};
pub use ordering::{arrange, placement, renumber, Placement};
pub use validator::{
    check_move, evaluate_operations, is_descendant_of, subtree_depth, would_exceed_depth,
    Availability, BlockReason, OperationAvailability,
};
