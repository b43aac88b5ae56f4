//! Business Services
//!
//! - `MoveProcessor` - applies move batches to a store with dense sibling order
//! - `TreeService` - loading, move submission, cascade delete, expand state
//!   and domain events for one tree
//!
//! Services coordinate between the database layer and the interaction layer.

pub mod error;
pub mod move_processor;
pub mod tree_service;

pub use error::TreeServiceError;
pub use move_processor::{AppliedMove, BatchReport, MoveOutcome, MoveProcessor};
pub use tree_service::TreeService;
