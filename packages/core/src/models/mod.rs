//! Data Models
//!
//! This module contains the core data structures used throughout Arbor:
//!
//! - `TreeNode` - Flat stored record (id, parent pointer, sibling order)
//! - `MoveIntent` - Instruction to relocate one node
//! - `Tree` - Nested arena view rebuilt from the flat records on every load
//! - `ExpandState` - Per-node expand/collapse flags
//!
//! Root-level records carry `parent_id: None` everywhere inside the engine;
//! see [`root_marker`] for how that is encoded for clients.

mod expand_state;
mod move_intent;
mod node;
pub mod root_marker;
mod tree;

pub use expand_state::ExpandState;
pub use move_intent::{MoveIntent, MovePosition};
pub use node::{NodeId, TreeNode, ValidationError};
pub use root_marker::CLIENT_ROOT_MARKER;
pub use tree::{NodeIndex, RenderRow, Tree, TreeItem};
