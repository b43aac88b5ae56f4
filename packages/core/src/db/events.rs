//! Domain Events for tree moves
//!
//! Emitted by [`crate::services::TreeService`] over a tokio broadcast channel
//! after moves are persisted. Hosts subscribe to refresh other views of the
//! same tree without coupling to the store.
//!
//! # Event Flow
//!
//! 1. A batch of moves is handed to the service
//! 2. The move processor applies them one by one
//! 3. `NodeMoved` / `SiblingsReordered` are emitted per applied move
//! 4. One `TreeReordered` closes the batch

use crate::models::{MoveIntent, NodeId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeEvent {
    /// A node's parent pointer was persisted
    #[serde(rename_all = "camelCase")]
    NodeMoved {
        node_id: NodeId,
        old_parent: Option<NodeId>,
        new_parent: Option<NodeId>,
    },

    /// Orders in one sibling group were rewritten
    #[serde(rename_all = "camelCase")]
    SiblingsReordered {
        parent: Option<NodeId>,
        changed: usize,
    },

    /// A submitted batch finished
    #[serde(rename_all = "camelCase")]
    TreeReordered {
        moves: Vec<MoveIntent>,
        applied: usize,
        at: DateTime<Utc>,
    },
}

impl TreeEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            TreeEvent::NodeMoved { .. } => "node:moved",
            TreeEvent::SiblingsReordered { .. } => "siblings:reordered",
            TreeEvent::TreeReordered { .. } => "tree:reordered",
        }
    }
}
