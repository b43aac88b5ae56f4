//! Service Layer Error Types
//!
//! Errors surfaced by the move processor and the tree service. Moves that are
//! skipped on purpose (missing node, refused by revalidation) are not errors;
//! they come back as [`crate::services::MoveOutcome`] values.

use crate::db::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    DatabaseError(#[from] DatabaseError),

    /// Store read or write failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch stopped at `index`; moves before it stay persisted
    #[error("Batch aborted at move {index} after {applied} applied: {reason}")]
    BatchAborted {
        index: usize,
        applied: usize,
        reason: String,
    },
}

impl TreeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Map a store failure, keeping database errors typed
    pub fn from_store(err: anyhow::Error) -> Self {
        match err.downcast::<DatabaseError>() {
            Ok(db_err) => Self::DatabaseError(db_err),
            Err(other) => Self::query_failed(other.to_string()),
        }
    }

    /// Create a query failed error
    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a batch aborted error
    pub fn batch_aborted(index: usize, applied: usize, reason: impl Into<String>) -> Self {
        Self::BatchAborted {
            index,
            applied,
            reason: reason.into(),
        }
    }
}
