//! Error types for the interaction layer
//!
//! A drop that validation refuses is not an error: the drag machine reports it
//! as [`crate::client::DropOutcome::Blocked`]. These variants cover misuse of
//! the session API and failures reported by the backend.

use crate::client::mutator::MutationError;
use crate::models::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("A drag session is already active for node '{0}'")]
    SessionActive(NodeId),

    #[error("No drag session is active")]
    NoSession,

    #[error("Node '{0}' is not in the rendered tree")]
    UnknownNode(NodeId),

    #[error("Move could not be applied: {0}")]
    Mutation(#[from] MutationError),

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl ClientError {
    /// Create a Persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}
