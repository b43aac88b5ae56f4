//! Tree Node Data Structures
//!
//! This module defines the flat record shape the engine works with. A `TreeNode`
//! is what the store hands out and what the engine writes back: identity,
//! parent pointer and sibling order. Nesting is never stored on the record
//! itself; it is rebuilt by [`crate::models::Tree`] on every load.
//!
//! # Identifiers
//!
//! Hosts key their tables with integers, UUIDs or plain strings. [`NodeId`]
//! keeps whichever form it was given, so an integer key never turns into a
//! string on the way back to the store and a UUID is never parsed as a number.
//!
//! # Examples
//!
//! ```rust
//! use arbor_core::models::{NodeId, TreeNode};
//!
//! let root = TreeNode::root(NodeId::from(1), 1);
//! let child = TreeNode::new(NodeId::from(2), Some(NodeId::from(1)), 1);
//!
//! assert!(root.is_root());
//! assert_eq!(child.parent_id, Some(NodeId::Int(1)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for tree records and layout definitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid node ID format: {0}")]
    InvalidId(String),

    #[error("Invalid identifier '{0}': only [A-Za-z_][A-Za-z0-9_]* is allowed")]
    InvalidIdentifier(String),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl ValidationError {
    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Opaque node identifier.
///
/// Serialized untagged: integers stay JSON numbers, UUIDs and free-form keys
/// stay JSON strings. Ordering is total (variant first, then value) so ties on
/// `order` can be broken deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Uuid(Uuid),
    Text(String),
}

impl NodeId {
    /// Parse a textual key into the most specific identifier form.
    ///
    /// Used for string-typed sources such as rendered attributes, where the
    /// original type has to be recovered from the text.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidId(raw.to_string()));
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Ok(Self::Int(value));
        }
        if let Ok(uuid) = Uuid::parse_str(trimmed) {
            return Ok(Self::Uuid(uuid));
        }
        Ok(Self::Text(trimmed.to_string()))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Uuid(uuid) => write!(f, "{}", uuid),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Uuid> for NodeId {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One record of the hierarchy as stored.
///
/// # Fields
///
/// - `id`: identifier, preserved exactly through every round trip
/// - `parent_id`: parent pointer, `None` for root-level records. The store maps
///   `None` to its configured root-parent value and back.
/// - `order`: 1-based position within the sibling group
/// - `depth`: distance from the root level. Derived by the tree builder and
///   the optimistic mutator; stores never persist it from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: NodeId,

    #[serde(with = "crate::models::root_marker", default)]
    pub parent_id: Option<NodeId>,

    pub order: i64,

    #[serde(default)]
    pub depth: u32,
}

impl TreeNode {
    pub fn new(id: NodeId, parent_id: Option<NodeId>, order: i64) -> Self {
        Self {
            id,
            parent_id,
            order,
            depth: 0,
        }
    }

    /// Create a root-level record
    pub fn root(id: NodeId, order: i64) -> Self {
        Self::new(id, None, order)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Sort key used wherever siblings are ordered: `(order, id)`
    pub fn sort_key(&self) -> (i64, &NodeId) {
        (self.order, &self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_id_preserves_integer_type() {
        let id: NodeId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id, NodeId::Int(42));
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(42));
    }

    #[test]
    fn test_node_id_preserves_uuid_type() {
        let raw = "7f1c1d8e-2b1f-4c55-9d6c-2f1a4b3c9e10";
        let id: NodeId = serde_json::from_value(json!(raw)).unwrap();
        assert!(matches!(id, NodeId::Uuid(_)));
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(raw));
    }

    #[test]
    fn test_node_id_numeric_string_stays_text_when_deserialized() {
        // A JSON string is never coerced to a number
        let id: NodeId = serde_json::from_value(json!("17")).unwrap();
        assert_eq!(id, NodeId::Text("17".to_string()));
    }

    #[test]
    fn test_node_id_parse_recovers_most_specific_form() {
        assert_eq!(NodeId::parse("17").unwrap(), NodeId::Int(17));
        assert!(matches!(
            NodeId::parse("7f1c1d8e-2b1f-4c55-9d6c-2f1a4b3c9e10").unwrap(),
            NodeId::Uuid(_)
        ));
        assert_eq!(
            NodeId::parse("category-a").unwrap(),
            NodeId::Text("category-a".to_string())
        );
        assert!(NodeId::parse("  ").is_err());
    }

    #[test]
    fn test_tree_node_serialization_uses_camel_case_and_root_marker() {
        let node = TreeNode::root(NodeId::from(3), 2);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], json!(3));
        assert_eq!(value["parentId"], json!(-1));
        assert_eq!(value["order"], json!(2));
    }

    #[test]
    fn test_sort_key_breaks_ties_by_id() {
        let a = TreeNode::root(NodeId::from(2), 1);
        let b = TreeNode::root(NodeId::from(1), 1);
        assert!(b.sort_key() < a.sort_key());
    }
}
