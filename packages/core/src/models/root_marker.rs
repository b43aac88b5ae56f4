//! Client-side root marker encoding
//!
//! The interaction layer and its wire payloads talk about "no parent" with a
//! sentinel instead of an absent field. Inside the engine that is always
//! `Option::None`; stores translate `None` to their own root-parent value
//! (NULL, -1, 0, ...) via [`crate::db::RootParent`].
//!
//! On the wire `None` is written as [`CLIENT_ROOT_MARKER`]. Reading accepts the
//! marker as a number or a string, and `null`.

use crate::models::NodeId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel the client uses for "no parent"
pub const CLIENT_ROOT_MARKER: i64 = -1;

pub fn is_root_marker(id: &NodeId) -> bool {
    match id {
        NodeId::Int(value) => *value == CLIENT_ROOT_MARKER,
        NodeId::Text(text) => text.trim() == CLIENT_ROOT_MARKER.to_string(),
        NodeId::Uuid(_) => false,
    }
}

/// Normalise a wire parent value into the engine's `Option` form
pub fn from_wire(id: Option<NodeId>) -> Option<NodeId> {
    id.filter(|id| !is_root_marker(id))
}

pub fn serialize<S>(value: &Option<NodeId>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(id) => id.serialize(serializer),
        None => serializer.serialize_i64(CLIENT_ROOT_MARKER),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NodeId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NodeId>::deserialize(deserializer)?;
    Ok(from_wire(raw))
}
