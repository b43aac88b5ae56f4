//! Arbor Core - hierarchical reorder engine
//!
//! This crate keeps a flat list of parent-linked, sibling-ordered records
//! presented as a nested tree, and lets users rearrange it by drag and drop.
//!
//! # Architecture
//!
//! - **Flat storage**: records carry only `id`, `parent_id` and a 1-based
//!   `order`; nesting and depth are rebuilt on every load
//! - **Optimistic client**: drops are validated, applied to the rendered tree
//!   at once and persisted immediately or as one saved batch
//! - **Dense ordering**: every persisted move leaves both affected sibling
//!   groups numbered `1..=N`
//! - **libsql**: embedded SQLite-compatible storage over a host-defined table
//!   layout, plus an in-memory store
//!
//! # Modules
//!
//! - [`models`] - Records, identifiers, the nested tree and expand state
//! - [`operations`] - Structural validation, drop classification, ordering
//! - [`client`] - Drag state machine, indicator, mutator, change accumulator
//! - [`services`] - Move processor and tree service
//! - [`db`] - Storage abstraction with memory and libsql stores
//! - [`config`] - Per-tree configuration

pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use client::{ClientError, TreeBackend, TreeView};
pub use config::TreeConfig;
pub use db::{LibsqlTreeStore, MemoryTreeStore, TableLayout, TreeQuery};
pub use models::{MoveIntent, MovePosition, NodeId, Tree, TreeNode};
pub use services::{MoveProcessor, TreeService, TreeServiceError};
