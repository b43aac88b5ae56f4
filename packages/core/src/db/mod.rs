//! Database Layer
//!
//! Storage for tree records:
//!
//! - [`TreeQuery`] - the async storage abstraction the engine depends on
//! - [`MemoryTreeStore`] - in-process implementation
//! - [`LibsqlTreeStore`] - libsql/SQLite implementation over a configurable
//!   [`TableLayout`]
//! - [`TreeEvent`] - domain events broadcast after moves
//!
//! # Architecture
//!
//! The move processor only ever sees `Arc<dyn TreeQuery>`. Root-level records
//! are `parent_id: None` above this layer; each store maps that to its own
//! root-parent representation.

mod error;
pub mod events;
mod libsql_store;
mod memory_store;
mod tree_query;

pub use error::DatabaseError;
pub use events::TreeEvent;
pub use libsql_store::{IdKind, LibsqlTreeStore, RootParent, TableLayout};
pub use memory_store::MemoryTreeStore;
pub use tree_query::TreeQuery;
