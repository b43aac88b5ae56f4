//! libsql-backed tree store
//!
//! Stores tree records in an existing (or newly created) SQLite table through
//! libsql. The table shape is described by a [`TableLayout`], so the engine can
//! work against host schemas that name their columns differently, use a
//! legacy order column such as `sort_order`, key rows by UUID, or mark root
//! rows with `-1` / `0` instead of `NULL`.
//!
//! # Database Connection Pattern
//!
//! Each operation opens its own connection with a 5 second busy timeout, so
//! futures can move between runtime threads without sharing a connection.
//!
//! # Writes
//!
//! Only the parent and order columns are ever updated. Materialised depth or
//! path columns maintained by the host stay as they are.
//!
//! # Examples
//!
//! ```no_run
//! use arbor_core::db::{LibsqlTreeStore, TableLayout, TreeQuery};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let layout = TableLayout {
//!         table: "categories".to_string(),
//!         order_column: "sort_order".to_string(),
//!         ..TableLayout::default()
//!     };
//!     let store = LibsqlTreeStore::open(PathBuf::from("./data/tree.db"), layout).await?;
//!     store.create_table().await?;
//!
//!     let nodes = store.fetch_all().await?;
//!     println!("{} records", nodes.len());
//!     Ok(())
//! }
//! ```

use crate::db::{DatabaseError, TreeQuery};
use crate::models::{NodeId, TreeNode, ValidationError};
use async_trait::async_trait;
use libsql::params::Params;
use libsql::{Builder, Database, Value};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// How identifiers are stored in the id and parent columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdKind {
    #[default]
    Integer,
    /// Written as lowercase hyphenated text; matched case-insensitively
    Uuid,
    Text,
}

/// Value stored in the parent column for root-level rows
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RootParent {
    #[default]
    Null,
    Id(NodeId),
}

/// Table and column names used by [`LibsqlTreeStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableLayout {
    pub table: String,
    pub id_column: String,
    pub parent_column: String,
    pub order_column: String,
    pub id_kind: IdKind,
    pub root_parent: RootParent,
    /// Extra SQL predicate ANDed into every query (host-trusted)
    pub scope: Option<String>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table: "tree_nodes".to_string(),
            id_column: "id".to_string(),
            parent_column: "parent_id".to_string(),
            order_column: "order".to_string(),
            id_kind: IdKind::Integer,
            root_parent: RootParent::Null,
            scope: None,
        }
    }
}

fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier(name.to_string()))
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

impl TableLayout {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for name in [
            &self.table,
            &self.id_column,
            &self.parent_column,
            &self.order_column,
        ] {
            validate_identifier(name)?;
        }
        if let Some(scope) = &self.scope {
            if scope.contains(';') {
                return Err(ValidationError::invalid_config(
                    "scope",
                    "must be a single predicate",
                ));
            }
        }
        if let RootParent::Id(id) = &self.root_parent {
            let matches_kind = matches!(
                (self.id_kind, id),
                (IdKind::Integer, NodeId::Int(_))
                    | (IdKind::Uuid, NodeId::Uuid(_))
                    | (IdKind::Text, _)
            );
            if !matches_kind {
                return Err(ValidationError::invalid_config(
                    "root_parent",
                    format!("{} does not match id kind {:?}", id, self.id_kind),
                ));
            }
        }
        Ok(())
    }

    /// Column expression used when comparing keys
    fn key_expr(&self, column: &str) -> String {
        match self.id_kind {
            IdKind::Uuid => format!("lower({})", column),
            _ => column.to_string(),
        }
    }

    fn scope_clause(&self) -> String {
        match &self.scope {
            Some(scope) => format!(" AND ({})", scope),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LibsqlTreeStore {
    db: Arc<Database>,
    db_path: PathBuf,
    layout: TableLayout,
}

impl LibsqlTreeStore {
    /// Open (or create) the database file at `db_path`.
    ///
    /// The table itself is not created; call [`LibsqlTreeStore::create_table`]
    /// when the host does not manage the schema.
    pub async fn open(db_path: PathBuf, layout: TableLayout) -> Result<Self, DatabaseError> {
        layout.validate()?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        tracing::debug!(
            "Opened tree store at {:?} (table {})",
            db_path,
            layout.table
        );
        Ok(Self {
            db: Arc::new(db),
            db_path,
            layout,
        })
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Create the tree table and its parent/order index if missing
    pub async fn create_table(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let l = &self.layout;
        let id_type = match l.id_kind {
            IdKind::Integer => "INTEGER",
            IdKind::Uuid | IdKind::Text => "TEXT",
        };

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    {id} {id_type} PRIMARY KEY,
                    {parent} {id_type},
                    {order} INTEGER NOT NULL DEFAULT 0
                )",
                table = quote(&l.table),
                id = quote(&l.id_column),
                parent = quote(&l.parent_column),
                order = quote(&l.order_column),
                id_type = id_type,
            ),
            (),
        )
        .await
        .map_err(|e| DatabaseError::initialization_failed(e.to_string()))?;

        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {index} ON {table} ({parent}, {order})",
                index = quote(&format!("{}_{}_idx", l.table, l.parent_column)),
                table = quote(&l.table),
                parent = quote(&l.parent_column),
                order = quote(&l.order_column),
            ),
            (),
        )
        .await
        .map_err(|e| DatabaseError::initialization_failed(e.to_string()))?;

        Ok(())
    }

    /// Get a connection with busy timeout configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.db.connect().map_err(DatabaseError::LibsqlError)?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        Ok(conn)
    }

    // PRAGMA returns rows, so it goes through query() rather than execute()
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    //
    // VALUE MAPPING
    //

    fn encode_id(&self, id: &NodeId) -> Result<Value, DatabaseError> {
        match (self.layout.id_kind, id) {
            (IdKind::Integer, NodeId::Int(value)) => Ok(Value::Integer(*value)),
            (IdKind::Integer, other) => Err(DatabaseError::decode_failed(
                &self.layout.id_column,
                format!("'{}' is not an integer id", other),
            )),
            (IdKind::Uuid, NodeId::Uuid(uuid)) => Ok(Value::Text(uuid.to_string())),
            (IdKind::Uuid, NodeId::Text(text)) => Uuid::parse_str(text)
                .map(|uuid| Value::Text(uuid.to_string()))
                .map_err(|e| DatabaseError::decode_failed(&self.layout.id_column, e.to_string())),
            (IdKind::Uuid, NodeId::Int(value)) => Err(DatabaseError::decode_failed(
                &self.layout.id_column,
                format!("{} is not a UUID", value),
            )),
            (IdKind::Text, other) => Ok(Value::Text(other.to_string())),
        }
    }

    fn encode_parent(&self, parent: Option<&NodeId>) -> Result<Value, DatabaseError> {
        match (parent, &self.layout.root_parent) {
            (Some(id), _) => self.encode_id(id),
            (None, RootParent::Null) => Ok(Value::Null),
            (None, RootParent::Id(root)) => self.encode_id(root),
        }
    }

    fn decode_id(&self, column: &str, value: Value) -> Result<Option<NodeId>, DatabaseError> {
        let id = match (self.layout.id_kind, value) {
            (_, Value::Null) => return Ok(None),
            (IdKind::Integer, Value::Integer(value)) => NodeId::Int(value),
            (IdKind::Integer, Value::Text(text)) => text
                .trim()
                .parse::<i64>()
                .map(NodeId::Int)
                .map_err(|e| DatabaseError::decode_failed(column, e.to_string()))?,
            (IdKind::Uuid, Value::Text(text)) => Uuid::parse_str(&text)
                .map(NodeId::Uuid)
                .map_err(|e| DatabaseError::decode_failed(column, e.to_string()))?,
            (IdKind::Text, Value::Text(text)) => NodeId::Text(text),
            (IdKind::Text, Value::Integer(value)) => NodeId::Text(value.to_string()),
            (kind, other) => {
                return Err(DatabaseError::decode_failed(
                    column,
                    format!("unexpected value {:?} for {:?} id", other, kind),
                ))
            }
        };
        Ok(Some(id))
    }

    fn row_to_node(&self, row: &libsql::Row) -> Result<TreeNode, DatabaseError> {
        let l = &self.layout;
        let id = self
            .decode_id(&l.id_column, row.get_value(0)?)?
            .ok_or_else(|| DatabaseError::decode_failed(&l.id_column, "NULL id"))?;

        // Both NULL and the configured root value mean "no parent"
        let parent = self
            .decode_id(&l.parent_column, row.get_value(1)?)?
            .filter(|parent| match &l.root_parent {
                RootParent::Id(root) => parent != root,
                RootParent::Null => true,
            });

        let order = match row.get_value(2)? {
            Value::Integer(order) => order,
            Value::Null => 0,
            other => {
                return Err(DatabaseError::decode_failed(
                    &l.order_column,
                    format!("unexpected value {:?}", other),
                ))
            }
        };

        Ok(TreeNode::new(id, parent, order))
    }

    fn select_sql(&self, filter: &str) -> String {
        let l = &self.layout;
        format!(
            "SELECT {id}, {parent}, {order} FROM {table} WHERE {filter}{scope} ORDER BY {order}, {id}",
            id = quote(&l.id_column),
            parent = quote(&l.parent_column),
            order = quote(&l.order_column),
            table = quote(&l.table),
            filter = filter,
            scope = l.scope_clause(),
        )
    }

    async fn query_nodes(&self, sql: &str, params: Vec<Value>) -> Result<Vec<TreeNode>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn.prepare(sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare tree query: {}", e))
        })?;
        let mut rows = stmt
            .query(Params::Positional(params))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute tree query: {}", e))
            })?;

        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            nodes.push(self.row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(sql, Params::Positional(params))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("{}: {}", sql, e)))
    }
}

#[async_trait]
impl TreeQuery for LibsqlTreeStore {
    async fn fetch_all(&self) -> anyhow::Result<Vec<TreeNode>> {
        let sql = self.select_sql("1 = 1");
        Ok(self.query_nodes(&sql, Vec::new()).await?)
    }

    async fn fetch_by_id(&self, id: &NodeId) -> anyhow::Result<Option<TreeNode>> {
        let column = self.layout.key_expr(&quote(&self.layout.id_column));
        let sql = self.select_sql(&format!("{} = ?", column));
        let mut nodes = self.query_nodes(&sql, vec![self.encode_id(id)?]).await?;
        Ok(nodes.pop())
    }

    async fn fetch_children(&self, parent: Option<&NodeId>) -> anyhow::Result<Vec<TreeNode>> {
        let column = self.layout.key_expr(&quote(&self.layout.parent_column));
        let (filter, params) = match (parent, &self.layout.root_parent) {
            (Some(id), _) => (format!("{} = ?", column), vec![self.encode_id(id)?]),
            (None, RootParent::Null) => (format!("{} IS NULL", column), Vec::new()),
            (None, RootParent::Id(root)) => (
                format!("({col} IS NULL OR {col} = ?)", col = column),
                vec![self.encode_id(root)?],
            ),
        };
        Ok(self.query_nodes(&self.select_sql(&filter), params).await?)
    }

    async fn save(&self, node: TreeNode) -> anyhow::Result<()> {
        let l = &self.layout;
        let sql = format!(
            "UPDATE {table} SET {parent} = ?, {order} = ? WHERE {id} = ?{scope}",
            table = quote(&l.table),
            parent = quote(&l.parent_column),
            order = quote(&l.order_column),
            id = l.key_expr(&quote(&l.id_column)),
            scope = l.scope_clause(),
        );
        let params = vec![
            self.encode_parent(node.parent_id.as_ref())?,
            Value::Integer(node.order),
            self.encode_id(&node.id)?,
        ];
        let affected = self.execute(&sql, params).await?;
        if affected == 0 {
            tracing::debug!("Save of node {} matched no rows", node.id);
        }
        Ok(())
    }

    async fn insert(&self, node: TreeNode) -> anyhow::Result<()> {
        let l = &self.layout;
        let sql = format!(
            "INSERT INTO {table} ({id}, {parent}, {order}) VALUES (?, ?, ?)",
            table = quote(&l.table),
            id = quote(&l.id_column),
            parent = quote(&l.parent_column),
            order = quote(&l.order_column),
        );
        let params = vec![
            self.encode_id(&node.id)?,
            self.encode_parent(node.parent_id.as_ref())?,
            Value::Integer(node.order),
        ];
        self.execute(&sql, params).await?;
        Ok(())
    }

    async fn delete_subtree(&self, id: &NodeId) -> anyhow::Result<usize> {
        let l = &self.layout;
        // UNION (not UNION ALL) stops on looping parent pointers
        let sql = format!(
            "WITH RECURSIVE subtree(node_id) AS (
                 SELECT ?
                 UNION
                 SELECT {child_id} FROM {table} t JOIN subtree s ON {child_parent} = s.node_id
             )
             DELETE FROM {table} WHERE {id} IN (SELECT node_id FROM subtree){scope}",
            table = quote(&l.table),
            child_id = l.key_expr(&format!("t.{}", quote(&l.id_column))),
            child_parent = l.key_expr(&format!("t.{}", quote(&l.parent_column))),
            id = l.key_expr(&quote(&l.id_column)),
            scope = l.scope_clause(),
        );
        let removed = self.execute(&sql, vec![self.encode_id(id)?]).await?;
        tracing::debug!("Deleted subtree of {} ({} rows)", id, removed);
        Ok(removed as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_rejects_bad_identifiers() {
        let layout = TableLayout {
            order_column: "sort order; DROP".to_string(),
            ..TableLayout::default()
        };
        assert!(matches!(
            layout.validate(),
            Err(ValidationError::InvalidIdentifier(_))
        ));
        assert!(TableLayout::default().validate().is_ok());
    }

    #[test]
    fn test_uuid_keys_compare_lowercased() {
        let layout = TableLayout {
            id_kind: IdKind::Uuid,
            ..TableLayout::default()
        };
        assert_eq!(layout.key_expr("\"id\""), "lower(\"id\")");
        assert_eq!(TableLayout::default().key_expr("\"id\""), "\"id\"");
    }

    #[test]
    fn test_layout_checks_root_parent_kind() {
        let layout = TableLayout {
            id_kind: IdKind::Uuid,
            root_parent: RootParent::Id(NodeId::Int(-1)),
            ..TableLayout::default()
        };
        assert!(layout.validate().is_err());

        let layout = TableLayout {
            root_parent: RootParent::Id(NodeId::Int(-1)),
            ..TableLayout::default()
        };
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_layout_deserializes_with_defaults() {
        let layout: TableLayout =
            serde_json::from_str(r#"{"table": "categories", "orderColumn": "sort_order"}"#).unwrap();
        assert_eq!(layout.table, "categories");
        assert_eq!(layout.order_column, "sort_order");
        assert_eq!(layout.id_column, "id");
        assert_eq!(layout.root_parent, RootParent::Null);
    }
}
