//! SQLite storage backend for the property graph

use super::traits::{GraphStore, NodeFilter, OpenStore, StorageError, StorageResult};
use crate::graph::{Edge, EdgeId, Node, NodeId, Properties, PropertyValue};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const NODE_COLUMNS: &str = "id, label, key_field, properties_json, metadata_json";
const EDGE_COLUMNS: &str = "id, source_id, target_id, relationship, properties_json, created_at";

/// Raw node columns: id, label, key field, properties, metadata
type NodeRow = (String, String, Option<String>, String, String);

/// SQLite-backed graph store
///
/// Uses a single SQLite database file with tables for nodes and edges.
/// Thread-safe via internal mutex on the connection. Creation order is
/// kept in an autoincrement `seq` column so lookups are stable.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                label TEXT NOT NULL,
                key_field TEXT,
                properties_json TEXT NOT NULL,
                metadata_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_label
                ON nodes(label);

            -- Name lookups when resolving users
            CREATE INDEX IF NOT EXISTS idx_nodes_name
                ON nodes(label, json_extract(properties_json, '$.name'));
            CREATE INDEX IF NOT EXISTS idx_nodes_username
                ON nodes(label, json_extract(properties_json, '$.username'));

            -- One edge per (source, relationship, target); re-setting overwrites
            CREATE TABLE IF NOT EXISTS edges (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                relationship TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (source_id, relationship, target_id),
                FOREIGN KEY (source_id) REFERENCES nodes(id) ON DELETE CASCADE,
                FOREIGN KEY (target_id) REFERENCES nodes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_edges_source
                ON edges(source_id);
            CREATE INDEX IF NOT EXISTS idx_edges_target
                ON edges(target_id);

            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn insert_node(conn: &Connection, node: &Node) -> StorageResult<()> {
        conn.execute(
            "INSERT INTO nodes (id, label, key_field, properties_json, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                node.id.as_str(),
                node.label,
                node.key,
                serde_json::to_string(&node.properties)?,
                serde_json::to_string(&node.metadata)?,
            ],
        )?;
        Ok(())
    }

    fn load_node(conn: &Connection, id: &NodeId) -> StorageResult<Option<Node>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM nodes WHERE id = ?1", NODE_COLUMNS),
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, label, key, properties, metadata)) => {
                Ok(Some(Self::row_to_node(id, label, key, properties, metadata)?))
            }
            None => Ok(None),
        }
    }

    fn node_exists(conn: &Connection, id: &NodeId) -> StorageResult<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT seq FROM nodes WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Deserialize a node from database columns
    fn row_to_node(
        id: String,
        label: String,
        key: Option<String>,
        properties_json: String,
        metadata_json: String,
    ) -> StorageResult<Node> {
        Ok(Node {
            id: NodeId::from_string(id),
            label,
            key,
            properties: serde_json::from_str(&properties_json)?,
            metadata: serde_json::from_str(&metadata_json)?,
        })
    }

    /// Deserialize an edge from database columns
    fn row_to_edge(
        id: String,
        source_id: String,
        target_id: String,
        relationship: String,
        properties_json: String,
        created_at: String,
    ) -> StorageResult<Edge> {
        use chrono::DateTime;

        Ok(Edge {
            id: EdgeId::from_string(id),
            source: NodeId::from_string(source_id),
            target: NodeId::from_string(target_id),
            relationship,
            properties: serde_json::from_str(&properties_json)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::DateParse(e.to_string()))?
                .with_timezone(&chrono::Utc),
        })
    }

    fn query_edges(conn: &Connection, sql: &str, arg: &str) -> StorageResult<Vec<Edge>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![arg], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let (id, source, target, rel, props, created) = row?;
            edges.push(Self::row_to_edge(id, source, target, rel, props, created)?);
        }
        Ok(edges)
    }
}

/// JSON path of a top-level property, for plain identifier keys only
fn json_path(key: &str) -> Option<String> {
    let mut chars = key.chars();
    let first = chars.next()?;
    let plain = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    plain.then(|| format!("$.{}", key))
}

/// The SQL value `json_extract` yields for a scalar property
fn sql_operand(value: &PropertyValue) -> Option<Box<dyn rusqlite::ToSql>> {
    match value {
        PropertyValue::String(s) => Some(Box::new(s.clone())),
        PropertyValue::Int(i) => Some(Box::new(*i)),
        PropertyValue::Float(f) => Some(Box::new(*f)),
        PropertyValue::Bool(b) => Some(Box::new(*b)),
        PropertyValue::Array(_) | PropertyValue::Object(_) => None,
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl GraphStore for SqliteStore {
    fn create_node(&self, label: &str, properties: Properties) -> StorageResult<Node> {
        let node = Node::new(label).with_properties(properties);
        Self::insert_node(&*self.conn()?, &node)?;
        Ok(node)
    }

    fn merge_node(
        &self,
        label: &str,
        key_field: &str,
        key: &PropertyValue,
        properties: Properties,
    ) -> StorageResult<Node> {
        let conn = self.conn()?;
        let id = NodeId::keyed(label, key_field, key);

        match Self::load_node(&conn, &id)? {
            Some(mut existing) => {
                existing.merge(properties);
                existing.properties.insert(key_field.to_string(), key.clone());
                conn.execute(
                    "UPDATE nodes SET properties_json = ?1, metadata_json = ?2 WHERE id = ?3",
                    params![
                        serde_json::to_string(&existing.properties)?,
                        serde_json::to_string(&existing.metadata)?,
                        existing.id.as_str(),
                    ],
                )?;
                Ok(existing)
            }
            None => {
                let node = Node::keyed(label, key_field, key.clone()).with_properties(properties);
                Self::insert_node(&conn, &node)?;
                Ok(node)
            }
        }
    }

    fn get_keyed(&self, label: &str, key_field: &str, key: &PropertyValue) -> StorageResult<Option<Node>> {
        Self::load_node(&*self.conn()?, &NodeId::keyed(label, key_field, key))
    }

    fn find_nodes(&self, filter: &NodeFilter) -> StorageResult<Vec<Node>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM nodes WHERE 1 = 1", NODE_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref label) = filter.label {
            sql.push_str(" AND label = ?");
            params_vec.push(Box::new(label.clone()));
        }

        // Scalar property matches narrow the rows in SQL; `filter.matches`
        // below remains the exact check
        for (key, value) in &filter.properties {
            if let (Some(path), Some(operand)) = (json_path(key), sql_operand(value)) {
                sql.push_str(&format!(" AND json_extract(properties_json, '{}') = ?", path));
                params_vec.push(operand);
            }
        }
        sql.push_str(" ORDER BY seq");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), |row| -> rusqlite::Result<NodeRow> {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut nodes = Vec::new();
        for row in rows {
            let (id, label, key, properties, metadata) = row?;
            let node = Self::row_to_node(id, label, key, properties, metadata)?;
            if !filter.matches(&node) {
                continue;
            }
            nodes.push(node);
            if filter.limit.is_some_and(|limit| nodes.len() >= limit) {
                break;
            }
        }
        Ok(nodes)
    }

    fn node_count(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn set_relationship(
        &self,
        from: &NodeId,
        relationship: &str,
        to: &NodeId,
        properties: Properties,
    ) -> StorageResult<Edge> {
        let conn = self.conn()?;
        for endpoint in [from, to] {
            if !Self::node_exists(&conn, endpoint)? {
                return Err(StorageError::NodeNotFound(endpoint.to_string()));
            }
        }

        let edge = Edge::new(from.clone(), to.clone(), relationship).with_properties(properties);
        conn.execute(
            r#"
            INSERT INTO edges (id, source_id, target_id, relationship, properties_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(source_id, relationship, target_id) DO UPDATE SET
                properties_json = excluded.properties_json
            "#,
            params![
                edge.id.as_str(),
                edge.source.as_str(),
                edge.target.as_str(),
                edge.relationship,
                serde_json::to_string(&edge.properties)?,
                edge.created_at.to_rfc3339(),
            ],
        )?;

        // Read back: on conflict the stored edge keeps its original id
        let sql = format!(
            "SELECT {} FROM edges WHERE source_id = ?1 AND relationship = ?2 AND target_id = ?3",
            EDGE_COLUMNS
        );
        let row = conn.query_row(
            &sql,
            params![from.as_str(), relationship, to.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )?;
        let (id, source, target, rel, props, created) = row;
        Self::row_to_edge(id, source, target, rel, props, created)
    }

    fn edges_from(&self, node_id: &NodeId) -> StorageResult<Vec<Edge>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM edges WHERE source_id = ?1 ORDER BY seq", EDGE_COLUMNS);
        Self::query_edges(&conn, &sql, node_id.as_str())
    }

    fn edge_count(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
