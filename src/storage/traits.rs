//! Graph session trait definitions

use crate::graph::{Edge, Node, NodeId, Properties, PropertyValue};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Filter criteria for looking up nodes
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Filter by label (e.g., "User", "Commit")
    pub label: Option<String>,
    /// Property values that must all match
    pub properties: Vec<(String, PropertyValue)>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a label plus a single property match
    pub fn by_property(label: impl Into<String>, key: impl Into<String>, value: PropertyValue) -> Self {
        Self::new().with_label(label).with_property(key, value)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.push((key.into(), value));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if a node matches all criteria
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(ref label) = self.label {
            if &node.label != label {
                return false;
            }
        }
        self.properties
            .iter()
            .all(|(key, expected)| node.properties.get(key) == Some(expected))
    }
}

/// The graph session the projection engine writes through.
///
/// Calls are synchronous and may block. Implementations must be thread-safe
/// (Send + Sync); lookups return nodes in creation order so "first match"
/// is stable.
pub trait GraphStore: Send + Sync {
    // === Node Operations ===

    /// Always create a new anonymous node
    fn create_node(&self, label: &str, properties: Properties) -> StorageResult<Node>;

    /// Get-or-create the node of `label` whose `key_field` equals `key`.
    ///
    /// An existing node keeps its ID; the given properties are merged into it.
    fn merge_node(
        &self,
        label: &str,
        key_field: &str,
        key: &PropertyValue,
        properties: Properties,
    ) -> StorageResult<Node>;

    /// The node `merge_node` wrote for `key_field = key`, found by its
    /// derived ID rather than by scanning
    fn get_keyed(&self, label: &str, key_field: &str, key: &PropertyValue) -> StorageResult<Option<Node>>;

    /// Find nodes matching filter criteria, in creation order
    fn find_nodes(&self, filter: &NodeFilter) -> StorageResult<Vec<Node>>;

    /// First node matching the filter
    fn get_node(&self, filter: &NodeFilter) -> StorageResult<Option<Node>> {
        let filter = filter.clone().with_limit(1);
        Ok(self.find_nodes(&filter)?.into_iter().next())
    }

    /// Number of nodes in the graph
    fn node_count(&self) -> StorageResult<usize>;

    // === Edge Operations ===

    /// Create the relationship, or overwrite the properties of the existing
    /// one with the same `(from, relationship, to)` triple
    fn set_relationship(
        &self,
        from: &NodeId,
        relationship: &str,
        to: &NodeId,
        properties: Properties,
    ) -> StorageResult<Edge>;

    /// Get edges originating from a node
    fn edges_from(&self, node_id: &NodeId) -> StorageResult<Vec<Edge>>;

    /// Number of edges in the graph
    fn edge_count(&self) -> StorageResult<usize>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
