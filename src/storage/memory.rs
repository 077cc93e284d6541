//! In-process graph store

use super::traits::{GraphStore, NodeFilter, StorageError, StorageResult};
use crate::graph::{Edge, Node, NodeId, Properties, PropertyValue};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Graph {
    /// Nodes in creation order
    nodes: Vec<Node>,
    /// Position of each node in `nodes`
    index: HashMap<NodeId, usize>,
    /// Edges in creation order
    edges: Vec<Edge>,
    /// Position of each `(source, relationship, target)` edge in `edges`
    triples: HashMap<(NodeId, String, NodeId), usize>,
}

/// Graph store held entirely in memory.
///
/// Used for dry runs and tests; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: RwLock<Graph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Graph>> {
        self.graph.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Graph>> {
        self.graph.write().map_err(|_| StorageError::LockPoisoned)
    }

    /// Snapshot of all edges, in creation order
    pub fn edges(&self) -> StorageResult<Vec<Edge>> {
        Ok(self.read()?.edges.clone())
    }
}

impl Graph {
    fn insert(&mut self, node: Node) {
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }
}

impl GraphStore for MemoryStore {
    fn create_node(&self, label: &str, properties: Properties) -> StorageResult<Node> {
        let node = Node::new(label).with_properties(properties);
        self.write()?.insert(node.clone());
        Ok(node)
    }

    fn merge_node(
        &self,
        label: &str,
        key_field: &str,
        key: &PropertyValue,
        properties: Properties,
    ) -> StorageResult<Node> {
        let id = NodeId::keyed(label, key_field, key);
        let mut graph = self.write()?;

        let existing_pos = graph.index.get(&id).copied();
        if let Some(pos) = existing_pos {
            let existing = &mut graph.nodes[pos];
            existing.merge(properties);
            existing.properties.insert(key_field.to_string(), key.clone());
            return Ok(existing.clone());
        }

        let node = Node::keyed(label, key_field, key.clone()).with_properties(properties);
        graph.insert(node.clone());
        Ok(node)
    }

    fn get_keyed(&self, label: &str, key_field: &str, key: &PropertyValue) -> StorageResult<Option<Node>> {
        let id = NodeId::keyed(label, key_field, key);
        Ok(self.read()?.node(&id).cloned())
    }

    fn find_nodes(&self, filter: &NodeFilter) -> StorageResult<Vec<Node>> {
        let graph = self.read()?;
        let matching = graph.nodes.iter().filter(|node| filter.matches(node)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    fn node_count(&self) -> StorageResult<usize> {
        Ok(self.read()?.nodes.len())
    }

    fn set_relationship(
        &self,
        from: &NodeId,
        relationship: &str,
        to: &NodeId,
        properties: Properties,
    ) -> StorageResult<Edge> {
        let mut graph = self.write()?;
        for endpoint in [from, to] {
            if !graph.index.contains_key(endpoint) {
                return Err(StorageError::NodeNotFound(endpoint.to_string()));
            }
        }

        let triple = (from.clone(), relationship.to_string(), to.clone());
        if let Some(&pos) = graph.triples.get(&triple) {
            let existing = &mut graph.edges[pos];
            existing.properties = properties;
            return Ok(existing.clone());
        }

        let edge = Edge::new(from.clone(), to.clone(), relationship).with_properties(properties);
        let pos = graph.edges.len();
        graph.edges.push(edge.clone());
        graph.triples.insert(triple, pos);
        Ok(edge)
    }

    fn edges_from(&self, node_id: &NodeId) -> StorageResult<Vec<Edge>> {
        Ok(self
            .read()?
            .edges
            .iter()
            .filter(|e| &e.source == node_id)
            .cloned()
            .collect())
    }

    fn edge_count(&self) -> StorageResult<usize> {
        Ok(self.read()?.edges.len())
    }
}
