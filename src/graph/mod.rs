//! Core property-graph data structures

mod edge;
mod node;

#[cfg(test)]
mod tests;

pub use edge::{Edge, EdgeId};
pub use node::{properties_from_json, Node, NodeId, NodeMetadata, Properties, PropertyValue};
