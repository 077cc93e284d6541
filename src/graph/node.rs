//! Node representation in the property graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Namespace for deterministic node IDs of keyed nodes
const KEYED_NODE_NS: Uuid = Uuid::from_bytes([
    0x3f, 0x1d, 0x6a, 0x52, 0x8e, 0x0b, 0x4c, 0x7e, 0x9a, 0x21, 0x5d, 0xc4, 0x70, 0x13, 0xe8, 0xb6,
]);

/// Unique identifier for a node
///
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random NodeId (for anonymous nodes)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Derive the NodeId of a keyed node.
    ///
    /// The same label, key field and key value always produce the same ID,
    /// so a persistent store addresses the same node across runs. The key's
    /// type is part of the name: `"30"` and `30` are different keys.
    pub fn keyed(label: &str, key_field: &str, key: &PropertyValue) -> Self {
        let name = format!("{}:{}={:?}", label, key_field, key);
        Self(Uuid::new_v5(&KEYED_NODE_NS, name.as_bytes()).to_string())
    }

    /// Create a NodeId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
    Object(HashMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Convert a JSON value into a property value. `null` has no property
    /// representation and yields `None`; nulls nested in arrays or objects
    /// are dropped.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => n.as_f64().map(Self::Float),
            },
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(items) => Some(Self::Array(
                items.iter().filter_map(Self::from_json).collect(),
            )),
            Value::Object(map) => Some(Self::Object(
                map.iter()
                    .filter_map(|(k, v)| Self::from_json(v).map(|pv| (k.clone(), pv)))
                    .collect(),
            )),
        }
    }

    /// The string payload, if this is a string property
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
            other => match serde_json::to_string(other) {
                Ok(json) => write!(f, "{}", json),
                Err(_) => Err(std::fmt::Error),
            },
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Properties collection
pub type Properties = HashMap<String, PropertyValue>;

/// Build a property collection from the scalar and nested fields of a JSON
/// object, skipping nulls.
pub fn properties_from_json(map: &serde_json::Map<String, Value>) -> Properties {
    map.iter()
        .filter_map(|(k, v)| PropertyValue::from_json(v).map(|pv| (k.clone(), pv)))
        .collect()
}

/// Node metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// When the node was created
    pub created_at: Option<DateTime<Utc>>,
    /// When the node was last merged into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// A node in the property graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Node type (e.g. "Project", "User", "Commit")
    pub label: String,
    /// Name of the primary-key property, for keyed nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Entity properties
    pub properties: Properties,
    /// Node metadata
    pub metadata: NodeMetadata,
}

impl Node {
    /// Create an anonymous node with a random ID
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            label: label.into(),
            key: None,
            properties: HashMap::new(),
            metadata: NodeMetadata {
                created_at: Some(Utc::now()),
                ..Default::default()
            },
        }
    }

    /// Create a keyed node; the key is stored as a regular property as well
    pub fn keyed(label: impl Into<String>, key_field: impl Into<String>, key: PropertyValue) -> Self {
        let label = label.into();
        let key_field = key_field.into();
        let mut node = Self::new(label);
        node.id = NodeId::keyed(&node.label, &key_field, &key);
        node.properties.insert(key_field.clone(), key);
        node.key = Some(key_field);
        node
    }

    /// Add several properties, overwriting existing values
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Get a property by name
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Merge properties into an existing node, keeping its identity
    pub fn merge(&mut self, properties: Properties) {
        self.properties.extend(properties);
        self.metadata.modified_at = Some(Utc::now());
    }
}
