//! Loosely-typed entity records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entity record: an order-preserving mapping from field name to value.
///
/// Every field is optional. Accessors return `None` for absent fields
/// instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

/// A sub-category field, either a single nested record or a sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Embedded<'a> {
    One(&'a Value),
    Many(&'a [Value]),
}

impl<'a> Embedded<'a> {
    /// Iterate the embedded elements, one for `One`
    pub fn iter(&self) -> impl Iterator<Item = &'a Value> {
        let items: &'a [Value] = match *self {
            Embedded::One(value) => std::slice::from_ref(value),
            Embedded::Many(values) => values,
        };
        items.iter()
    }

    pub fn len(&self) -> usize {
        match self {
            Embedded::One(_) => 1,
            Embedded::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Set a field, keeping its position if it already exists
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Fields in stored order
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The record's `id`, unless absent or null
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id").filter(|v| !v.is_null())
    }

    /// Language name to percentage, when `languages` is a mapping
    pub fn languages(&self) -> Option<&Map<String, Value>> {
        self.0.get("languages").and_then(Value::as_object)
    }

    /// A nested sub-category field.
    ///
    /// Arrays yield `Many`, objects and any other non-null scalar yield `One`.
    pub fn embedded(&self, field: &str) -> Option<Embedded<'_>> {
        match self.0.get(field)? {
            Value::Null => None,
            Value::Array(items) => Some(Embedded::Many(items)),
            other => Some(Embedded::One(other)),
        }
    }

    /// Drop every field not named in `allowed`, keeping stored order
    pub fn retain_fields(&mut self, allowed: &[String]) {
        self.0.retain(|field, _| allowed.iter().any(|a| a == field));
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    /// Wrap a JSON object; any other value is handed back
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => Err(std::fmt::Error),
        }
    }
}
