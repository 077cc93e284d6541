//! Serialization and identity tests for graph types

use super::{Edge, Node, NodeId, PropertyValue};
use serde_json::json;

#[test]
fn node_id_serializes_as_string() {
    let id = NodeId::from_string("project:1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"project:1\"");
}

#[test]
fn keyed_node_ids_are_deterministic() {
    let a = NodeId::keyed("User", "id", &PropertyValue::Int(7));
    let b = NodeId::keyed("User", "id", &PropertyValue::Int(7));
    let other_label = NodeId::keyed("Project", "id", &PropertyValue::Int(7));
    let other_key = NodeId::keyed("User", "id", &PropertyValue::Int(8));

    assert_eq!(a, b);
    assert_ne!(a, other_label);
    assert_ne!(a, other_key);
}

#[test]
fn keyed_node_ids_depend_on_key_type() {
    let int = NodeId::keyed("Milestone", "id", &PropertyValue::Int(30));
    let string = NodeId::keyed("Milestone", "id", &PropertyValue::from("30"));
    let float = NodeId::keyed("Milestone", "id", &PropertyValue::Float(30.0));

    assert_ne!(int, string);
    assert_ne!(int, float);
    assert_ne!(string, float);
}

#[test]
fn anonymous_node_ids_are_unique() {
    assert_ne!(Node::new("Namespace").id, Node::new("Namespace").id);
}

#[test]
fn keyed_node_stores_key_as_property() {
    let node = Node::keyed("Language", "name", PropertyValue::from("Rust"));
    assert_eq!(node.key.as_deref(), Some("name"));
    assert_eq!(node.property("name"), Some(&PropertyValue::from("Rust")));
}

#[test]
fn property_value_from_json_drops_nulls() {
    assert_eq!(PropertyValue::from_json(&json!(null)), None);
    assert_eq!(PropertyValue::from_json(&json!(3)), Some(PropertyValue::Int(3)));
    assert_eq!(PropertyValue::from_json(&json!(2.5)), Some(PropertyValue::Float(2.5)));

    let nested = PropertyValue::from_json(&json!({"a": 1, "b": null})).unwrap();
    match nested {
        PropertyValue::Object(map) => {
            assert_eq!(map.len(), 1);
            assert_eq!(map.get("a"), Some(&PropertyValue::Int(1)));
        }
        other => panic!("expected object, got {:?}", other),
    }
}

#[test]
fn nested_values_stay_structured() {
    let value = PropertyValue::from_json(&json!(["a", "b"])).unwrap();
    assert_eq!(
        value,
        PropertyValue::Array(vec![PropertyValue::from("a"), PropertyValue::from("b")])
    );
}

#[test]
fn edge_roundtrip() {
    let edge = Edge::new(NodeId::from_string("a"), NodeId::from_string("b"), "owns");
    let json = serde_json::to_string(&edge).unwrap();
    let back: Edge = serde_json::from_str(&json).unwrap();
    assert_eq!(edge, back);
}
