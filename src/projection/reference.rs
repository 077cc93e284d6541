//! Decoding inline references to other entities
//!
//! A reference field (`author`, `assignees`, `milestone`, `commits`, ...)
//! may hold a nested object, a list, a bare id, a bare name, or a nested
//! structure that an earlier stage encoded as a JSON string. Strings are
//! decoded as JSON data, never evaluated.

use super::{ProjectionError, ProjectionResult};
use crate::corpus::EntityKind;
use serde_json::Value;

/// The identifying parts of a referenced entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRef {
    pub id: Option<Value>,
    pub name: Option<String>,
    pub username: Option<String>,
}

impl EntityRef {
    pub fn with_id(id: Value) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    fn from_object(map: &serde_json::Map<String, Value>) -> Self {
        let text = |field: &str| map.get(field).and_then(Value::as_str).map(str::to_string);
        Self {
            id: map.get("id").filter(|v| !v.is_null()).cloned(),
            name: text("name"),
            username: text("username"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.username.is_none()
    }
}

/// Decode a reference field into the entities it points at.
///
/// A bare string names a user when `target` is `User` and is an id for
/// every other kind; a bare number is always an id.
pub fn decode_references(value: &Value, target: EntityKind) -> ProjectionResult<Vec<EntityRef>> {
    let mut refs = Vec::new();
    collect(value, target, &mut refs, true)?;
    Ok(refs)
}

fn collect(
    value: &Value,
    target: EntityKind,
    refs: &mut Vec<EntityRef>,
    allow_list: bool,
) -> ProjectionResult<()> {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            let entity = EntityRef::from_object(map);
            if !entity.is_empty() {
                refs.push(entity);
            }
        }
        Value::Array(items) if allow_list => {
            for item in items {
                collect(item, target, refs, false)?;
            }
        }
        Value::Number(_) => refs.push(EntityRef::with_id(value.clone())),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                let decoded: Value = serde_json::from_str(trimmed)
                    .map_err(|e| ProjectionError::MalformedReference(format!("{}: {}", trimmed, e)))?;
                collect(&decoded, target, refs, allow_list)?;
            } else if !trimmed.is_empty() {
                refs.push(match target {
                    EntityKind::User => EntityRef::with_name(trimmed),
                    _ => EntityRef::with_id(Value::String(trimmed.to_string())),
                });
            }
        }
        other => {
            return Err(ProjectionError::MalformedReference(format!(
                "cannot reference a {} by {}",
                target, other
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_reference() {
        let refs = decode_references(&json!({"id": 7, "name": "Jane Doe", "username": "jdoe"}), EntityKind::User).unwrap();
        assert_eq!(
            refs,
            [EntityRef {
                id: Some(json!(7)),
                name: Some("Jane Doe".to_string()),
                username: Some("jdoe".to_string()),
            }]
        );
    }

    #[test]
    fn list_of_mixed_references() {
        let refs = decode_references(&json!([{"id": 1}, 2, "abc123"]), EntityKind::Commit).unwrap();
        let ids: Vec<_> = refs.iter().filter_map(|r| r.id.clone()).collect();
        assert_eq!(ids, [json!(1), json!(2), json!("abc123")]);
    }

    #[test]
    fn bare_string_is_a_user_name() {
        let refs = decode_references(&json!("Jane Doe"), EntityKind::User).unwrap();
        assert_eq!(refs, [EntityRef::with_name("Jane Doe")]);
    }

    #[test]
    fn encoded_structure_is_decoded() {
        let encoded = json!(r#"[{"id": 3, "name": "Doe, Jane"}]"#);
        let refs = decode_references(&encoded, EntityKind::User).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].id, Some(json!(3)));
    }

    #[test]
    fn undecodable_structure_is_malformed() {
        let result = decode_references(&json!("{'id': 3"), EntityKind::Milestone);
        assert!(matches!(result, Err(ProjectionError::MalformedReference(_))));
    }

    #[test]
    fn nested_lists_are_malformed() {
        let result = decode_references(&json!([[1, 2]]), EntityKind::Issue);
        assert!(matches!(result, Err(ProjectionError::MalformedReference(_))));
    }

    #[test]
    fn null_and_empty_yield_nothing() {
        assert!(decode_references(&json!(null), EntityKind::User).unwrap().is_empty());
        assert!(decode_references(&json!({"title": "x"}), EntityKind::User).unwrap().is_empty());
        assert!(decode_references(&json!(""), EntityKind::User).unwrap().is_empty());
    }
}
