//! Resolving bare user names to existing User nodes

use crate::corpus::EntityKind;
use crate::graph::Node;
use crate::storage::{GraphStore, NodeFilter, StorageResult};

/// Maps a free-form name to an existing node, if one can be found.
///
/// Resolution is best effort: `Ok(None)` means no match and is not an
/// error.
pub trait NameResolver {
    fn resolve(&self, store: &dyn GraphStore, name: &str) -> StorageResult<Option<Node>>;
}

/// Matches the `name` property of User nodes.
///
/// Tries the name as given, then the "Surname, Forename" form built from
/// the first and last word of a "Forename Surname" input. The first node
/// found in creation order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayNameResolver;

impl DisplayNameResolver {
    fn lookup(store: &dyn GraphStore, name: &str) -> StorageResult<Option<Node>> {
        store.get_node(&NodeFilter::by_property(EntityKind::User.label(), "name", name.into()))
    }
}

/// "Forename Middle Surname" -> "Surname, Forename"; `None` for one word
pub fn surname_first(name: &str) -> Option<String> {
    let mut words = name.split_whitespace();
    let first = words.next()?;
    let last = words.last()?;
    Some(format!("{}, {}", last, first))
}

impl NameResolver for DisplayNameResolver {
    fn resolve(&self, store: &dyn GraphStore, name: &str) -> StorageResult<Option<Node>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(node) = Self::lookup(store, name)? {
            return Ok(Some(node));
        }
        match surname_first(name) {
            Some(reordered) => Self::lookup(store, &reordered),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Properties, PropertyValue};
    use crate::storage::MemoryStore;

    fn user(store: &MemoryStore, id: i64, name: &str) -> Node {
        let mut props = Properties::new();
        props.insert("name".to_string(), name.into());
        store
            .merge_node("User", "id", &PropertyValue::Int(id), props)
            .unwrap()
    }

    #[test]
    fn surname_first_uses_first_and_last_words() {
        assert_eq!(surname_first("Jane Doe").as_deref(), Some("Doe, Jane"));
        assert_eq!(surname_first("Jane Q. Doe").as_deref(), Some("Doe, Jane"));
        assert_eq!(surname_first("jane"), None);
    }

    #[test]
    fn exact_match_wins() {
        let store = MemoryStore::new();
        let exact = user(&store, 1, "Jane Doe");
        user(&store, 2, "Doe, Jane");

        let found = DisplayNameResolver.resolve(&store, "Jane Doe").unwrap().unwrap();
        assert_eq!(found.id, exact.id);
    }

    #[test]
    fn falls_back_to_surname_first() {
        let store = MemoryStore::new();
        let reordered = user(&store, 2, "Doe, Jane");

        let found = DisplayNameResolver.resolve(&store, "Jane Doe").unwrap().unwrap();
        assert_eq!(found.id, reordered.id);
    }

    #[test]
    fn unresolved_is_none() {
        let store = MemoryStore::new();
        user(&store, 1, "Someone Else");
        assert!(DisplayNameResolver.resolve(&store, "Jane Doe").unwrap().is_none());
        assert!(DisplayNameResolver.resolve(&store, "Jane").unwrap().is_none());
        assert!(DisplayNameResolver.resolve(&store, "  ").unwrap().is_none());
    }

    #[test]
    fn first_match_in_creation_order() {
        let store = MemoryStore::new();
        let first = user(&store, 1, "Jane Doe");
        user(&store, 2, "Jane Doe");

        let found = DisplayNameResolver.resolve(&store, "Jane Doe").unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }
}
