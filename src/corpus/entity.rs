//! Entity kinds and their primary keys

use serde_json::{Map, Value};

/// The kinds of entity a corpus carries, each a graph node label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Namespace,
    User,
    Commit,
    File,
    Language,
    Milestone,
    Issue,
    MergeRequest,
    Release,
}

impl EntityKind {
    /// Graph node label
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Project => "Project",
            EntityKind::Namespace => "Namespace",
            EntityKind::User => "User",
            EntityKind::Commit => "Commit",
            EntityKind::File => "File",
            EntityKind::Language => "Language",
            EntityKind::Milestone => "Milestone",
            EntityKind::Issue => "Issue",
            EntityKind::MergeRequest => "MergeRequest",
            EntityKind::Release => "Release",
        }
    }

    /// Candidate primary-key fields, tried in order
    pub fn key_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::User => &["id", "username", "name"],
            EntityKind::Language => &["name"],
            EntityKind::Release => &["id", "tag_name"],
            // Set by the projector from the project id and the file path
            EntityKind::File => &["location"],
            _ => &["id"],
        }
    }

    /// The first present, non-null key field of a record and its value
    pub fn primary_key<'a>(&self, record: &'a Value) -> Option<(&'static str, &'a Value)> {
        self.key_in(record.as_object()?)
    }

    pub fn key_in<'a>(&self, fields: &'a Map<String, Value>) -> Option<(&'static str, &'a Value)> {
        self.key_fields().iter().find_map(|field| {
            fields
                .get(*field)
                .filter(|v| !v.is_null())
                .map(|v| (*field, v))
        })
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
