//! Projecting project records into the property graph

use super::reference::{decode_references, EntityRef};
use super::resolver::{DisplayNameResolver, NameResolver};
use super::{ProjectionError, ProjectionResult};
use crate::corpus::{Corpus, Embedded, EntityKind, Record};
use crate::graph::{properties_from_json, Node, Properties, PropertyValue};
use crate::storage::{GraphStore, NodeFilter, StorageResult};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Project fields that become nodes of their own instead of properties
const EMBEDDED_CATEGORIES: &[&str] = &[
    "namespace",
    "owner",
    "users",
    "contributors",
    "commits",
    "files",
    "languages",
    "milestones",
    "issues",
    "mergerequests",
    "releases",
];

/// Key property of File nodes: `<project id>:<path>`
const FILE_LOCATION: &str = "location";

// Relationship types
const BELONGS_TO: &str = "belongs_to";
const OWNS: &str = "owns";
const CONTRIBUTES_TO: &str = "contributes_to";
const COMMITTED_BY: &str = "committed_by";
const IS_CONTAINED_IN: &str = "is_contained_in";
const AUTHORED_BY: &str = "authored_by";
const ASSIGNED_TO: &str = "assigned_to";
const MERGED_BY: &str = "merged_by";
const CLOSED_BY: &str = "closed_by";
const HAS_COMMIT: &str = "has_commit";
const CLOSES: &str = "closes";
const COMMITTED_THROUGH: &str = "committed_through";

/// Counts from one projection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionReport {
    /// Project records projected
    pub projects: usize,
    /// Project records skipped entirely (no id, or the Project node failed)
    pub skipped_projects: usize,
    /// Nodes created or merged
    pub nodes: usize,
    /// Relationships set
    pub relationships: usize,
    /// Elements or references skipped after a per-entity failure
    pub skipped_entities: usize,
    /// Name or key references with no matching node
    pub unresolved_references: usize,
}

/// How an embedded element without a primary key is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unkeyed {
    Create,
    Skip,
}

/// Writes corpus records into a graph session.
///
/// Keyed entities are merged, so projecting the same corpus again touches
/// the same nodes and relationships instead of duplicating them.
pub struct GraphProjector<'a> {
    store: &'a dyn GraphStore,
    resolver: Box<dyn NameResolver + 'a>,
}

/// Per-record state
struct ProjectContext<'r> {
    record: &'r Record,
    node: Node,
    /// Project id for log lines
    project: String,
}

impl<'a> GraphProjector<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            resolver: Box::new(DisplayNameResolver),
        }
    }

    /// Substitute the strategy used to resolve bare user names
    pub fn with_resolver(mut self, resolver: impl NameResolver + 'a) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Project every project record, in corpus order.
    ///
    /// Never fails as a whole: a record without an id is skipped, and
    /// per-entity failures are logged and counted.
    pub fn project(&self, corpus: &Corpus) -> ProjectionReport {
        let mut report = ProjectionReport::default();
        for (index, record) in corpus.projects().iter().enumerate() {
            match self.project_record(record, &mut report) {
                Ok(()) => report.projects += 1,
                Err(e) => {
                    warn!(record = index, error = %e, "skipping project");
                    report.skipped_projects += 1;
                }
            }
        }
        info!(
            projects = report.projects,
            skipped = report.skipped_projects,
            nodes = report.nodes,
            relationships = report.relationships,
            "projection complete"
        );
        report
    }

    /// Project one project record with all of its sub-categories.
    ///
    /// Fails only when the Project node itself cannot be written.
    pub fn project_record(&self, record: &Record, report: &mut ProjectionReport) -> ProjectionResult<()> {
        let id = record
            .id()
            .and_then(PropertyValue::from_json)
            .ok_or_else(|| ProjectionError::MissingPrimaryKey {
                label: EntityKind::Project.label(),
                project: record
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>")
                    .to_string(),
            })?;

        let properties: Properties = record
            .fields()
            .filter(|(field, _)| !EMBEDDED_CATEGORIES.contains(&field.as_str()))
            .filter_map(|(field, value)| PropertyValue::from_json(value).map(|v| (field.clone(), v)))
            .collect();
        let node = self
            .store
            .merge_node(EntityKind::Project.label(), "id", &id, properties)?;
        report.nodes += 1;

        let ctx = ProjectContext {
            record,
            node,
            project: id.to_string(),
        };
        debug!(project = %ctx.project, "projecting project");

        for namespace in self.project_category(&ctx, "namespace", EntityKind::Namespace, Unkeyed::Create, report) {
            self.relate(&namespace.0, BELONGS_TO, &ctx.node, report);
        }
        for owner in self.project_category(&ctx, "owner", EntityKind::User, Unkeyed::Create, report) {
            self.relate(&owner.0, OWNS, &ctx.node, report);
        }
        for user in self.project_category(&ctx, "users", EntityKind::User, Unkeyed::Skip, report) {
            self.relate(&user.0, BELONGS_TO, &ctx.node, report);
        }
        self.project_contributors(&ctx, report);
        for (commit, value) in self.project_category(&ctx, "commits", EntityKind::Commit, Unkeyed::Skip, report) {
            self.relate(&commit, BELONGS_TO, &ctx.node, report);
            self.relate_references(&ctx, &commit, value.get("committer_name"), COMMITTED_BY, EntityKind::User, report);
        }
        for file in self.project_category(&ctx, "files", EntityKind::File, Unkeyed::Skip, report) {
            self.relate(&file.0, BELONGS_TO, &ctx.node, report);
        }
        self.project_languages(&ctx, report);
        for milestone in self.project_category(&ctx, "milestones", EntityKind::Milestone, Unkeyed::Skip, report) {
            self.relate(&milestone.0, BELONGS_TO, &ctx.node, report);
        }
        for (issue, value) in self.project_category(&ctx, "issues", EntityKind::Issue, Unkeyed::Skip, report) {
            self.relate(&issue, BELONGS_TO, &ctx.node, report);
            self.relate_references(&ctx, &issue, value.get("author"), AUTHORED_BY, EntityKind::User, report);
            self.relate_references(&ctx, &issue, value.get("assignees"), ASSIGNED_TO, EntityKind::User, report);
            self.relate_references(&ctx, &issue, value.get("milestone"), BELONGS_TO, EntityKind::Milestone, report);
        }
        for (mr, value) in self.project_category(&ctx, "mergerequests", EntityKind::MergeRequest, Unkeyed::Skip, report) {
            self.relate(&mr, BELONGS_TO, &ctx.node, report);
            self.relate_references(&ctx, &mr, value.get("author"), AUTHORED_BY, EntityKind::User, report);
            self.relate_references(&ctx, &mr, value.get("merged_by"), MERGED_BY, EntityKind::User, report);
            self.relate_references(&ctx, &mr, value.get("closed_by"), CLOSED_BY, EntityKind::User, report);
            self.relate_references(&ctx, &mr, value.get("assignees"), ASSIGNED_TO, EntityKind::User, report);
            self.relate_references(&ctx, &mr, value.get("commits"), HAS_COMMIT, EntityKind::Commit, report);
            self.relate_references(&ctx, &mr, value.get("close_issues"), CLOSES, EntityKind::Issue, report);
        }
        for (release, value) in self.project_category(&ctx, "releases", EntityKind::Release, Unkeyed::Skip, report) {
            self.relate(&release, BELONGS_TO, &ctx.node, report);
            self.relate_references(&ctx, &release, value.get("author"), AUTHORED_BY, EntityKind::User, report);
            self.relate_references(&ctx, &release, value.get("commit"), COMMITTED_THROUGH, EntityKind::Commit, report);
            self.relate_references(&ctx, &release, value.get("milestones"), BELONGS_TO, EntityKind::Milestone, report);
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    /// Write the nodes of one sub-category, returning each with its source
    /// element. Failed elements are logged, counted and left out.
    fn project_category<'r>(
        &self,
        ctx: &ProjectContext<'r>,
        field: &str,
        kind: EntityKind,
        unkeyed: Unkeyed,
        report: &mut ProjectionReport,
    ) -> Vec<(Node, Map<String, Value>)> {
        let Some(embedded) = ctx.record.embedded(field) else {
            info!(project = %ctx.project, category = field, "no elements for category");
            return Vec::new();
        };

        // Only a single nested record may be created without a key
        let unkeyed = match embedded {
            Embedded::One(_) => unkeyed,
            Embedded::Many(_) => Unkeyed::Skip,
        };

        let mut projected = Vec::with_capacity(embedded.len());
        for element in embedded.iter() {
            match self.project_element(ctx, element, kind, unkeyed) {
                Ok((node, fields)) => {
                    report.nodes += 1;
                    projected.push((node, fields));
                }
                Err(e) => {
                    warn!(project = %ctx.project, category = field, error = %e, "element could not be projected");
                    report.skipped_entities += 1;
                }
            }
        }
        projected
    }

    fn project_element(
        &self,
        ctx: &ProjectContext<'_>,
        element: &Value,
        kind: EntityKind,
        unkeyed: Unkeyed,
    ) -> ProjectionResult<(Node, Map<String, Value>)> {
        let mut fields = element_fields(element)?;
        if kind == EntityKind::File {
            add_file_location(&mut fields, &ctx.project);
        }
        let properties = properties_from_json(&fields);

        let key = kind
            .key_in(&fields)
            .and_then(|(field, value)| PropertyValue::from_json(value).map(|v| (field, v)));

        let node = match (key, unkeyed) {
            (Some((key_field, key)), _) => {
                self.store
                    .merge_node(kind.label(), key_field, &key, properties)?
            }
            (None, Unkeyed::Create) => self.store.create_node(kind.label(), properties)?,
            (None, Unkeyed::Skip) => {
                return Err(ProjectionError::MissingPrimaryKey {
                    label: kind.label(),
                    project: ctx.project.clone(),
                })
            }
        };
        Ok((node, fields))
    }

    /// Contributors are only linked, never created: each is a name to
    /// resolve against the users already in the graph.
    fn project_contributors(&self, ctx: &ProjectContext<'_>, report: &mut ProjectionReport) {
        let Some(contributors) = ctx.record.embedded("contributors") else {
            info!(project = %ctx.project, category = "contributors", "no elements for category");
            return;
        };
        for contributor in contributors.iter() {
            let name = match contributor {
                Value::Object(map) => map.get("name"),
                other => Some(other),
            };
            match name.and_then(Value::as_str) {
                Some(name) => {
                    let reference = EntityRef::with_name(name);
                    match self.resolve(&reference, EntityKind::User) {
                        Ok(Some(user)) => self.relate(&user, CONTRIBUTES_TO, &ctx.node, report),
                        Ok(None) => {
                            debug!(project = %ctx.project, contributor = name, "contributor not resolved");
                            report.unresolved_references += 1;
                        }
                        Err(e) => {
                            warn!(project = %ctx.project, error = %e, "contributor lookup failed");
                            report.skipped_entities += 1;
                        }
                    }
                }
                None => {
                    warn!(project = %ctx.project, "contributor without a name");
                    report.skipped_entities += 1;
                }
            }
        }
    }

    /// Language nodes are keyed by name; the percentage lives on the edge
    fn project_languages(&self, ctx: &ProjectContext<'_>, report: &mut ProjectionReport) {
        let Some(languages) = ctx.record.languages() else {
            info!(project = %ctx.project, category = "languages", "no elements for category");
            return;
        };
        for (name, percentage) in languages {
            let key = PropertyValue::from(name.as_str());
            let node = match self
                .store
                .merge_node(EntityKind::Language.label(), "name", &key, Properties::new())
            {
                Ok(node) => node,
                Err(e) => {
                    warn!(project = %ctx.project, language = %name, error = %e, "language could not be projected");
                    report.skipped_entities += 1;
                    continue;
                }
            };
            report.nodes += 1;

            let mut weight = Properties::new();
            if let Some(value) = PropertyValue::from_json(percentage) {
                weight.insert("value".to_string(), value);
            }
            self.relate_with(&node, IS_CONTAINED_IN, &ctx.node, weight, report);
        }
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    fn relate(&self, from: &Node, relationship: &str, to: &Node, report: &mut ProjectionReport) {
        self.relate_with(from, relationship, to, Properties::new(), report);
    }

    fn relate_with(
        &self,
        from: &Node,
        relationship: &str,
        to: &Node,
        properties: Properties,
        report: &mut ProjectionReport,
    ) {
        match self.store.set_relationship(&from.id, relationship, &to.id, properties) {
            Ok(_) => report.relationships += 1,
            Err(e) => {
                warn!(
                    from = %from.label,
                    to = %to.label,
                    relationship,
                    error = %e,
                    "relationship could not be set"
                );
                report.skipped_entities += 1;
            }
        }
    }

    /// Link `from` to every entity a reference field points at. Targets
    /// must already be in the graph; unresolved ones are skipped.
    fn relate_references(
        &self,
        ctx: &ProjectContext<'_>,
        from: &Node,
        value: Option<&Value>,
        relationship: &str,
        target: EntityKind,
        report: &mut ProjectionReport,
    ) {
        let Some(value) = value else {
            return;
        };
        let references = match decode_references(value, target) {
            Ok(references) => references,
            Err(e) => {
                warn!(project = %ctx.project, relationship, error = %e, "skipping reference");
                report.skipped_entities += 1;
                return;
            }
        };

        for reference in references {
            match self.resolve(&reference, target) {
                Ok(Some(node)) => self.relate(from, relationship, &node, report),
                Ok(None) => {
                    debug!(project = %ctx.project, relationship, reference = ?reference, "reference not resolved");
                    report.unresolved_references += 1;
                }
                Err(e) => {
                    warn!(project = %ctx.project, relationship, error = %e, "reference lookup failed");
                    report.skipped_entities += 1;
                }
            }
        }
    }

    /// Find the node a reference points at.
    ///
    /// Ids and usernames are primary keys, so they are looked up by the
    /// derived node ID. A user merged by id is then found by its
    /// `username` property, and a bare name goes through the resolver.
    fn resolve(&self, reference: &EntityRef, target: EntityKind) -> StorageResult<Option<Node>> {
        let label = target.label();

        if let Some(id) = reference.id.as_ref().and_then(PropertyValue::from_json) {
            if let Some(node) = self.store.get_keyed(label, "id", &id)? {
                return Ok(Some(node));
            }
        }
        if target != EntityKind::User {
            return Ok(None);
        }
        if let Some(ref username) = reference.username {
            let username = PropertyValue::from(username.as_str());
            if let Some(node) = self.store.get_keyed(label, "username", &username)? {
                return Ok(Some(node));
            }
            if let Some(node) = self
                .store
                .get_node(&NodeFilter::by_property(label, "username", username))?
            {
                return Ok(Some(node));
            }
        }
        match reference.name {
            Some(ref name) => self.resolver.resolve(self.store, name),
            None => Ok(None),
        }
    }
}

/// A file's `id` is the hash of its content, shared by every identical
/// file; its identity is the path within the project.
fn add_file_location(fields: &mut Map<String, Value>, project: &str) {
    if let Some(path) = fields.get("path").and_then(Value::as_str) {
        let location = format!("{}:{}", project, path);
        fields.insert(FILE_LOCATION.to_string(), Value::String(location));
    }
}

/// The fields of an embedded element: a nested object, or one encoded
/// as a JSON string
fn element_fields(element: &Value) -> ProjectionResult<Map<String, Value>> {
    match element {
        Value::Object(map) => Ok(map.clone()),
        Value::String(s) if s.trim_start().starts_with('{') => match serde_json::from_str(s) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ProjectionError::MalformedReference(other.to_string())),
            Err(e) => Err(ProjectionError::MalformedReference(format!("{}: {}", s, e))),
        },
        other => Err(ProjectionError::MalformedReference(format!(
            "expected a nested record, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn corpus(projects: Value) -> Corpus {
        serde_json::from_value(json!({ "Projects": projects })).unwrap()
    }

    fn edges_named(store: &MemoryStore, relationship: &str) -> usize {
        store
            .edges()
            .unwrap()
            .iter()
            .filter(|e| e.relationship == relationship)
            .count()
    }

    #[test]
    fn project_without_id_is_skipped() {
        let store = MemoryStore::new();
        let report = GraphProjector::new(&store).project(&corpus(json!([
            {"name": "no id", "namespace": {"id": 1}},
            {"id": 2}
        ])));

        assert_eq!(report.projects, 1);
        assert_eq!(report.skipped_projects, 1);
        // Nothing of the skipped record was written
        assert_eq!(store.node_count().unwrap(), 1);
    }

    #[test]
    fn embedded_fields_are_not_project_properties() {
        let store = MemoryStore::new();
        GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "name": "alpha",
            "issue_statistics": {"counts": {"all": 0}},
            "commits": [{"id": "abc"}]
        }])));

        let project = store
            .get_node(&NodeFilter::by_property("Project", "id", PropertyValue::Int(1)))
            .unwrap()
            .unwrap();
        assert!(project.property("commits").is_none());
        assert!(matches!(project.property("issue_statistics"), Some(PropertyValue::Object(_))));
    }

    #[test]
    fn anonymous_namespace_is_created_but_anonymous_list_elements_are_skipped() {
        let store = MemoryStore::new();
        let report = GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "namespace": {"name": "group"},
            "commits": [{"id": "abc"}, {"title": "no id"}]
        }])));

        assert_eq!(store.find_nodes(&NodeFilter::new().with_label("Namespace")).unwrap().len(), 1);
        assert_eq!(store.find_nodes(&NodeFilter::new().with_label("Commit")).unwrap().len(), 1);
        assert_eq!(report.skipped_entities, 1);
    }

    #[test]
    fn owner_owns_project() {
        let store = MemoryStore::new();
        GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "owner": {"id": 9, "name": "Doe, Jane"}
        }])));
        assert_eq!(edges_named(&store, OWNS), 1);
    }

    #[test]
    fn languages_carry_percentage() {
        let store = MemoryStore::new();
        GraphProjector::new(&store).project(&corpus(json!([
            {"id": 1, "languages": {"Python": 50.0, "C": 50.0}},
            {"id": 2, "languages": {"C": 100.0}}
        ])));

        let languages = store.find_nodes(&NodeFilter::new().with_label("Language")).unwrap();
        assert_eq!(languages.len(), 2);

        let c = NodeFilter::by_property("Language", "name", "C".into());
        let c = store.get_node(&c).unwrap().unwrap();
        let edges = store.edges_from(&c.id).unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges
            .iter()
            .all(|e| e.relationship == IS_CONTAINED_IN && e.properties.contains_key("value")));
    }

    #[test]
    fn committer_resolved_by_display_name() {
        let store = MemoryStore::new();
        let report = GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "users": [{"id": 5, "name": "Doe, Jane", "username": "jdoe"}],
            "commits": [
                {"id": "abc", "committer_name": "Jane Doe"},
                {"id": "def", "committer_name": "Nobody Known"}
            ]
        }])));

        assert_eq!(edges_named(&store, COMMITTED_BY), 1);
        assert_eq!(report.unresolved_references, 1);
    }

    #[test]
    fn contributors_only_link_existing_users() {
        let store = MemoryStore::new();
        let report = GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "users": [{"id": 5, "name": "Jane Doe"}],
            "contributors": [{"name": "Jane Doe"}, {"name": "Ghost"}]
        }])));

        assert_eq!(edges_named(&store, CONTRIBUTES_TO), 1);
        assert_eq!(report.unresolved_references, 1);
        assert_eq!(store.find_nodes(&NodeFilter::new().with_label("User")).unwrap().len(), 1);
    }

    #[test]
    fn issue_links_author_assignees_and_milestone() {
        let store = MemoryStore::new();
        GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "users": [{"id": 5, "name": "Jane Doe"}, {"id": 6, "name": "Roe, Richard"}],
            "milestones": [{"id": 30, "title": "v1"}],
            "issues": [{
                "id": 100,
                "author": {"id": 5, "name": "Jane Doe"},
                "assignees": "[{\"name\": \"Richard Roe\"}]",
                "milestone": {"id": 30}
            }]
        }])));

        let issue = store
            .get_node(&NodeFilter::by_property("Issue", "id", PropertyValue::Int(100)))
            .unwrap()
            .unwrap();
        let mut rels: Vec<_> = store
            .edges_from(&issue.id)
            .unwrap()
            .into_iter()
            .map(|e| e.relationship)
            .collect();
        rels.sort();
        assert_eq!(rels, [ASSIGNED_TO, AUTHORED_BY, BELONGS_TO, BELONGS_TO]);
    }

    #[test]
    fn merge_request_links_commits_and_closed_issues() {
        let store = MemoryStore::new();
        GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "users": [{"id": 5, "name": "Jane Doe"}],
            "commits": [{"id": "abc"}],
            "issues": [{"id": 100}],
            "mergerequests": [{
                "id": 200,
                "author": {"id": 5},
                "merged_by": {"id": 5},
                "commits": [{"id": "abc"}, {"id": "missing"}],
                "close_issues": [{"id": 100}]
            }]
        }])));

        assert_eq!(edges_named(&store, HAS_COMMIT), 1);
        assert_eq!(edges_named(&store, CLOSES), 1);
        assert_eq!(edges_named(&store, MERGED_BY), 1);
    }

    #[test]
    fn malformed_reference_does_not_stop_the_record() {
        let store = MemoryStore::new();
        let report = GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "milestones": [{"id": 30}],
            "issues": [{"id": 100, "milestone": "{broken"}],
            "releases": [{"tag_name": "v1.0", "milestones": [{"id": 30}]}]
        }])));

        assert_eq!(report.projects, 1);
        assert_eq!(report.skipped_entities, 1);
        let release = store
            .get_node(&NodeFilter::by_property("Release", "tag_name", "v1.0".into()))
            .unwrap();
        assert!(release.is_some());
    }

    #[test]
    fn user_references_resolve_by_username() {
        let store = MemoryStore::new();
        let report = GraphProjector::new(&store).project(&corpus(json!([{
            "id": 1,
            "users": [
                {"id": 5, "name": "Doe, Jane", "username": "jdoe"},
                {"username": "rroe"}
            ],
            "mergerequests": [{
                "id": 200,
                "author": {"username": "jdoe"},
                "merged_by": {"username": "rroe"},
                "closed_by": {"id": 77, "username": "ghost"}
            }]
        }])));

        assert_eq!(edges_named(&store, AUTHORED_BY), 1);
        assert_eq!(edges_named(&store, MERGED_BY), 1);
        assert_eq!(edges_named(&store, CLOSED_BY), 0);
        assert_eq!(report.unresolved_references, 1);
    }

    struct NeverResolves;

    impl NameResolver for NeverResolves {
        fn resolve(&self, _store: &dyn GraphStore, _name: &str) -> StorageResult<Option<Node>> {
            Ok(None)
        }
    }

    #[test]
    fn resolver_is_pluggable() {
        let store = MemoryStore::new();
        let report = GraphProjector::new(&store)
            .with_resolver(NeverResolves)
            .project(&corpus(json!([{
                "id": 1,
                "users": [{"id": 5, "name": "Jane Doe"}],
                "commits": [{"id": "abc", "committer_name": "Jane Doe"}]
            }])));

        assert_eq!(edges_named(&store, COMMITTED_BY), 0);
        assert_eq!(report.unresolved_references, 1);
    }
}
