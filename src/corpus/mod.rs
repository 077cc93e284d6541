//! The corpus: the in-memory document passed between pipeline stages
//!
//! A corpus maps category names to ordered record lists. The `"Projects"`
//! category always exists. Each run builds its own corpus and hands it
//! from stage to stage by value.

mod entity;
mod record;
mod source;

pub use entity::EntityKind;
pub use record::{Embedded, Record};
pub use source::{ProjectSource, StaticSource};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Name of the category holding project records
pub const PROJECTS: &str = "Projects";

/// Errors loading or populating a corpus
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Malformed corpus document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction failed: {0}")]
    Source(String),
}

pub type CorpusResult<T> = Result<T, CorpusError>;

/// Ordered mapping from category name to records
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    categories: Vec<(String, Vec<Record>)>,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

impl Corpus {
    /// An empty corpus with an empty `"Projects"` category
    pub fn new() -> Self {
        Self {
            categories: vec![(PROJECTS.to_string(), Vec::new())],
        }
    }

    /// Build a corpus holding the given project records
    pub fn with_projects(projects: Vec<Record>) -> Self {
        Self {
            categories: vec![(PROJECTS.to_string(), projects)],
        }
    }

    pub fn projects(&self) -> &[Record] {
        self.category(PROJECTS).unwrap_or(&[])
    }

    pub fn category(&self, name: &str) -> Option<&[Record]> {
        self.categories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, records)| records.as_slice())
    }

    /// Categories in stored order
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.categories
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    /// Append a record, creating the category at the end if needed
    pub fn push(&mut self, category: &str, record: Record) {
        match self.categories.iter_mut().find(|(n, _)| n == category) {
            Some((_, records)) => records.push(record),
            None => self.categories.push((category.to_string(), vec![record])),
        }
    }

    pub fn push_project(&mut self, record: Record) {
        self.push(PROJECTS, record);
    }

    /// Total records across all categories
    pub fn record_count(&self) -> usize {
        self.categories.iter().map(|(_, records)| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Rebuild every category through `f`, keeping category order
    pub(crate) fn map_categories<F>(self, mut f: F) -> Self
    where
        F: FnMut(&str, Vec<Record>) -> Vec<Record>,
    {
        Self {
            categories: self
                .categories
                .into_iter()
                .map(|(name, records)| {
                    let records = f(&name, records);
                    (name, records)
                })
                .collect(),
        }
    }

    pub fn from_reader(reader: impl Read) -> CorpusResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(json: &str) -> CorpusResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a serialized corpus from disk
    pub fn load(path: impl AsRef<Path>) -> CorpusResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let corpus = Self::from_reader(std::io::BufReader::new(file))?;
        debug!(path = %path.display(), records = corpus.record_count(), "loaded corpus");
        Ok(corpus)
    }

    /// Populate a fresh corpus from an extraction source
    pub fn extract(source: &mut dyn ProjectSource) -> CorpusResult<Self> {
        let projects = source.fetch_projects()?;
        info!(projects = projects.len(), "extracted projects");
        Ok(Self::with_projects(projects))
    }
}

impl Serialize for Corpus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (name, records) in &self.categories {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Corpus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CorpusVisitor;

        impl<'de> Visitor<'de> for CorpusVisitor {
            type Value = Corpus;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a mapping from category name to a list of records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Corpus, A::Error> {
                let mut categories: Vec<(String, Vec<Record>)> = Vec::new();
                while let Some((name, records)) = access.next_entry::<String, Vec<Record>>()? {
                    match categories.iter_mut().find(|(n, _)| *n == name) {
                        Some(existing) => existing.1 = records,
                        None => categories.push((name, records)),
                    }
                }
                if !categories.iter().any(|(n, _)| n == PROJECTS) {
                    categories.insert(0, (PROJECTS.to_string(), Vec::new()));
                }
                Ok(Corpus { categories })
            }
        }

        deserializer.deserialize_map(CorpusVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn new_corpus_has_empty_projects() {
        let corpus = Corpus::new();
        assert!(corpus.category(PROJECTS).is_some());
        assert!(corpus.is_empty());
        assert_eq!(serde_json::to_string(&corpus).unwrap(), r#"{"Projects":[]}"#);
    }

    #[test]
    fn deserialize_adds_missing_projects() {
        let corpus = Corpus::from_json_str(r#"{"Users": [{"id": 1}]}"#).unwrap();
        let names: Vec<_> = corpus.categories().map(|(n, _)| n).collect();
        assert_eq!(names, [PROJECTS, "Users"]);
        assert!(corpus.projects().is_empty());
    }

    #[test]
    fn push_preserves_insertion_order() {
        let mut corpus = Corpus::new();
        for id in [3, 1, 2] {
            corpus.push_project(record(json!({ "id": id })));
        }
        let ids: Vec<_> = corpus.projects().iter().filter_map(|r| r.id()).collect();
        assert_eq!(ids, [&json!(3), &json!(1), &json!(2)]);
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = Corpus::from_json_str(r#"{"Projects": [1, 2"#).unwrap_err();
        assert!(matches!(err, CorpusError::Malformed(_)));

        let err = Corpus::from_json_str(r#"{"Projects": "nope"}"#).unwrap_err();
        assert!(matches!(err, CorpusError::Malformed(_)));
    }

    #[test]
    fn extract_takes_records_from_source() {
        let mut source = StaticSource::new(vec![record(json!({"id": 1})), record(json!({"id": 2}))]);
        let corpus = Corpus::extract(&mut source).unwrap();
        assert_eq!(corpus.projects().len(), 2);
    }
}
