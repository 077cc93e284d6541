//! Applying a filter spec to a corpus

use super::{FilterSpec, LanguageMatch, Rule};
use crate::corpus::{Corpus, Record, PROJECTS};
use serde_json::Map;
use tracing::info;

/// Evaluates a `FilterSpec` against project records.
///
/// A record passes when every declared rule holds. Evaluation is pure:
/// the same record and spec always give the same answer.
#[derive(Debug, Clone, Default)]
pub struct CorpusFilter {
    spec: FilterSpec,
}

impl CorpusFilter {
    pub fn new(spec: FilterSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// True if the record satisfies every declared rule
    pub fn matches(&self, record: &Record) -> bool {
        self.spec.rules.iter().all(|rule| self.check_rule(rule, record))
    }

    fn check_rule(&self, rule: &Rule, record: &Record) -> bool {
        match rule {
            Rule::Attribute { field, condition } => {
                record.get(field).is_some_and(|value| condition.evaluate(value))
            }
            Rule::Languages(filter) => match record.languages() {
                Some(languages) => filter.evaluate(languages),
                None => filter.evaluate(&Map::new()),
            },
            Rule::UnknownLanguages(_) => false,
        }
    }

    /// Evaluate one language category against a record.
    ///
    /// A recognized category that is not declared holds; an unrecognized
    /// category name never does.
    pub fn check_languages(&self, category: &str, record: &Record) -> bool {
        let Some(kind) = LanguageMatch::from_category(category) else {
            return false;
        };
        self.spec
            .rules
            .iter()
            .find(|rule| match rule {
                Rule::Languages(filter) => filter.kind() == kind,
                Rule::UnknownLanguages(name) => LanguageMatch::from_category(name) == Some(kind),
                Rule::Attribute { .. } => false,
            })
            .map_or(true, |rule| self.check_rule(rule, record))
    }

    /// Filter the project records and project them to the allowed fields.
    ///
    /// With no rules and no attributes the corpus is returned as is. Other
    /// categories pass through untouched.
    pub fn apply(&self, corpus: Corpus) -> Corpus {
        if self.spec.is_empty() {
            return corpus;
        }

        let before = corpus.projects().len();
        let filtered = corpus.map_categories(|category, records| {
            if category != PROJECTS {
                return records;
            }
            records
                .into_iter()
                .filter(|record| self.matches(record))
                .map(|mut record| {
                    if !self.spec.attributes.is_empty() {
                        record.retain_fields(&self.spec.attributes);
                    }
                    record
                })
                .collect()
        });

        info!(
            kept = filtered.projects().len(),
            dropped = before - filtered.projects().len(),
            "filtered projects"
        );
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    fn filter(yaml: &str) -> CorpusFilter {
        CorpusFilter::new(FilterSpec::from_yaml_str(yaml).unwrap())
    }

    fn test_project() -> Record {
        record(json!({
            "id": 123,
            "languages": {"Python": 50.0, "C": 30.0, "TeX": 10.0, "Assembly": 10.0}
        }))
    }

    fn sample_corpus() -> Corpus {
        Corpus::with_projects(vec![record(json!({
            "id": 1,
            "description": "test description",
            "name": "Test Project",
            "default_branch": "master",
            "archived": false,
            "visibility": "internal",
            "languages": {"Python": 80.0, "HTML": 20.0}
        }))])
    }

    #[test]
    fn any_languages_passes_project() {
        let f = filter("filters:\n  any_languages:\n    C: \"<=//100.0\"\n    Python: \"<=//100.0\"\n");
        assert!(f.matches(&test_project()));
    }

    #[test]
    fn attribute_equality_passes_project() {
        let f = filter("filters:\n  id:\n    operator: \"==\"\n    value: 123\n");
        assert!(f.matches(&test_project()));
    }

    #[test]
    fn missing_language_rejects_project() {
        let f = filter("filters:\n  any_languages:\n    Ada: \"<=//100.0\"\n");
        assert!(!f.matches(&test_project()));
    }

    #[test]
    fn all_categories_must_hold() {
        let f = filter(
            "filters:\n  any_languages:\n    C: \"<=//100.0\"\n  id:\n    operator: \"==\"\n    value: 999\n",
        );
        assert!(!f.matches(&test_project()));
    }

    #[test]
    fn missing_attribute_field_rejects() {
        let f = filter("filters:\n  star_count:\n    operator: \">\"\n    value: 1\n");
        assert!(!f.matches(&test_project()));
    }

    #[test]
    fn check_languages_by_category() {
        let f = filter("filters:\n  atleast_languages:\n    C: \"<=//100.0\"\n    Python: \"<=//100.0\"\n");
        assert!(f.check_languages("atleast_languages", &test_project()));
        // Declared nowhere, so no constraint
        assert!(f.check_languages("exact_languages", &test_project()));
        assert!(!f.check_languages("bogus_languages", &test_project()));
    }

    #[test]
    fn malformed_language_category_rejects() {
        let f = filter("filters:\n  atleast_languages: 5\n");
        assert!(!f.matches(&test_project()));
        assert!(!f.check_languages("atleast_languages", &test_project()));
    }

    #[test]
    fn unknown_operator_fails_only_its_language() {
        let f = filter("filters:\n  any_languages:\n    Python: \".//100\"\n    C: \">//20\"\n");
        assert!(f.matches(&test_project()));
        let f = filter("filters:\n  atleast_languages:\n    Python: \".//100\"\n    C: \">//20\"\n");
        assert!(!f.matches(&test_project()));
    }

    #[test]
    fn unknown_language_category_rejects() {
        let f = filter("filters:\n  some_languages:\n    C: \"<=//100.0\"\n");
        assert!(!f.matches(&test_project()));
    }

    #[test]
    fn record_without_languages_has_empty_set() {
        let f = filter("filters:\n  atmost_languages:\n    C: \"<=//100.0\"\n");
        assert!(!f.matches(&record(json!({"id": 1}))));
        let f = filter("filters:\n  any_languages:\n");
        assert!(f.matches(&record(json!({"id": 1}))));
    }

    #[test]
    fn filter_keeps_all_fields_without_attributes() {
        let corpus = sample_corpus();
        let filtered = filter("filters:\n  id:\n    operator: \"<\"\n    value: 100.0\nattributes:\n").apply(corpus.clone());
        assert_eq!(filtered, corpus);
    }

    #[test]
    fn attributes_alone_project_fields() {
        let filtered = filter("filters:\nattributes:\n  - id\n").apply(sample_corpus());
        assert_eq!(serde_json::to_value(&filtered).unwrap(), json!({"Projects": [{"id": 1}]}));
    }

    #[test]
    fn filters_and_attributes_together() {
        let f = filter("filters:\n  id:\n    operator: \"<\"\n    value: 100.0\nattributes:\n  - id\n");
        let filtered = f.apply(sample_corpus());
        assert_eq!(serde_json::to_value(&filtered).unwrap(), json!({"Projects": [{"id": 1}]}));
    }

    #[test]
    fn rejected_projects_are_dropped() {
        let f = filter("filters:\n  visibility: public\n");
        let filtered = f.apply(sample_corpus());
        assert!(filtered.projects().is_empty());
        assert!(filtered.category(PROJECTS).is_some());
    }

    #[test]
    fn no_filters_passes_through() {
        let corpus = sample_corpus();
        assert_eq!(filter("filters:\nattributes:\n").apply(corpus.clone()), corpus);
    }
}
