//! Language-percentage filters

use super::Condition;
use serde_json::{Map, Value};

/// How a record's language set must relate to the filter's language set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageMatch {
    /// At least one filter language is present and satisfied
    Any,
    /// Every filter language is present and satisfied
    AtLeast,
    /// Every record language is a filter language and satisfied
    AtMost,
    /// The name sets are identical and every filter language is satisfied
    Exact,
}

impl LanguageMatch {
    /// Recognize a filter category name. `explicit_languages` is the name
    /// older filter files use for `exact_languages`.
    pub fn from_category(name: &str) -> Option<Self> {
        match name {
            "any_languages" => Some(LanguageMatch::Any),
            "atleast_languages" => Some(LanguageMatch::AtLeast),
            "atmost_languages" => Some(LanguageMatch::AtMost),
            "exact_languages" | "explicit_languages" => Some(LanguageMatch::Exact),
            _ => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            LanguageMatch::Any => "any_languages",
            LanguageMatch::AtLeast => "atleast_languages",
            LanguageMatch::AtMost => "atmost_languages",
            LanguageMatch::Exact => "exact_languages",
        }
    }
}

/// One language category with a percentage condition per language
#[derive(Debug, Clone)]
pub struct LanguageFilter {
    kind: LanguageMatch,
    languages: Vec<(String, Condition)>,
}

impl LanguageFilter {
    pub fn new(kind: LanguageMatch) -> Self {
        Self {
            kind,
            languages: Vec::new(),
        }
    }

    /// Add or replace the condition for a language
    pub fn with_language(mut self, name: impl Into<String>, condition: Condition) -> Self {
        let name = name.into();
        match self.languages.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = condition,
            None => self.languages.push((name, condition)),
        }
        self
    }

    pub fn kind(&self) -> LanguageMatch {
        self.kind
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    fn condition(&self, language: &str) -> Option<&Condition> {
        self.languages
            .iter()
            .find(|(name, _)| name == language)
            .map(|(_, condition)| condition)
    }

    /// Evaluate against a record's language map. An empty filter is
    /// vacuously true.
    pub fn evaluate(&self, record: &Map<String, Value>) -> bool {
        if self.languages.is_empty() {
            return true;
        }

        let satisfied = |name: &str, condition: &Condition| {
            record
                .get(name)
                .and_then(Value::as_f64)
                .is_some_and(|pct| condition.evaluate_percentage(pct))
        };

        match self.kind {
            LanguageMatch::Any => self
                .languages
                .iter()
                .any(|(name, condition)| satisfied(name, condition)),
            LanguageMatch::AtLeast => self
                .languages
                .iter()
                .all(|(name, condition)| satisfied(name, condition)),
            LanguageMatch::AtMost => {
                // Subset check and percentage check in one pass
                !record.is_empty()
                    && record.keys().all(|name| {
                        self.condition(name)
                            .is_some_and(|condition| satisfied(name, condition))
                    })
            }
            LanguageMatch::Exact => {
                record.len() == self.languages.len()
                    && record.keys().all(|name| self.condition(name).is_some())
                    && self
                        .languages
                        .iter()
                        .all(|(name, condition)| satisfied(name, condition))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upto_100() -> Condition {
        Condition::from_value(&json!({"operator": "<=", "value": 100.0}))
    }

    fn filter(kind: LanguageMatch, names: &[&str]) -> LanguageFilter {
        names
            .iter()
            .fold(LanguageFilter::new(kind), |f, name| f.with_language(*name, upto_100()))
    }

    fn languages(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn test_project() -> Map<String, Value> {
        languages(json!({"Python": 50.0, "C": 30.0, "TeX": 10.0, "Assembly": 10.0}))
    }

    #[test]
    fn explicit_is_an_alias_for_exact() {
        assert_eq!(LanguageMatch::from_category("explicit_languages"), Some(LanguageMatch::Exact));
        assert_eq!(LanguageMatch::from_category("some_languages"), None);
    }

    #[test]
    fn atleast() {
        assert!(filter(LanguageMatch::AtLeast, &["C", "Python"]).evaluate(&test_project()));
        assert!(!filter(LanguageMatch::AtLeast, &["C", "Python", "ActionScript"]).evaluate(&test_project()));
    }

    #[test]
    fn atmost() {
        assert!(filter(LanguageMatch::AtMost, &["C", "Python", "TeX", "Assembly"]).evaluate(&test_project()));
        assert!(!filter(LanguageMatch::AtMost, &["C", "Python"]).evaluate(&test_project()));
        // No languages at all never passes
        assert!(!filter(LanguageMatch::AtMost, &["C"]).evaluate(&Map::new()));
    }

    #[test]
    fn any() {
        assert!(filter(LanguageMatch::Any, &["C", "Python"]).evaluate(&test_project()));
        assert!(!filter(LanguageMatch::Any, &["CMake"]).evaluate(&test_project()));
    }

    #[test]
    fn exact() {
        assert!(filter(LanguageMatch::Exact, &["C", "Python", "TeX", "Assembly"]).evaluate(&test_project()));
        assert!(!filter(LanguageMatch::Exact, &["C", "Python"]).evaluate(&test_project()));
    }

    #[test]
    fn exact_rejects_on_size_regardless_of_percentages() {
        let record = languages(json!({"Python": 50, "C": 50}));
        assert!(filter(LanguageMatch::AtLeast, &["C"]).evaluate(&record));
        assert!(!filter(LanguageMatch::Exact, &["C"]).evaluate(&record));
    }

    #[test]
    fn percentages_are_checked() {
        let record = languages(json!({"Python": 70.0, "C": 20.0, "C++": 10.0}));
        let compact = |expr: &str| Condition::from_value(&json!(expr));

        let passing = LanguageFilter::new(LanguageMatch::AtMost)
            .with_language("Python", compact("<=//80.0"))
            .with_language("C", compact(">//15.0"))
            .with_language("C++", compact("==//10.0"));
        assert!(passing.evaluate(&record));

        let failing = LanguageFilter::new(LanguageMatch::AtMost)
            .with_language("Python", compact("<=//80.0"))
            .with_language("C", compact("==//15.0"))
            .with_language("C++", compact("==//10.0"));
        assert!(!failing.evaluate(&record));
    }

    #[test]
    fn non_numeric_percentage_fails_the_condition() {
        let record = languages(json!({"C": "lots"}));
        assert!(!filter(LanguageMatch::AtLeast, &["C"]).evaluate(&record));
    }

    #[test]
    fn empty_filter_is_vacuously_true() {
        for kind in [LanguageMatch::Any, LanguageMatch::AtLeast, LanguageMatch::AtMost, LanguageMatch::Exact] {
            assert!(LanguageFilter::new(kind).evaluate(&test_project()));
            assert!(LanguageFilter::new(kind).evaluate(&Map::new()));
        }
    }
}
