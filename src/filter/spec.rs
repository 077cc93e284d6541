//! Filter files: which records survive and which fields they keep
//!
//! ```yaml
//! filters:
//!   atleast_languages:
//!     Python: {operator: ">=", value: 20.0}
//!   visibility: public
//!   star_count: {operator: ">", value: 10}
//! attributes:
//!   - id
//!   - name
//! ```

use super::{Condition, FilterError, FilterResult, LanguageFilter, LanguageMatch};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// One declared filter category
#[derive(Debug, Clone)]
pub enum Rule {
    /// Condition on a top-level record field
    Attribute { field: String, condition: Condition },
    /// Language-percentage category
    Languages(LanguageFilter),
    /// A `*_languages` category with no known meaning, or whose entries
    /// are not a mapping; never satisfied
    UnknownLanguages(String),
}

impl Rule {
    /// The category name this rule was declared under
    pub fn category(&self) -> &str {
        match self {
            Rule::Attribute { field, .. } => field,
            Rule::Languages(filter) => filter.kind().category(),
            Rule::UnknownLanguages(name) => name,
        }
    }
}

/// A parsed filter file
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub rules: Vec<Rule>,
    /// Fields kept in surviving records; empty keeps all
    pub attributes: Vec<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a rule. A later rule for the same category replaces the
    /// earlier one.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        match self.rules.iter_mut().find(|r| r.category() == rule.category()) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// True if nothing is filtered and nothing projected
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.attributes.is_empty()
    }

    /// Load a filter file. A missing file is not an error: it yields an
    /// empty spec, so every record passes unchanged.
    pub fn load(path: impl AsRef<Path>) -> FilterResult<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "No filter configuration file found. No filters will be applied."
                );
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        let spec = Self::from_yaml_str(&text)?;
        debug!(
            path = %path.display(),
            rules = spec.rules.len(),
            attributes = spec.attributes.len(),
            "loaded filter file"
        );
        Ok(spec)
    }

    pub fn from_yaml_str(yaml: &str) -> FilterResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }
        let document: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(&document)
    }

    /// Interpret an already-parsed document
    pub fn from_value(document: &Value) -> FilterResult<Self> {
        let root = match document {
            Value::Null => return Ok(Self::new()),
            Value::Object(root) => root,
            other => {
                return Err(FilterError::InvalidSpec(format!(
                    "expected a mapping at the top level, got {}",
                    other
                )))
            }
        };

        let mut spec = Self::new();
        for (name, value) in entries("filters", root.get("filters"))? {
            spec = spec.with_rule(interpret_rule(name, value));
        }
        spec.attributes = interpret_attributes(root.get("attributes"))?;
        Ok(spec)
    }
}

// ---------------------------------------------------------------------------
// Interpretation
// ---------------------------------------------------------------------------

/// Flatten a mapping, or a sequence of single-key mappings, into entries
fn entries<'a>(section: &str, value: Option<&'a Value>) -> FilterResult<Vec<(&'a str, &'a Value)>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(object_entries(map)),
        Some(Value::Array(items)) => {
            let mut flattened = Vec::new();
            for item in items {
                match item {
                    Value::Object(map) => flattened.extend(object_entries(map)),
                    other => {
                        return Err(FilterError::InvalidSpec(format!(
                            "{}: expected a mapping entry, got {}",
                            section, other
                        )))
                    }
                }
            }
            Ok(flattened)
        }
        Some(other) => Err(FilterError::InvalidSpec(format!(
            "{}: expected a mapping, got {}",
            section, other
        ))),
    }
}

fn object_entries(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    map.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

/// Interpret one `filters` entry. Unusable entries become rules that
/// never hold instead of failing the whole file.
fn interpret_rule(name: &str, value: &Value) -> Rule {
    if let Some(kind) = LanguageMatch::from_category(name) {
        let languages = match entries(name, Some(value)) {
            Ok(languages) => languages,
            Err(e) => {
                warn!(category = name, error = %e, "language category will never be satisfied");
                return Rule::UnknownLanguages(name.to_string());
            }
        };
        let filter = languages
            .into_iter()
            .fold(LanguageFilter::new(kind), |filter, (language, condition)| {
                filter.with_language(language, Condition::from_value(condition))
            });
        return Rule::Languages(filter);
    }

    if name.ends_with("_languages") {
        warn!(category = name, "unrecognized language category will never be satisfied");
        return Rule::UnknownLanguages(name.to_string());
    }

    Rule::Attribute {
        field: name.to_string(),
        condition: Condition::from_value(value),
    }
}

fn interpret_attributes(value: Option<&Value>) -> FilterResult<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(field)) => Ok(vec![field.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(field) => Ok(field.clone()),
                other => Err(FilterError::InvalidSpec(format!(
                    "attributes: expected a field name, got {}",
                    other
                ))),
            })
            .collect(),
        Some(other) => Err(FilterError::InvalidSpec(format!(
            "attributes: expected a list of field names, got {}",
            other
        ))),
    }
}
