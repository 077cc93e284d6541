//! Filter engine
//!
//! A filter file declares attribute conditions, language-percentage
//! categories and an attribute allow-list. `CorpusFilter` keeps the project
//! records that satisfy every declared category and trims them to the
//! allowed fields.

mod condition;
mod engine;
mod language;
mod spec;

pub use condition::{Condition, Operator};
pub use engine::CorpusFilter;
pub use language::{LanguageFilter, LanguageMatch};
pub use spec::{FilterSpec, Rule};

use thiserror::Error;

/// Errors loading a filter file
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown operator: {0:?}")]
    UnknownOperator(String),

    #[error("Invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Invalid filter file: {0}")]
    InvalidSpec(String),
}

pub type FilterResult<T> = Result<T, FilterError>;
