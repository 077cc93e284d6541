//! Graph projection engine
//!
//! Turns denormalized project records into typed nodes and directed,
//! deduplicated relationships in a `GraphStore`. User references that
//! carry no stable id are joined to existing User nodes by name.

mod engine;
mod reference;
mod resolver;

pub use engine::{GraphProjector, ProjectionReport};
pub use reference::{decode_references, EntityRef};
pub use resolver::{surname_first, DisplayNameResolver, NameResolver};

use crate::storage::StorageError;
use thiserror::Error;

/// Per-entity projection failures. None of these abort a run.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("{label} without primary key in project {project}")]
    MissingPrimaryKey { label: &'static str, project: String },

    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;
