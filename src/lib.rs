//! Corpus: repository metadata pipeline
//!
//! Harvested project records flow through three stages:
//!
//! - **Corpus**: the in-memory document, category name to ordered records
//! - **Filter**: declarative conditions and language-percentage rules decide
//!   which projects survive and which fields they keep
//! - **Projection**: surviving records become typed nodes and deduplicated
//!   relationships in a property graph, or a flat JSON/listing export
//!
//! # Example
//!
//! ```
//! use corpus::{Corpus, CorpusFilter, FilterSpec, GraphProjector, MemoryStore};
//!
//! let corpus = Corpus::from_json_str(
//!     r#"{"Projects": [{"id": 1, "languages": {"Rust": 100.0}}]}"#,
//! ).unwrap();
//! let spec = FilterSpec::from_yaml_str("filters:\n  any_languages:\n    Rust: \">=//50\"\n").unwrap();
//! let filtered = CorpusFilter::new(spec).apply(corpus);
//!
//! let store = MemoryStore::new();
//! let report = GraphProjector::new(&store).project(&filtered);
//! assert_eq!(report.projects, 1);
//! ```

pub mod config;
pub mod corpus;
pub mod export;
pub mod filter;
mod graph;
pub mod projection;
pub mod storage;

pub use config::{ConfigError, Settings};
pub use corpus::{Corpus, CorpusError, CorpusResult, EntityKind, ProjectSource, Record};
pub use export::{ExportError, Format};
pub use filter::{CorpusFilter, FilterError, FilterSpec};
pub use graph::{Edge, EdgeId, Node, NodeId, NodeMetadata, Properties, PropertyValue};
pub use projection::{GraphProjector, ProjectionError, ProjectionReport};
pub use storage::{GraphStore, MemoryStore, NodeFilter, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
