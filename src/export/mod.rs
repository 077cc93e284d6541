//! Flat export of a corpus

use crate::corpus::Corpus;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors writing an export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output format of a flat export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// The corpus as a pretty-printed JSON document, order preserved
    Json,
    /// One line per record, for inspection
    Listing,
}

/// Write the corpus to `sink` in the given format
pub fn serialize(corpus: &Corpus, mut sink: impl Write, format: Format) -> ExportResult<()> {
    match format {
        Format::Json => {
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut serializer = serde_json::Serializer::with_formatter(&mut sink, formatter);
            corpus.serialize(&mut serializer)?;
            writeln!(sink)?;
        }
        Format::Listing => {
            for (_, records) in corpus.categories() {
                for record in records {
                    writeln!(sink, "{}", record)?;
                }
            }
        }
    }
    sink.flush()?;
    Ok(())
}

/// Write the corpus to a file, creating parent directories
pub fn write_to_path(corpus: &Corpus, path: impl AsRef<Path>, format: Format) -> ExportResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serialize(corpus, std::io::BufWriter::new(file), format)?;
    info!(path = %path.display(), "Output written");
    Ok(())
}
