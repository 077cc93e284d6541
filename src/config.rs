//! Settings for the `corpus` command

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a settings file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Pipeline settings. Every field is optional in the file; command-line
/// flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Filter file used by `filter`
    pub filter_file: PathBuf,
    /// Corpus read by `filter` and `export`
    pub input_file: PathBuf,
    /// Where `filter` and flat exports are written
    pub output_file: PathBuf,
    /// SQLite database the graph export writes to
    pub graph_db: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filter_file: PathBuf::from("resources/filters.yaml"),
            input_file: PathBuf::from("out/corpus.json"),
            output_file: PathBuf::from("out/corpus.json"),
            graph_db: default_graph_db(),
        }
    }
}

/// `<data dir>/corpus/graph.db`, e.g. ~/.local/share/corpus/graph.db
pub fn default_graph_db() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("corpus").join("graph.db")
}

impl Settings {
    /// Load settings from a YAML file. No path, or a path that does not
    /// exist, yields the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::info!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
