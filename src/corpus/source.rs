//! Extraction adapter seam

use super::{CorpusResult, Record};

/// Something that yields project records from the upstream platform.
///
/// Implementations own the API client, authentication and retries.
/// Excluding private projects is the source's job, not the corpus's.
pub trait ProjectSource {
    /// Fetch every project record, embedded sub-categories included
    fn fetch_projects(&mut self) -> CorpusResult<Vec<Record>>;
}

/// A source backed by records already in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<Record>,
}

impl StaticSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl ProjectSource for StaticSource {
    fn fetch_projects(&mut self) -> CorpusResult<Vec<Record>> {
        Ok(std::mem::take(&mut self.records))
    }
}
