//! Event sources: where raw columns come from.

use std::collections::HashMap;

use rx_core::{Error, Result};
use rx_frame::ColumnSet;

/// Supplies the raw columns of a list of files.
///
/// Implementations concatenate the files of one sample entry-wise, in the
/// order given.
pub trait EventSource: Send + Sync {
    /// Load and concatenate `files`.
    fn load(&self, files: &[String]) -> Result<ColumnSet>;
}

/// Event source backed by column sets held in memory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    files: HashMap<String, ColumnSet>,
}

impl InMemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a file.
    pub fn insert(&mut self, file: impl Into<String>, columns: ColumnSet) {
        self.files.insert(file.into(), columns);
    }

    /// Builder-style [`InMemorySource::insert`].
    pub fn with_file(mut self, file: impl Into<String>, columns: ColumnSet) -> Self {
        self.insert(file, columns);
        self
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file is registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl EventSource for InMemorySource {
    fn load(&self, files: &[String]) -> Result<ColumnSet> {
        let sets = files
            .iter()
            .map(|f| {
                self.files.get(f).cloned().ok_or_else(|| Error::Source(format!("unknown file '{f}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        ColumnSet::concat(&sets)
            .map_err(|e| Error::Schema(format!("cannot concatenate {}: {e}", files.join(", "))))
    }
}
