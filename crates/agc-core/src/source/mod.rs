use std::ops::Range;

use indexmap::IndexMap;

use crate::{
    compare::Value,
    data::{to_columns, EventBatch},
    AgcError, AgcResult,
};

mod io;
pub use io::{write_parquet, ParquetSource, WriteOptions};

/// A store of named, event-aligned columns that can be read in entry ranges.
///
/// Entries are grouped into clusters (the storage unit of the underlying layout); the start of
/// every cluster is reported by [`ColumnarSource::cluster_boundaries`]. Reads past the last entry
/// are truncated to the available entries.
pub trait ColumnarSource: Send + Sync {
    /// Names of all columns, in storage order.
    fn list_fields(&self) -> Vec<String>;

    /// The entry at which each cluster starts, ascending and beginning with `0` for any
    /// non-empty source.
    fn cluster_boundaries(&self) -> Vec<usize>;

    /// Total number of entries.
    fn num_entries(&self) -> usize;

    /// Read the entries `[entry_start, entry_stop)` of each of `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`AgcError::MissingColumn`] for an unknown field and [`AgcError::InvalidRange`]
    /// if `entry_start > entry_stop`.
    fn read(
        &self,
        fields: &[&str],
        entry_start: usize,
        entry_stop: usize,
    ) -> AgcResult<IndexMap<String, Vec<Value>>>;

    fn has_field(&self, field: &str) -> bool {
        self.list_fields().iter().any(|name| name == field)
    }
}

/// Clamp a requested entry range to a source with `entries` entries.
pub(crate) fn clamp_range(
    entry_start: usize,
    entry_stop: usize,
    entries: usize,
) -> AgcResult<Range<usize>> {
    if entry_start > entry_stop {
        return Err(AgcError::InvalidRange {
            start: entry_start,
            stop: entry_stop,
            entries,
        });
    }
    let stop = entry_stop.min(entries);
    Ok(entry_start.min(stop)..stop)
}

/// Cluster starts for clusters of `cluster_size` entries.
pub fn uniform_cluster_boundaries(entries: usize, cluster_size: usize) -> Vec<usize> {
    (0..entries).step_by(cluster_size.max(1)).collect()
}

/// A [`ColumnarSource`] held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    columns: IndexMap<String, Vec<Value>>,
    n_entries: usize,
    boundaries: Vec<usize>,
}

impl InMemorySource {
    /// Wrap a set of columns as a single-cluster source.
    ///
    /// # Errors
    ///
    /// Returns [`AgcError::LengthMismatch`] if the columns do not all have the same number of
    /// entries.
    pub fn new(columns: IndexMap<String, Vec<Value>>) -> AgcResult<Self> {
        let n_entries = columns.values().next().map_or(0, Vec::len);
        if let Some((name, column)) = columns.iter().find(|(_, c)| c.len() != n_entries) {
            return Err(AgcError::LengthMismatch {
                context: format!("Column \"{name}\""),
                expected: n_entries,
                actual: column.len(),
            });
        }
        Ok(Self {
            columns,
            n_entries,
            boundaries: uniform_cluster_boundaries(n_entries, n_entries),
        })
    }

    /// The NanoAOD-style columns of a batch of events.
    pub fn from_batch(batch: &EventBatch) -> Self {
        let columns = to_columns(batch);
        Self {
            columns,
            n_entries: batch.n_events(),
            boundaries: uniform_cluster_boundaries(batch.n_events(), batch.n_events()),
        }
    }

    pub fn with_cluster_boundaries(mut self, boundaries: Vec<usize>) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_cluster_size(mut self, cluster_size: usize) -> Self {
        self.boundaries = uniform_cluster_boundaries(self.n_entries, cluster_size);
        self
    }

    pub fn columns(&self) -> &IndexMap<String, Vec<Value>> {
        &self.columns
    }
}

impl ColumnarSource for InMemorySource {
    fn list_fields(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    fn cluster_boundaries(&self) -> Vec<usize> {
        self.boundaries.clone()
    }

    fn num_entries(&self) -> usize {
        self.n_entries
    }

    fn read(
        &self,
        fields: &[&str],
        entry_start: usize,
        entry_stop: usize,
    ) -> AgcResult<IndexMap<String, Vec<Value>>> {
        let range = clamp_range(entry_start, entry_stop, self.n_entries)?;
        fields
            .iter()
            .map(|&field| {
                let column = self
                    .columns
                    .get(field)
                    .ok_or_else(|| AgcError::MissingColumn {
                        name: field.to_string(),
                    })?;
                Ok((field.to_string(), column[range.clone()].to_vec()))
            })
            .collect()
    }

    fn has_field(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }
}
