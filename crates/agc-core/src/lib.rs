//! # agc-core
//!
//! This is an internal crate used by `agc`.
#![warn(clippy::perf, clippy::style)]
#![allow(clippy::excessive_precision)]

use thiserror::Error;

/// The `4j1b`/`4j2b` analysis driver and sample normalization.
pub mod analysis;
/// Timing of the read access patterns of a [`ColumnarSource`](crate::source::ColumnarSource).
pub mod benchmark;
/// NaN-aware comparison of the same fields read from two storage layouts.
pub mod compare;
/// Physics objects and the [`Event`](crate::data::Event) model.
pub mod data;
/// Best-candidate trijet reconstruction.
pub mod reconstruction;
/// Object and region selection.
pub mod selection;
/// Columnar event sources and their cluster layout.
pub mod source;
/// Utility functions, enums, and vectors
pub mod utils;

pub use crate::analysis::{
    create_histograms, process_samples, process_source, AnalysisOptions, HistogramSet, Sample,
    SampleMetadata,
};
pub use crate::benchmark::{run_read_benchmarks, ReadTiming};
pub use crate::compare::{
    classify, compare_all_fields, compare_field_across_sources, compare_key_lists,
    compare_region, nan_aware_equal, scan_cluster_boundaries, ComparisonRecord, ComparisonReport,
    ComparisonStats, ErrorReason, KeyComparison, Outcome, ScanWindow, Value,
};
pub use crate::data::{Electron, Event, EventBatch, Jagged, Jet, Muon};
pub use crate::reconstruction::{calculate_trijet_mass, reconstruct_trijet_mass, Trijet};
pub use crate::selection::{
    filter_objects, object_selection, region_selection, ObjectCuts, PackedSelection, Selector,
};
pub use crate::source::{write_parquet, ColumnarSource, InMemorySource, ParquetSource, WriteOptions};
pub use crate::utils::enums::{ObjectKind, Region};
pub use crate::utils::vectors::{Vec3, Vec4};
pub use crate::utils::Histogram;

/// The b-tag score a jet must exceed to count as b-tagged.
pub const B_TAG_THRESHOLD: f64 = 0.5;

pub type AgcResult<T> = Result<T, AgcError>;

/// The error type used by all `agc` internal methods
#[derive(Error, Debug)]
pub enum AgcError {
    /// An alias for [`std::io::Error`].
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    /// An alias for [`parquet::errors::ParquetError`].
    #[error("Parquet Error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),
    /// An alias for [`arrow::error::ArrowError`].
    #[error("Arrow Error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
    /// An alias for [`shellexpand::LookupError`].
    #[error("Failed to expand path: {0}")]
    LookupError(#[from] shellexpand::LookupError<std::env::VarError>),
    /// An error returned by the Python pickle (de)serializer
    #[error("Pickle conversion error: {0}")]
    PickleError(#[from] serde_pickle::Error),
    /// A requested column is not present in the source.
    #[error("Missing column \"{name}\"")]
    MissingColumn {
        /// Name of the column which failed lookup
        name: String,
    },
    /// Two sequences which must be index-aligned have different lengths.
    #[error("{context}: expected length {expected}, found {actual}")]
    LengthMismatch {
        /// Description of what was being aligned
        context: String,
        /// The reference length
        expected: usize,
        /// The offending length
        actual: usize,
    },
    /// A stored column has a type that cannot be read as numbers.
    #[error("Column \"{name}\" has unsupported type {data_type}")]
    UnsupportedColumnType {
        /// Name of the column
        name: String,
        /// Display form of the stored type
        data_type: String,
    },
    /// An entry range with `start > stop`.
    #[error("Invalid entry range {start}..{stop} for a source with {entries} entries")]
    InvalidRange {
        /// First entry requested
        start: usize,
        /// One past the last entry requested
        stop: usize,
        /// Number of entries in the source
        entries: usize,
    },
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}
