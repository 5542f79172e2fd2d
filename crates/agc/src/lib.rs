//! `agc` is a small library for the ttbar benchmark of the [Analysis Grand Challenge](https://agc.readthedocs.io). It reconstructs the hadronically decaying top quark in semi-leptonic ttbar events and histograms the result in two signal regions. It also carries the tooling that checks a columnar file rewritten with a different cluster layout still holds exactly the same values.
//!
//! # Table of Contents
//! - [Key Features](#key-features)
//! - [Quick Start](#quick-start)
//!   - [Reconstructing the Top Mass](#reconstructing-the-top-mass)
//!   - [Comparing Two Layouts](#comparing-two-layouts)
//! - [Data Format](#data-format)
//! - [Command Line](#command-line)
//!
//! # Key Features
//! * Fixed-schema [`Electron`], [`Muon`] and [`Jet`] objects read from NanoAOD-style jagged columns.
//! * The reference object cuts and the `4j1b`/`4j2b` [`Region`]s, with every threshold configurable through [`ObjectCuts`] and [`AnalysisOptions`].
//! * Best-candidate trijet reconstruction of $`m_{bjj}`$ with a deterministic tie-break.
//! * NaN-aware deep equality with an explicit three-valued [`Outcome`], and a scan of the entries around every cluster boundary.
//! * Parallel processing of partitions and fields using [`rayon`](https://github.com/rayon-rs/rayon).
//!
//! # Quick Start
//! ## Reconstructing the Top Mass
//! The per-event observable is the invariant mass of the three-jet combination with the largest transverse momentum among those that contain at least one b-tagged jet:
//! ```math
//! m_{bjj} = \sqrt{\left(\sum_{i\in\{a,b,c\}} E_i\right)^2 - \left|\sum_{i\in\{a,b,c\}} \vec{p}_i\right|^2}
//! ```
//! Events without any such combination do not contribute.
//!
//! ```rust,no_run
//! use agc::{
//!     create_histograms, AnalysisOptions, EventBatch, ParquetSource, Region, SampleMetadata,
//!     AgcResult,
//! };
//! use agc::traits::*;
//!
//! fn main() -> AgcResult<()> {
//!     let source = ParquetSource::open("~/data/ttbar_nominal.parquet")?;
//!     let batch = EventBatch::read(&source, 0, source.num_entries())?;
//!     let metadata = SampleMetadata::new("ttbar", "nominal")
//!         .xsec(729.84)
//!         .nevts(1_334_428);
//!     let histograms = create_histograms(&batch, &metadata, &AnalysisOptions::default())?;
//!     if let Some(m_bjj) = histograms.get(Region::FourJetsTwoTags, "ttbar", "nominal") {
//!         println!("4j2b yield: {:.1}", m_bjj.total());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Comparing Two Layouts
//! Two sources holding the same events can be compared field by field. Each comparison is a
//! [`ComparisonRecord`] whose [`Outcome`] is a match, a mismatch, or an error carrying an
//! [`ErrorReason`] (for instance two jagged rows of different lengths). Counters are owned by
//! the caller:
//!
//! ```rust,no_run
//! use agc::{
//!     compare_field_across_sources, scan_cluster_boundaries, ComparisonStats, ParquetSource,
//!     ScanWindow, AgcResult,
//! };
//! use agc::traits::*;
//!
//! fn main() -> AgcResult<()> {
//!     let original = ParquetSource::open("events.parquet")?;
//!     let rewritten = ParquetSource::open("events_small_row_groups.parquet")?;
//!     let mut stats = ComparisonStats::default();
//!     for field in original.list_fields() {
//!         let record = compare_field_across_sources(&field, &original, &rewritten, &mut stats);
//!         if !record.equal() {
//!             for (range, matched) in scan_cluster_boundaries(
//!                 &field,
//!                 &original,
//!                 &rewritten,
//!                 &rewritten.cluster_boundaries(),
//!                 ScanWindow::NARROW,
//!             ) {
//!                 if !matched {
//!                     println!("{field}: entries {range:?} differ");
//!                 }
//!             }
//!         }
//!     }
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```
//!
//! # Data Format
//! Events are read through the [`ColumnarSource`](crate::traits::ColumnarSource) trait. Every
//! field is a column with one entry per event: either a number or a list of numbers. The
//! analysis reads the NanoAOD branches listed by [`EventBatch::required_columns`]:
//!
//! | Collection | Branches |
//! | ---------- | -------- |
//! | `Electron` | `pt`, `eta`, `phi`, `mass`, `cutBased`, `sip3d` |
//! | `Muon`     | `pt`, `eta`, `phi`, `mass`, `tightId`, `sip3d`, `pfRelIso04_all` |
//! | `Jet`      | `pt`, `eta`, `phi`, `mass`, `btagCSVV2`, `jetId` |
//!
//! Branch names are prefixed with the collection, e.g. `Jet_btagCSVV2`. [`ParquetSource`]
//! reads Parquet files in which each row group plays the role of a cluster, and
//! [`write_parquet`] writes the same columns with a chosen row-group size.
//!
//! # Command Line
//! The `agc` binary wraps the library:
//! ```shell
//! agc compare events.parquet rewritten.parquet
//! agc scan events.parquet rewritten.parquet --field Jet_pt --wide
//! agc analyze ttbar.parquet --process ttbar --xsec 729.84 --nevts 1334428 --output hist.pkl
//! agc bench events.parquet rewritten.parquet
//! ```
//! Logging goes through [`tracing`](https://docs.rs/tracing) and is controlled with `RUST_LOG`.
#![warn(clippy::perf, clippy::style)]

/// Physics objects and event batches.
pub mod data {
    pub use agc_core::data::{
        to_columns, Electron, Event, EventBatch, Jagged, Jet, Kinematics, Muon,
    };
}
/// Object and region selection.
pub mod selection {
    pub use agc_core::selection::*;
}
/// Trijet reconstruction.
pub mod reconstruction {
    pub use agc_core::reconstruction::*;
}
/// Histogramming of the analysis regions.
pub mod analysis {
    pub use agc_core::analysis::*;
}
/// NaN-aware comparison and cluster-boundary scans.
pub mod compare {
    pub use agc_core::compare::*;
}
/// Columnar sources and Parquet I/O.
pub mod source {
    pub use agc_core::source::*;
}
/// Read-pattern timing.
pub mod benchmark {
    pub use agc_core::benchmark::*;
}
/// Utility functions, enums, and vectors
pub mod utils {
    pub use agc_core::utils::*;
}
/// Useful traits for all crate structs
pub mod traits {
    pub use agc_core::data::Kinematics;
    pub use agc_core::selection::Selector;
    pub use agc_core::source::ColumnarSource;
}

pub use agc_core::analysis::{
    create_histograms, process_samples, process_source, AnalysisOptions, HistogramSet, Sample,
    SampleMetadata,
};
pub use agc_core::benchmark::{run_read_benchmarks, ReadTiming};
pub use agc_core::compare::{
    classify, compare_all_fields, compare_field_across_sources, compare_key_lists,
    compare_region, nan_aware_equal, scan_cluster_boundaries, ComparisonRecord, ComparisonReport,
    ComparisonStats, ErrorReason, KeyComparison, Outcome, ScanWindow, Value,
};
pub use agc_core::data::{Electron, Event, EventBatch, Jagged, Jet, Muon};
pub use agc_core::reconstruction::{calculate_trijet_mass, reconstruct_trijet_mass, Trijet};
pub use agc_core::selection::{
    filter_objects, object_selection, region_selection, ObjectCuts, PackedSelection,
};
pub use agc_core::source::{write_parquet, InMemorySource, ParquetSource, WriteOptions};
pub use agc_core::utils::enums::{ObjectKind, Region};
pub use agc_core::utils::vectors::{Vec3, Vec4};
pub use agc_core::utils::Histogram;
pub use agc_core::B_TAG_THRESHOLD;
pub use agc_core::{AgcError, AgcResult};
