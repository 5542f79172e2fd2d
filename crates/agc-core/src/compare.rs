//! NaN-aware comparison of fields read from two storage layouts of the same events.
//!
//! Every comparison resolves to one of three [`Outcome`]s. Shape and type disagreements are
//! reported as [`Outcome::Error`] with an [`ErrorReason`] instead of being folded into a plain
//! mismatch, and no comparison failure aborts a scan: the counters in [`ComparisonStats`] always
//! reflect every field that was visited.
use std::{fmt::Display, ops::Range};

use auto_ops::impl_op_ex;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{source::ColumnarSource, AgcError};

/// A (possibly nested) numeric value as returned by a [`ColumnarSource`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    List(Vec<Value>),
}

impl Value {
    /// The number of scalar leaves below this value.
    pub fn leaf_count(&self) -> usize {
        match self {
            Value::Number(_) => 1,
            Value::List(items) => items.iter().map(Value::leaf_count).sum(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::Number(_) => None,
            Value::List(items) => Some(items),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Number(if value { 1.0 } else { 0.0 })
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{x}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// The leaf count of a whole column.
pub fn element_count(values: &[Value]) -> usize {
    values.iter().map(Value::leaf_count).sum()
}

/// Why a comparison could not produce a match/mismatch verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorReason {
    /// Two sequences at the same nesting level have different lengths.
    ShapeMismatch { expected: usize, actual: usize },
    /// One side is a sequence where the other holds a number.
    TypeMismatch,
    /// The field does not exist in one of the sources.
    MissingField { field: String },
    /// The source failed to produce the field.
    Read(String),
}

impl Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorReason::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch (length {expected} vs {actual})")
            }
            ErrorReason::TypeMismatch => write!(f, "type mismatch (sequence vs number)"),
            ErrorReason::MissingField { field } => write!(f, "missing field \"{field}\""),
            ErrorReason::Read(message) => write!(f, "read failure: {message}"),
        }
    }
}

impl From<AgcError> for ErrorReason {
    fn from(err: AgcError) -> Self {
        match err {
            AgcError::MissingColumn { name } => ErrorReason::MissingField { field: name },
            other => ErrorReason::Read(other.to_string()),
        }
    }
}

/// The three-valued result of comparing two values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Match,
    Mismatch,
    Error(ErrorReason),
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Match)
    }
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Match => write!(f, "MATCH"),
            Outcome::Mismatch => write!(f, "MISMATCH"),
            Outcome::Error(reason) => write!(f, "ERROR: {reason}"),
        }
    }
}

/// Deep equality in which NaN equals NaN.
///
/// Sequences are compared element-wise and only when their lengths agree; numbers are equal if
/// `==` holds or both are NaN. The first unequal element ends the comparison.
pub fn nan_aware_equal(a: &Value, b: &Value) -> Result<bool, ErrorReason> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(x == y || (x.is_nan() && y.is_nan())),
        (Value::List(xs), Value::List(ys)) => nan_aware_equal_slices(xs, ys),
        _ => Err(ErrorReason::TypeMismatch),
    }
}

fn nan_aware_equal_slices(xs: &[Value], ys: &[Value]) -> Result<bool, ErrorReason> {
    if xs.len() != ys.len() {
        return Err(ErrorReason::ShapeMismatch {
            expected: xs.len(),
            actual: ys.len(),
        });
    }
    for (x, y) in xs.iter().zip(ys) {
        if !nan_aware_equal(x, y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Classify `a` against `b` as [`Outcome::Match`], [`Outcome::Mismatch`] or [`Outcome::Error`].
pub fn classify(a: &Value, b: &Value) -> Outcome {
    outcome_from(nan_aware_equal(a, b))
}

/// [`classify`] for two whole columns.
pub fn classify_columns(a: &[Value], b: &[Value]) -> Outcome {
    outcome_from(nan_aware_equal_slices(a, b))
}

fn outcome_from(result: Result<bool, ErrorReason>) -> Outcome {
    match result {
        Ok(true) => Outcome::Match,
        Ok(false) => Outcome::Mismatch,
        Err(reason) => Outcome::Error(reason),
    }
}

/// The result of comparing one field across two sources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub field: String,
    pub outcome: Outcome,
    /// Number of scalar leaves read from the left source (zero if the read failed).
    pub left_elements: usize,
    /// Number of scalar leaves read from the right source (zero if the read failed).
    pub right_elements: usize,
}

impl ComparisonRecord {
    pub fn equal(&self) -> bool {
        self.outcome.is_match()
    }
    pub fn error(&self) -> bool {
        self.outcome.is_error()
    }
}

impl Display for ComparisonRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.field, self.outcome)?;
        if !self.equal() {
            write!(
                f,
                " (elements: {} vs {})",
                self.left_elements, self.right_elements
            )?;
        }
        Ok(())
    }
}

/// Match/mismatch/error counters. Counters from independent runs combine with `+`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonStats {
    pub match_count: usize,
    pub mismatch_count: usize,
    pub error_count: usize,
}

impl ComparisonStats {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Match => self.match_count += 1,
            Outcome::Mismatch => self.mismatch_count += 1,
            Outcome::Error(_) => self.error_count += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.match_count + self.mismatch_count + self.error_count
    }

    fn merge(&self, other: &Self) -> Self {
        Self {
            match_count: self.match_count + other.match_count,
            mismatch_count: self.mismatch_count + other.mismatch_count,
            error_count: self.error_count + other.error_count,
        }
    }
}

impl_op_ex!(+ |a: &ComparisonStats, b: &ComparisonStats| -> ComparisonStats { a.merge(b) });

impl Display for ComparisonStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "matched count: {}; mismatch count: {}; errors: {}",
            self.match_count, self.mismatch_count, self.error_count
        )
    }
}

fn read_column<S: ColumnarSource + ?Sized>(
    source: &S,
    field: &str,
    entry_start: usize,
    entry_stop: usize,
) -> Result<Vec<Value>, ErrorReason> {
    let mut columns = source.read(&[field], entry_start, entry_stop)?;
    columns
        .shift_remove(field)
        .ok_or_else(|| ErrorReason::MissingField {
            field: field.to_string(),
        })
}

fn compare_range<A, B>(
    field: &str,
    left: &A,
    right: &B,
    entry_start: usize,
    entry_stop: usize,
) -> ComparisonRecord
where
    A: ColumnarSource + ?Sized,
    B: ColumnarSource + ?Sized,
{
    let left_values = read_column(left, field, entry_start, entry_stop);
    let right_values = read_column(right, field, entry_start, entry_stop);
    let left_elements = left_values.as_deref().map_or(0, element_count);
    let right_elements = right_values.as_deref().map_or(0, element_count);
    let outcome = match (left_values, right_values) {
        (Ok(l), Ok(r)) => classify_columns(&l, &r),
        (Err(reason), _) | (_, Err(reason)) => Outcome::Error(reason),
    };
    ComparisonRecord {
        field: field.to_string(),
        outcome,
        left_elements,
        right_elements,
    }
}

/// Compare every entry of `field` in `left` and `right` and add the outcome to `stats`.
///
/// Read failures and missing fields are classified as [`Outcome::Error`]; this function never
/// fails and never mutates the sources.
pub fn compare_field_across_sources<A, B>(
    field: &str,
    left: &A,
    right: &B,
    stats: &mut ComparisonStats,
) -> ComparisonRecord
where
    A: ColumnarSource + ?Sized,
    B: ColumnarSource + ?Sized,
{
    let stop = left.num_entries().max(right.num_entries());
    let record = compare_range(field, left, right, 0, stop);
    stats.record(&record.outcome);
    match &record.outcome {
        Outcome::Match => debug!(field, "arrays are equal"),
        Outcome::Mismatch => warn!(
            field,
            left_elements = record.left_elements,
            right_elements = record.right_elements,
            "comparison MISMATCH"
        ),
        Outcome::Error(reason) => warn!(
            field,
            %reason,
            left_elements = record.left_elements,
            right_elements = record.right_elements,
            "comparison ERROR"
        ),
    }
    record
}

/// The [`Outcome`] of comparing `field` over the entries `[entry_start, entry_stop)`.
pub fn compare_region_outcome<A, B>(
    field: &str,
    left: &A,
    right: &B,
    entry_start: usize,
    entry_stop: usize,
) -> Outcome
where
    A: ColumnarSource + ?Sized,
    B: ColumnarSource + ?Sized,
{
    compare_range(field, left, right, entry_start, entry_stop).outcome
}

/// Whether `field` matches over the entries `[entry_start, entry_stop)`. Errors count as `false`.
pub fn compare_region<A, B>(
    field: &str,
    left: &A,
    right: &B,
    entry_start: usize,
    entry_stop: usize,
) -> bool
where
    A: ColumnarSource + ?Sized,
    B: ColumnarSource + ?Sized,
{
    compare_region_outcome(field, left, right, entry_start, entry_stop).is_match()
}

/// The neighbourhood swept around each cluster boundary by [`scan_cluster_boundaries`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    /// Distance in entries swept on each side of a boundary.
    pub window: usize,
    /// Width of each compared sub-range.
    pub step: usize,
}

impl ScanWindow {
    pub const NARROW: ScanWindow = ScanWindow { window: 9, step: 4 };
    pub const WIDE: ScanWindow = ScanWindow {
        window: 19,
        step: 4,
    };

    pub fn new(window: usize, step: usize) -> Self {
        Self {
            window,
            step: step.max(1),
        }
    }

    /// The sub-ranges swept around `boundary`. Starts run from `boundary - window` (clamped at
    /// zero) up to, but excluding, `boundary + window`.
    pub fn ranges(&self, boundary: usize) -> Vec<Range<usize>> {
        let step = self.step.max(1) as i64;
        let boundary = boundary as i64;
        let window = self.window as i64;
        let mut ranges = Vec::new();
        let mut start = boundary - window;
        while start < boundary + window {
            let stop = start + step;
            if stop > 0 {
                ranges.push(start.max(0) as usize..stop as usize);
            }
            start += step;
        }
        ranges
    }
}

impl Default for ScanWindow {
    fn default() -> Self {
        Self::NARROW
    }
}

/// Compare `field` in fixed-width sub-ranges around each cluster boundary.
///
/// The first boundary is the start of the first cluster (entry zero) and is skipped. The
/// report lists every swept range in order with `true` for a match.
pub fn scan_cluster_boundaries<A, B>(
    field: &str,
    left: &A,
    right: &B,
    cluster_boundaries: &[usize],
    window: ScanWindow,
) -> Vec<(Range<usize>, bool)>
where
    A: ColumnarSource + ?Sized,
    B: ColumnarSource + ?Sized,
{
    let mut report = Vec::new();
    for &boundary in cluster_boundaries.iter().skip(1) {
        for range in window.ranges(boundary) {
            let outcome = compare_region_outcome(field, left, right, range.start, range.end);
            if !outcome.is_match() {
                warn!(
                    field,
                    boundary,
                    start = range.start,
                    stop = range.end,
                    %outcome,
                    "discrepancy near cluster boundary"
                );
            }
            report.push((range, outcome.is_match()));
        }
    }
    report
}

/// Records and summed counters for a set of fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub records: Vec<ComparisonRecord>,
    pub stats: ComparisonStats,
}

/// Compare each of `fields` across the two sources.
///
/// With the `rayon` feature the fields are compared in parallel; each worker keeps its own
/// counters and they are summed afterwards.
pub fn compare_all_fields<A, B, S>(fields: &[S], left: &A, right: &B) -> ComparisonReport
where
    A: ColumnarSource + ?Sized,
    B: ColumnarSource + ?Sized,
    S: AsRef<str> + Sync,
{
    let compare_one = |field: &S| {
        let mut stats = ComparisonStats::default();
        let record = compare_field_across_sources(field.as_ref(), left, right, &mut stats);
        (record, stats)
    };
    #[cfg(feature = "rayon")]
    let results: Vec<(ComparisonRecord, ComparisonStats)> =
        fields.par_iter().map(compare_one).collect();
    #[cfg(not(feature = "rayon"))]
    let results: Vec<(ComparisonRecord, ComparisonStats)> =
        fields.iter().map(compare_one).collect();
    let mut report = ComparisonReport::default();
    for (record, stats) in results {
        report.stats = report.stats + stats;
        report.records.push(record);
    }
    report
}

/// The outcome of pairing up the field names of two sources.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyComparison {
    /// Positions at which both sorted key lists hold the same name.
    pub key_matches: usize,
    /// Positions at which the names differ or one list has run out.
    pub key_mismatches: usize,
    /// Array comparisons for every matched name.
    pub arrays: ComparisonReport,
}

/// Sort both sources' field names case-insensitively, pair them by position, and compare the
/// arrays of every pair whose names agree.
pub fn compare_key_lists<A, B>(left: &A, right: &B) -> KeyComparison
where
    A: ColumnarSource + ?Sized,
    B: ColumnarSource + ?Sized,
{
    let sorted = |mut keys: Vec<String>| {
        keys.sort_by_key(|key| key.to_lowercase());
        keys
    };
    let left_keys = sorted(left.list_fields());
    let right_keys = sorted(right.list_fields());
    let mut comparison = KeyComparison::default();
    let mut shared = Vec::new();
    for i in 0..left_keys.len().max(right_keys.len()) {
        match (left_keys.get(i), right_keys.get(i)) {
            (Some(l), Some(r)) if l == r => {
                comparison.key_matches += 1;
                shared.push(l.clone());
            }
            _ => comparison.key_mismatches += 1,
        }
    }
    comparison.arrays = compare_all_fields(&shared, left, right);
    comparison
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::source::InMemorySource;

    fn list(values: &[f64]) -> Value {
        Value::from(values.to_vec())
    }

    fn jagged(values: &[&[f64]]) -> Vec<Value> {
        values.iter().map(|v| list(v)).collect()
    }

    fn source(columns: Vec<(&str, Vec<Value>)>, boundaries: Vec<usize>) -> InMemorySource {
        let columns: IndexMap<String, Vec<Value>> = columns
            .into_iter()
            .map(|(name, values)| (name.to_string(), values))
            .collect();
        InMemorySource::new(columns)
            .unwrap()
            .with_cluster_boundaries(boundaries)
    }

    #[test]
    fn test_nan_equals_nan() {
        let a = list(&[1.0, f64::NAN, 3.0]);
        let b = list(&[1.0, f64::NAN, 3.0]);
        assert_eq!(nan_aware_equal(&a, &b), Ok(true));
        assert_eq!(classify(&a, &b), Outcome::Match);
        assert_ne!(a, b);
    }

    #[test]
    fn test_length_difference_is_an_error() {
        let a = list(&[1.0, 2.0]);
        let b = list(&[1.0, 2.0, 3.0]);
        assert_eq!(
            nan_aware_equal(&a, &b),
            Err(ErrorReason::ShapeMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert!(classify(&a, &b).is_error());
    }

    #[test]
    fn test_nested_jagged_equality() {
        let a = Value::List(jagged(&[&[1.0, 2.0], &[3.0]]));
        let b = Value::List(jagged(&[&[1.0, 2.0], &[3.0]]));
        assert_eq!(nan_aware_equal(&a, &b), Ok(true));
        let c = Value::List(jagged(&[&[1.0, 2.0], &[4.0]]));
        assert_eq!(classify(&a, &c), Outcome::Mismatch);
        let d = Value::List(jagged(&[&[1.0, 2.0], &[3.0, 4.0]]));
        assert!(classify(&a, &d).is_error());
    }

    #[test]
    fn test_sequence_against_number_is_type_error() {
        let a = Value::List(vec![list(&[1.0])]);
        let b = Value::List(vec![Value::Number(1.0)]);
        assert_eq!(classify(&a, &b), Outcome::Error(ErrorReason::TypeMismatch));
    }

    #[test]
    fn test_signed_zero_and_nan_against_number() {
        assert_eq!(nan_aware_equal(&0.0.into(), &(-0.0).into()), Ok(true));
        assert_eq!(nan_aware_equal(&f64::NAN.into(), &1.0.into()), Ok(false));
    }

    #[test]
    fn test_leaf_count() {
        let values = jagged(&[&[1.0, 2.0], &[], &[3.0]]);
        assert_eq!(element_count(&values), 3);
        assert_eq!(Value::List(values).to_string(), "[[1, 2], [], [3]]");
    }

    #[test]
    fn test_field_comparison_classifies_and_counts() {
        let left = source(
            vec![
                ("a", jagged(&[&[1.0, f64::NAN], &[2.0]])),
                ("b", jagged(&[&[1.0], &[2.0]])),
                ("c", jagged(&[&[1.0], &[2.0]])),
                ("d", jagged(&[&[1.0], &[2.0]])),
            ],
            vec![0],
        );
        let right = source(
            vec![
                ("a", jagged(&[&[1.0, f64::NAN], &[2.0]])),
                ("b", jagged(&[&[1.0], &[5.0]])),
                ("c", jagged(&[&[1.0, 7.0], &[2.0]])),
            ],
            vec![0],
        );
        let mut stats = ComparisonStats::default();
        let records: Vec<ComparisonRecord> = ["a", "b", "c", "d"]
            .iter()
            .map(|field| compare_field_across_sources(field, &left, &right, &mut stats))
            .collect();
        assert!(records[0].equal());
        assert_eq!(records[1].outcome, Outcome::Mismatch);
        assert!(records[2].error());
        assert_eq!(
            records[3].outcome,
            Outcome::Error(ErrorReason::MissingField {
                field: "d".to_string()
            })
        );
        assert_eq!(records[2].right_elements, 3);
        assert_eq!(
            stats,
            ComparisonStats {
                match_count: 1,
                mismatch_count: 1,
                error_count: 2
            }
        );
    }

    #[test]
    fn test_outer_length_difference_is_an_error() {
        let left = source(vec![("x", vec![1.0.into(), 2.0.into()])], vec![0]);
        let right = source(
            vec![("x", vec![1.0.into(), 2.0.into(), 3.0.into()])],
            vec![0],
        );
        let mut stats = ComparisonStats::default();
        let record = compare_field_across_sources("x", &left, &right, &mut stats);
        assert_eq!(
            record.outcome,
            Outcome::Error(ErrorReason::ShapeMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(stats.error_count, 1);
    }

    #[test]
    fn test_field_comparison_is_idempotent() {
        let left = source(vec![("x", jagged(&[&[1.0], &[f64::NAN]]))], vec![0]);
        let right = source(vec![("x", jagged(&[&[1.0], &[2.0]]))], vec![0]);
        let mut first = ComparisonStats::default();
        let mut second = ComparisonStats::default();
        let a = compare_field_across_sources("x", &left, &right, &mut first);
        let b = compare_field_across_sources("x", &left, &right, &mut second);
        assert_eq!(a, b);
        assert_eq!(first, second);
    }

    #[test]
    fn test_compare_region_localizes_difference() {
        let values: Vec<Value> = (0..20).map(|i| list(&[i as f64])).collect();
        let mut altered = values.clone();
        altered[13] = list(&[-1.0]);
        let left = source(vec![("x", values)], vec![0, 10]);
        let right = source(vec![("x", altered)], vec![0, 10]);
        assert!(compare_region("x", &left, &right, 0, 13));
        assert!(!compare_region("x", &left, &right, 12, 16));
        assert!(compare_region("x", &left, &right, 14, 20));
    }

    #[test]
    fn test_scan_window_ranges() {
        let ranges = ScanWindow::NARROW.ranges(100);
        assert_eq!(ranges, vec![91..95, 95..99, 99..103, 103..107, 107..111]);
        let near_start = ScanWindow::NARROW.ranges(5);
        assert_eq!(near_start, vec![0..4, 4..8, 8..12, 12..16]);
        assert_eq!(ScanWindow::WIDE.ranges(1000).len(), 10);
    }

    #[test]
    fn test_self_scan_matches_everywhere() {
        let values: Vec<Value> = (0..300)
            .map(|i| list(&vec![i as f64 * 0.5; i % 4]))
            .collect();
        let scalars: Vec<Value> = (0..300).map(|i| Value::from(i as f64)).collect();
        let left = source(
            vec![("Jet_pt", values.clone()), ("run", scalars.clone())],
            vec![0, 100, 250],
        );
        let right = source(vec![("Jet_pt", values), ("run", scalars)], vec![0, 100, 250]);
        for field in left.list_fields() {
            let report = scan_cluster_boundaries(
                &field,
                &left,
                &right,
                &left.cluster_boundaries(),
                ScanWindow::NARROW,
            );
            assert_eq!(report.len(), 10);
            assert!(report.iter().all(|(_, matched)| *matched));
        }
    }

    #[test]
    fn test_scan_finds_boundary_defect() {
        let values: Vec<Value> = (0..200).map(|i| list(&[i as f64])).collect();
        let mut shifted = values.clone();
        shifted[100] = list(&[99.0]);
        let left = source(vec![("x", values)], vec![0, 100]);
        let right = source(vec![("x", shifted)], vec![0, 100]);
        let report = scan_cluster_boundaries("x", &left, &right, &[0, 100], ScanWindow::NARROW);
        let failing: Vec<Range<usize>> = report
            .into_iter()
            .filter(|(_, matched)| !matched)
            .map(|(range, _)| range)
            .collect();
        assert_eq!(failing, vec![99..103]);
    }

    #[test]
    fn test_stats_merge_is_a_sum() {
        let a = ComparisonStats {
            match_count: 3,
            mismatch_count: 1,
            error_count: 0,
        };
        let b = ComparisonStats {
            match_count: 1,
            mismatch_count: 0,
            error_count: 2,
        };
        assert_eq!((a + b).total(), 7);
        assert_eq!(a + b, b + a);
    }

    #[test]
    fn test_key_lists_are_paired_case_insensitively() {
        let left = source(
            vec![
                ("nJet", vec![1.0.into()]),
                ("Jet_pt", vec![list(&[30.0])]),
                ("run", vec![1.0.into()]),
            ],
            vec![0],
        );
        let right = source(
            vec![
                ("run", vec![1.0.into()]),
                ("Jet_pt", vec![list(&[31.0])]),
                ("nJet", vec![1.0.into()]),
                ("zzz", vec![1.0.into()]),
            ],
            vec![0],
        );
        let comparison = compare_key_lists(&left, &right);
        assert_eq!(comparison.key_matches, 3);
        assert_eq!(comparison.key_mismatches, 1);
        assert_eq!(comparison.arrays.stats.match_count, 2);
        assert_eq!(comparison.arrays.stats.mismatch_count, 1);
        assert_eq!(comparison.arrays.records[0].field, "Jet_pt");
    }
}
