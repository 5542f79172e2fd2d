use std::{fmt::Display, time::Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{source::ColumnarSource, AgcResult};

/// Wall-clock time of one read pattern on one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadTiming {
    pub source: String,
    pub operation: String,
    pub seconds: f64,
}

impl Display for ReadTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<16} {:<32} {:>10.4}",
            self.source,
            self.operation.replace('_', " "),
            self.seconds
        )
    }
}

fn time<T, F>(source: &str, operation: &str, f: F) -> AgcResult<(ReadTiming, T)>
where
    F: FnOnce() -> AgcResult<T>,
{
    let start = Instant::now();
    let output = f()?;
    let seconds = start.elapsed().as_secs_f64();
    debug!(source, operation, seconds, "timed read");
    Ok((
        ReadTiming {
            source: source.to_string(),
            operation: operation.to_string(),
            seconds,
        },
        output,
    ))
}

/// Read every field with a separate request.
pub fn load_arrays_for_each_key<S: ColumnarSource + ?Sized>(source: &S) -> AgcResult<()> {
    let n_entries = source.num_entries();
    for field in source.list_fields() {
        source.read(&[&field], 0, n_entries)?;
    }
    Ok(())
}

/// Read every field with a single request.
pub fn load_all_arrays<S: ColumnarSource + ?Sized>(source: &S) -> AgcResult<()> {
    let names = source.list_fields();
    let fields: Vec<&str> = names.iter().map(String::as_str).collect();
    source.read(&fields, 0, source.num_entries())?;
    Ok(())
}

/// Read only `fields` with a single request.
pub fn load_selected_arrays<S: ColumnarSource + ?Sized>(
    source: &S,
    fields: &[&str],
) -> AgcResult<()> {
    source.read(fields, 0, source.num_entries())?;
    Ok(())
}

/// Read a single field.
pub fn load_array<S: ColumnarSource + ?Sized>(source: &S, field: &str) -> AgcResult<()> {
    source.read(&[field], 0, source.num_entries())?;
    Ok(())
}

/// Time each read pattern once, sorted by operation name.
///
/// `open` produces the source and is itself timed as `load_file`, which for file-backed
/// sources is the cost of parsing the metadata. `selected` picks the fields of the
/// `load_selected_arrays` pattern; fields the source lacks are skipped. `load_array` reads the
/// first remaining selected field, or the first field of the source when none remain.
pub fn run_read_benchmarks<S, F>(
    label: &str,
    open: F,
    selected: &[&str],
) -> AgcResult<Vec<ReadTiming>>
where
    S: ColumnarSource,
    F: FnOnce() -> AgcResult<S>,
{
    let (load_file, source) = time(label, "load_file", open)?;
    let selected: Vec<&str> = selected
        .iter()
        .copied()
        .filter(|field| source.has_field(field))
        .collect();
    let names = source.list_fields();
    let single = selected
        .first()
        .copied()
        .or_else(|| names.first().map(String::as_str));
    let mut timings = vec![
        load_file,
        time(label, "load_arrays_for_each_key", || {
            load_arrays_for_each_key(&source)
        })?
        .0,
        time(label, "load_all_arrays", || load_all_arrays(&source))?.0,
        time(label, "load_selected_arrays", || {
            load_selected_arrays(&source, &selected)
        })?
        .0,
    ];
    if let Some(field) = single {
        timings.push(time(label, "load_array", || load_array(&source, field))?.0);
    }
    timings.sort_by(|a, b| a.operation.cmp(&b.operation));
    Ok(timings)
}
