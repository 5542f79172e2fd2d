//! Parquet-backed [`ColumnarSource`] in which every row group is one cluster.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Array, GenericListArray, ListArray, OffsetSizeTrait},
    compute::cast,
    datatypes::{DataType, Field, Float64Type, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use indexmap::IndexMap;
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter, ProjectionMask},
    file::{metadata::ParquetMetaData, properties::WriterProperties},
};
use tracing::debug;

use super::{clamp_range, ColumnarSource};
use crate::{compare::Value, AgcError, AgcResult};

fn canonicalize_source_path(file_path: &str) -> AgcResult<PathBuf> {
    Ok(Path::new(&*shellexpand::full(file_path)?).canonicalize()?)
}

fn expand_output_path(file_path: &str) -> AgcResult<PathBuf> {
    Ok(PathBuf::from(&*shellexpand::full(file_path)?))
}

/// A Parquet file opened for ranged, per-column reads.
#[derive(Clone, Debug)]
pub struct ParquetSource {
    path: PathBuf,
    metadata: Arc<ParquetMetaData>,
    schema: SchemaRef,
    boundaries: Vec<usize>,
}

impl ParquetSource {
    /// Open the file at `file_path` (environment variables and `~` are expanded) and read its
    /// footer.
    pub fn open(file_path: &str) -> AgcResult<Self> {
        let path = canonicalize_source_path(file_path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?;
        let metadata = builder.metadata().clone();
        let schema = builder.schema().clone();
        let mut boundaries = Vec::with_capacity(metadata.num_row_groups());
        let mut offset = 0usize;
        for row_group in metadata.row_groups() {
            boundaries.push(offset);
            offset += row_group.num_rows() as usize;
        }
        debug!(
            path = %path.display(),
            row_groups = boundaries.len(),
            entries = offset,
            "opened parquet source"
        );
        Ok(Self {
            path,
            metadata,
            schema,
            boundaries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn row_groups_for_range(
    metadata: &ParquetMetaData,
    start: usize,
    end: usize,
) -> (Vec<usize>, usize) {
    let mut selected = Vec::new();
    let mut first_row_start = start;
    let mut offset = 0usize;
    for (idx, row_group) in metadata.row_groups().iter().enumerate() {
        let group_start = offset;
        let rows = row_group.num_rows() as usize;
        let group_end = group_start + rows;
        offset = group_end;
        if group_end <= start {
            continue;
        }
        if group_start >= end {
            break;
        }
        if selected.is_empty() {
            first_row_start = group_start;
        }
        selected.push(idx);
        if group_end >= end {
            break;
        }
    }
    (selected, first_row_start)
}

impl ColumnarSource for ParquetSource {
    fn list_fields(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }

    fn cluster_boundaries(&self) -> Vec<usize> {
        self.boundaries.clone()
    }

    fn num_entries(&self) -> usize {
        self.metadata.file_metadata().num_rows() as usize
    }

    fn read(
        &self,
        fields: &[&str],
        entry_start: usize,
        entry_stop: usize,
    ) -> AgcResult<IndexMap<String, Vec<Value>>> {
        let range = clamp_range(entry_start, entry_stop, self.num_entries())?;
        let indices = fields
            .iter()
            .map(|&field| {
                self.schema
                    .index_of(field)
                    .map_err(|_| AgcError::MissingColumn {
                        name: field.to_string(),
                    })
            })
            .collect::<AgcResult<Vec<usize>>>()?;
        let mut columns: IndexMap<String, Vec<Value>> = fields
            .iter()
            .map(|&field| (field.to_string(), Vec::with_capacity(range.len())))
            .collect();
        if range.is_empty() {
            return Ok(columns);
        }

        let (row_groups, first_row_start) =
            row_groups_for_range(&self.metadata, range.start, range.end);
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&self.path)?)?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
        let reader = builder
            .with_row_groups(row_groups)
            .with_projection(mask)
            .build()?;

        let mut skip = range.start - first_row_start;
        let mut remaining = range.len();
        for batch in reader {
            if remaining == 0 {
                break;
            }
            let batch = batch?;
            let rows = batch.num_rows();
            if skip >= rows {
                skip -= rows;
                continue;
            }
            let take = (rows - skip).min(remaining);
            append_batch(&batch.slice(skip, take), &mut columns)?;
            remaining -= take;
            skip = 0;
        }
        if remaining != 0 {
            return Err(AgcError::LengthMismatch {
                context: format!("Entries read from {}", self.path.display()),
                expected: range.len(),
                actual: range.len() - remaining,
            });
        }
        Ok(columns)
    }

    fn has_field(&self, field: &str) -> bool {
        self.schema.index_of(field).is_ok()
    }
}

fn append_batch(batch: &RecordBatch, columns: &mut IndexMap<String, Vec<Value>>) -> AgcResult<()> {
    for (name, values) in columns.iter_mut() {
        let column = batch
            .column_by_name(name)
            .ok_or_else(|| AgcError::MissingColumn { name: name.clone() })?;
        values.extend(array_to_values(name, column)?);
    }
    Ok(())
}

/// Convert an arrow column into nested [`Value`]s. Null numbers become NaN and null lists become
/// empty lists.
fn array_to_values(name: &str, array: &ArrayRef) -> AgcResult<Vec<Value>> {
    match array.data_type() {
        DataType::List(_) => list_to_values(name, array.as_list_opt::<i32>()),
        DataType::LargeList(_) => list_to_values(name, array.as_list_opt::<i64>()),
        DataType::Boolean => {
            let values = array
                .as_boolean_opt()
                .ok_or_else(|| unsupported(name, array.data_type()))?;
            Ok((0..values.len())
                .map(|i| {
                    if values.is_null(i) {
                        Value::Number(f64::NAN)
                    } else {
                        Value::from(values.value(i))
                    }
                })
                .collect())
        }
        data_type if data_type.is_numeric() => {
            let converted = cast(array, &DataType::Float64)?;
            let values = converted
                .as_primitive_opt::<Float64Type>()
                .ok_or_else(|| unsupported(name, array.data_type()))?;
            Ok(values
                .iter()
                .map(|x| Value::Number(x.unwrap_or(f64::NAN)))
                .collect())
        }
        other => Err(unsupported(name, other)),
    }
}

fn list_to_values<O: OffsetSizeTrait>(
    name: &str,
    list: Option<&GenericListArray<O>>,
) -> AgcResult<Vec<Value>> {
    let list = list.ok_or_else(|| AgcError::UnsupportedColumnType {
        name: name.to_string(),
        data_type: "list".to_string(),
    })?;
    let inner = array_to_values(name, list.values())?;
    let offsets = list.value_offsets();
    Ok((0..list.len())
        .map(|i| {
            if list.is_null(i) {
                Value::List(Vec::new())
            } else {
                Value::List(inner[offsets[i].as_usize()..offsets[i + 1].as_usize()].to_vec())
            }
        })
        .collect())
}

fn unsupported(name: &str, data_type: &DataType) -> AgcError {
    AgcError::UnsupportedColumnType {
        name: name.to_string(),
        data_type: data_type.to_string(),
    }
}

/// Options for [`write_parquet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Entries per row group, which become the clusters of the written file.
    pub row_group_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            row_group_size: 1024,
        }
    }
}

impl WriteOptions {
    pub fn row_group_size(mut self, row_group_size: usize) -> Self {
        self.row_group_size = row_group_size.max(1);
        self
    }
}

enum ColumnShape {
    Flat,
    Jagged,
}

fn column_shape(name: &str, values: &[Value]) -> AgcResult<ColumnShape> {
    let is_jagged = matches!(values.first(), Some(Value::List(_)));
    for value in values {
        match (is_jagged, value) {
            (false, Value::Number(_)) => {}
            (true, Value::List(items)) if items.iter().all(|v| v.as_number().is_some()) => {}
            _ => {
                return Err(AgcError::UnsupportedColumnType {
                    name: name.to_string(),
                    data_type: "mixed or deeply nested values".to_string(),
                })
            }
        }
    }
    Ok(if is_jagged {
        ColumnShape::Jagged
    } else {
        ColumnShape::Flat
    })
}

fn column_to_array(values: &[Value], shape: &ColumnShape) -> ArrayRef {
    match shape {
        ColumnShape::Flat => Arc::new(Float64Array::from_iter_values(
            values.iter().filter_map(Value::as_number),
        )),
        ColumnShape::Jagged => Arc::new(ListArray::from_iter_primitive::<Float64Type, _, _>(
            values.iter().map(|value| {
                value
                    .as_list()
                    .map(|items| items.iter().map(|v| v.as_number()).collect::<Vec<_>>())
            }),
        )),
    }
}

/// Write event-aligned columns of numbers or lists of numbers to a Parquet file with row groups
/// of [`WriteOptions::row_group_size`] entries.
pub fn write_parquet(
    file_path: &str,
    columns: &IndexMap<String, Vec<Value>>,
    options: &WriteOptions,
) -> AgcResult<()> {
    let path = expand_output_path(file_path)?;
    let n_entries = columns.values().next().map_or(0, Vec::len);
    let mut fields = Vec::with_capacity(columns.len());
    let mut shapes = Vec::with_capacity(columns.len());
    for (name, values) in columns {
        if values.len() != n_entries {
            return Err(AgcError::LengthMismatch {
                context: format!("Column \"{name}\""),
                expected: n_entries,
                actual: values.len(),
            });
        }
        let shape = column_shape(name, values)?;
        fields.push(match shape {
            ColumnShape::Flat => Field::new(name, DataType::Float64, false),
            ColumnShape::Jagged => Field::new(
                name,
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                true,
            ),
        });
        shapes.push(shape);
    }
    if fields.is_empty() {
        return Err(AgcError::Custom(
            "Cannot write a Parquet file without columns".to_string(),
        ));
    }
    let schema = Arc::new(Schema::new(fields));
    let row_group_size = options.row_group_size.max(1);
    let properties = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .build();
    let mut writer = ArrowWriter::try_new(File::create(&path)?, schema.clone(), Some(properties))?;

    let mut start = 0usize;
    while start < n_entries {
        let end = (start + row_group_size).min(n_entries);
        let arrays = columns
            .values()
            .zip(&shapes)
            .map(|(values, shape)| column_to_array(&values[start..end], shape))
            .collect::<Vec<_>>();
        writer.write(&RecordBatch::try_new(schema.clone(), arrays)?)?;
        writer.flush()?;
        start = end;
    }
    writer.close()?;
    debug!(path = %path.display(), entries = n_entries, row_group_size, "wrote parquet file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use super::*;
    use crate::{
        compare::{classify_columns, compare_all_fields, scan_cluster_boundaries, Outcome, ScanWindow},
        data::{test_event, to_columns, EventBatch},
        source::InMemorySource,
    };

    fn make_temp_dir() -> PathBuf {
        let dir = env::temp_dir().join(format!("agc_test_{}", fastrand::u64(..)));
        fs::create_dir(&dir).expect("temp dir should be created");
        dir
    }

    fn sample_columns(n: usize) -> IndexMap<String, Vec<Value>> {
        let mut rng = fastrand::Rng::with_seed(1234);
        let jagged = (0..n)
            .map(|_| {
                let len = rng.usize(0..5);
                Value::List(
                    (0..len)
                        .map(|_| {
                            if rng.f64() < 0.1 {
                                Value::Number(f64::NAN)
                            } else {
                                Value::Number(rng.f64() * 100.0)
                            }
                        })
                        .collect(),
                )
            })
            .collect();
        let flat = (0..n).map(|i| Value::Number(i as f64)).collect();
        IndexMap::from([
            ("Jet_pt".to_string(), jagged),
            ("event".to_string(), flat),
        ])
    }

    #[test]
    fn test_row_groups_are_clusters() {
        let dir = make_temp_dir();
        let path = dir.join("clusters.parquet");
        let path_str = path.to_str().expect("path should be valid UTF-8");
        let columns = sample_columns(250);
        write_parquet(path_str, &columns, &WriteOptions::default().row_group_size(100))
            .expect("writing parquet should succeed");
        let source = ParquetSource::open(path_str).expect("parquet should reopen");
        assert_eq!(source.num_entries(), 250);
        assert_eq!(source.cluster_boundaries(), vec![0, 100, 200]);
        assert_eq!(source.list_fields(), vec!["Jet_pt", "event"]);

        let read = source.read(&["event", "Jet_pt"], 95, 205).unwrap();
        assert_eq!(read.keys().collect::<Vec<_>>(), vec!["event", "Jet_pt"]);
        assert_eq!(
            classify_columns(&read["Jet_pt"], &columns["Jet_pt"][95..205]),
            Outcome::Match
        );
        assert_eq!(read["event"][0], Value::Number(95.0));
        fs::remove_dir_all(&dir).expect("temp dir cleanup should succeed");
    }

    #[test]
    fn test_missing_column_and_truncated_range() {
        let dir = make_temp_dir();
        let path = dir.join("missing.parquet");
        let path_str = path.to_str().expect("path should be valid UTF-8");
        write_parquet(path_str, &sample_columns(10), &WriteOptions::default())
            .expect("writing parquet should succeed");
        let source = ParquetSource::open(path_str).expect("parquet should reopen");
        assert!(matches!(
            source.read(&["Muon_pt"], 0, 10),
            Err(AgcError::MissingColumn { name }) if name == "Muon_pt"
        ));
        assert_eq!(source.read(&["event"], 8, 50).unwrap()["event"].len(), 2);
        fs::remove_dir_all(&dir).expect("temp dir cleanup should succeed");
    }

    #[test]
    fn test_layouts_with_different_clusters_agree() {
        let dir = make_temp_dir();
        let coarse = dir.join("coarse.parquet");
        let fine = dir.join("fine.parquet");
        let columns = sample_columns(400);
        write_parquet(
            coarse.to_str().unwrap(),
            &columns,
            &WriteOptions::default().row_group_size(150),
        )
        .unwrap();
        write_parquet(
            fine.to_str().unwrap(),
            &columns,
            &WriteOptions::default().row_group_size(64),
        )
        .unwrap();
        let coarse = ParquetSource::open(coarse.to_str().unwrap()).unwrap();
        let fine = ParquetSource::open(fine.to_str().unwrap()).unwrap();
        let report = compare_all_fields(&coarse.list_fields(), &coarse, &fine);
        assert_eq!(report.stats.match_count, 2);
        for boundaries in [coarse.cluster_boundaries(), fine.cluster_boundaries()] {
            let scan =
                scan_cluster_boundaries("Jet_pt", &coarse, &fine, &boundaries, ScanWindow::WIDE);
            assert!(scan.iter().all(|(_, matched)| *matched));
        }
        let memory = InMemorySource::new(columns).unwrap();
        assert!(compare_all_fields(&["Jet_pt"], &memory, &fine)
            .records
            .iter()
            .all(|record| record.equal()));
        fs::remove_dir_all(&dir).expect("temp dir cleanup should succeed");
    }

    #[test]
    fn test_events_survive_parquet() {
        let dir = make_temp_dir();
        let path = dir.join("events.parquet");
        let path_str = path.to_str().expect("path should be valid UTF-8");
        let batch: EventBatch = (0..5).map(|_| test_event()).collect();
        write_parquet(path_str, &to_columns(&batch), &WriteOptions::default()).unwrap();
        let source = ParquetSource::open(path_str).unwrap();
        let reread = EventBatch::read(&source, 0, source.num_entries()).unwrap();
        assert_eq!(reread, batch);
        fs::remove_dir_all(&dir).expect("temp dir cleanup should succeed");
    }
}
