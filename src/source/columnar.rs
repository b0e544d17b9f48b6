//! Conversion between the engine's columnar `RecordBatch` and Arrow's, plus
//! a Parquet-format source reader that trusts the file's embedded schema
//! (§4.3). Snapshot writing and the query/diff engines both read and write
//! Parquet through these same conversions, so the on-disk representation
//! and the query substrate (`duckdb`'s `read_parquet`) never disagree.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, Float64Array, Int64Array, StringArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use arrow::record_batch::RecordBatch as ArrowRecordBatch;
use indexmap::IndexMap;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use super::errors::{SourceError, SourceResult};
use super::schema::{ColumnData, ColumnDef, ColumnType, RecordBatch, Schema};

pub fn arrow_schema(schema: &Schema) -> ArrowSchema {
    let fields: Vec<Field> = schema
        .iter()
        .map(|col| Field::new(&col.name, arrow_type(col.column_type), col.nullable))
        .collect();
    ArrowSchema::new(fields)
}

fn arrow_type(t: ColumnType) -> DataType {
    match t {
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Second, None),
        ColumnType::String => DataType::Utf8,
    }
}

fn column_type_from_arrow(t: &DataType) -> ColumnType {
    match t {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ColumnType::Int64,
        DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnType::Float64,
        DataType::Boolean => ColumnType::Bool,
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => ColumnType::Timestamp,
        _ => ColumnType::String,
    }
}

/// Convert one engine batch to an Arrow batch for writing.
pub fn to_arrow_batch(batch: &RecordBatch) -> ArrowRecordBatch {
    let arrays: Vec<Arc<dyn Array>> = batch
        .schema
        .iter()
        .map(|col| {
            let data = batch.columns.get(&col.name).expect("column present");
            column_to_arrow(data)
        })
        .collect();
    ArrowRecordBatch::try_new(Arc::new(arrow_schema(&batch.schema)), arrays)
        .expect("schema and arrays constructed together")
}

fn column_to_arrow(data: &ColumnData) -> Arc<dyn Array> {
    match data {
        ColumnData::Int64(v) => Arc::new(Int64Array::from(v.clone())),
        ColumnData::Float64(v) => Arc::new(Float64Array::from(v.clone())),
        ColumnData::Bool(v) => Arc::new(BooleanArray::from(v.clone())),
        ColumnData::Timestamp(v) => Arc::new(TimestampSecondArray::from(v.clone())),
        ColumnData::String(v) => Arc::new(StringArray::from(v.clone())),
    }
}

/// Convert an Arrow batch (e.g. read back from Parquet) into the engine's
/// own columnar form, narrowing Arrow's wider type universe down to the
/// engine's five-type domain (§4.3).
pub fn from_arrow_batch(arrow_batch: &ArrowRecordBatch) -> RecordBatch {
    let arrow_schema = arrow_batch.schema();
    let mut columns: IndexMap<String, ColumnData> = IndexMap::new();
    let mut defs = Vec::new();

    for (i, field) in arrow_schema.fields().iter().enumerate() {
        let column_type = column_type_from_arrow(field.data_type());
        let array = arrow_batch.column(i);
        columns.insert(field.name().clone(), column_from_arrow(array, column_type));
        defs.push(ColumnDef {
            name: field.name().clone(),
            column_type,
            nullable: field.is_nullable(),
        });
    }

    RecordBatch::new(Schema::from_columns(defs), columns)
}

fn column_from_arrow(array: &Arc<dyn Array>, column_type: ColumnType) -> ColumnData {
    let len = array.len();
    match column_type {
        ColumnType::Int64 => {
            let typed = arrow::array::AsArray::as_primitive::<arrow::datatypes::Int64Type>(array.as_ref());
            ColumnData::Int64((0..len).map(|i| (!typed.is_null(i)).then(|| typed.value(i))).collect())
        }
        ColumnType::Float64 => {
            let typed = arrow::array::AsArray::as_primitive::<arrow::datatypes::Float64Type>(array.as_ref());
            ColumnData::Float64((0..len).map(|i| (!typed.is_null(i)).then(|| typed.value(i))).collect())
        }
        ColumnType::Bool => {
            let typed = array.as_any().downcast_ref::<BooleanArray>().expect("bool array");
            ColumnData::Bool((0..len).map(|i| (!typed.is_null(i)).then(|| typed.value(i))).collect())
        }
        ColumnType::Timestamp => {
            let typed = arrow::array::AsArray::as_primitive::<arrow::datatypes::TimestampSecondType>(array.as_ref());
            ColumnData::Timestamp((0..len).map(|i| (!typed.is_null(i)).then(|| typed.value(i))).collect())
        }
        ColumnType::String => {
            if let Some(typed) = array.as_any().downcast_ref::<StringArray>() {
                ColumnData::String(
                    (0..len)
                        .map(|i| (!typed.is_null(i)).then(|| typed.value(i).to_string()))
                        .collect(),
                )
            } else {
                ColumnData::String(vec![None; len])
            }
        }
    }
}

/// Write `batches` to a Parquet file at `path`, one Arrow row group per
/// engine batch.
pub fn write_parquet(path: &Path, schema: &Schema, batches: &[RecordBatch]) -> SourceResult<()> {
    let file = File::create(path).map_err(|e| SourceError::Io { path: path.to_path_buf(), source: e })?;
    write_parquet_to(file, schema, batches)
        .map_err(|e| SourceError::EncodingError { path: path.to_path_buf(), message: e })
}

/// Serialize `batches` to an in-memory Parquet buffer, for callers (the
/// snapshot writer) that hand bytes to a storage backend rather than
/// writing a filesystem path directly.
pub fn write_parquet_bytes(schema: &Schema, batches: &[RecordBatch]) -> SourceResult<Vec<u8>> {
    let mut buffer = Vec::new();
    write_parquet_to(&mut buffer, schema, batches)
        .map_err(|message| SourceError::EncodingError { path: Path::new("<memory>").to_path_buf(), message })?;
    Ok(buffer)
}

fn write_parquet_to<W: std::io::Write + Send>(
    writer: W,
    schema: &Schema,
    batches: &[RecordBatch],
) -> Result<(), String> {
    let arrow_schema = Arc::new(arrow_schema(schema));
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(writer, arrow_schema, Some(props)).map_err(|e| e.to_string())?;

    for batch in batches {
        let arrow_batch = to_arrow_batch(batch);
        writer.write(&arrow_batch).map_err(|e| e.to_string())?;
    }
    writer.close().map_err(|e| e.to_string())?;
    Ok(())
}

/// Read a Parquet file as a source, trusting its embedded schema rather
/// than running inference (§4.3 "Parquet (trust embedded schema)").
pub fn read_parquet(path: &Path) -> SourceResult<Vec<RecordBatch>> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceError::FileNotFound(path.to_path_buf())
        } else {
            SourceError::Io { path: path.to_path_buf(), source: e }
        }
    })?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| SourceError::EncodingError { path: path.to_path_buf(), message: e.to_string() })?
        .build()
        .map_err(|e| SourceError::EncodingError { path: path.to_path_buf(), message: e.to_string() })?;

    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| SourceError::EncodingError { path: path.to_path_buf(), message: e.to_string() })?;
        batches.push(from_arrow_batch(&batch));
    }
    Ok(batches)
}
