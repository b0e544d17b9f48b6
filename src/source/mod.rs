//! Structured-data source ingestion (§4.3).
//!
//! Every reader lands its data in the same `RecordBatch`/`Schema` shape
//! regardless of origin format, so the snapshot writer never needs to know
//! what it read from.

mod columnar;
mod csv_reader;
mod detect;
mod errors;
mod infer;
mod json_common;
mod json_reader;
mod ndjson_reader;
mod schema;
mod spreadsheet;

pub use columnar::{from_arrow_batch, read_parquet, to_arrow_batch, write_parquet, write_parquet_bytes};
pub use detect::{detect_format, SourceFormat};
pub use errors::{SourceError, SourceResult};
pub use schema::{
    ColumnData, ColumnDef, ColumnType, RecordBatch, Schema, DEFAULT_ROW_BATCH_SIZE,
};

use std::path::Path;

/// Read `path`, auto-detecting its format, into a sequence of row-budget
/// batches sharing one schema.
pub fn read_source(path: &Path) -> SourceResult<Vec<RecordBatch>> {
    if !path.exists() {
        return Err(SourceError::FileNotFound(path.to_path_buf()));
    }

    let format = detect_format(path)?;
    match format {
        SourceFormat::Csv | SourceFormat::Tsv => csv_reader::read_delimited(path, format),
        SourceFormat::Json => json_reader::read_json(path),
        SourceFormat::Ndjson => ndjson_reader::read_ndjson(path),
        SourceFormat::Parquet => columnar::read_parquet(path),
        SourceFormat::Xlsx | SourceFormat::Xls => spreadsheet::read_spreadsheet(path),
    }
}

/// Merge a sequence of same-schema batches' schemas into one, widening
/// where batches happened to infer differently (defensive; readers already
/// settle one schema before producing batches).
pub fn merged_schema(batches: &[RecordBatch]) -> Option<Schema> {
    batches
        .iter()
        .map(|b| &b.schema)
        .cloned()
        .reduce(|acc, s| acc.union(&s))
}
