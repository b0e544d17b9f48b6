//! Delimited text reader (CSV/TSV), RFC 4180, with two-pass type inference
//! (§4.3). First pass samples cell text per column to settle each column's
//! widened type; second pass parses every row against that settled schema.

use std::path::Path;

use indexmap::IndexMap;

use super::detect::SourceFormat;
use super::errors::{SourceError, SourceResult};
use super::infer::{classify_cell, parse_as, ColumnTypeAccumulator, ParsedValue};
use super::schema::{ColumnData, ColumnDef, ColumnType, RecordBatch, Schema, DEFAULT_ROW_BATCH_SIZE};

/// Rows sampled to settle each column's type before the full parse.
const INFERENCE_SAMPLE_SIZE: usize = 1024;

pub fn read_delimited(path: &Path, format: SourceFormat) -> SourceResult<Vec<RecordBatch>> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceError::FileNotFound(path.to_path_buf())
        } else {
            SourceError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let text = strip_bom_and_decode(path, &bytes)?;
    reject_lone_cr(path, &text)?;

    let (headers, has_header) = resolve_headers(path, &text, format)?;
    let accumulators = infer_column_types(path, &text, format, &headers, has_header)?;

    let schema = Schema::from_columns(
        headers
            .iter()
            .zip(accumulators.iter())
            .map(|(name, acc)| ColumnDef {
                name: name.clone(),
                column_type: acc.finish(),
                nullable: true,
            })
            .collect(),
    );

    build_batches(path, &text, format, &headers, has_header, &schema)
}

fn strip_bom_and_decode(path: &Path, bytes: &[u8]) -> SourceResult<String> {
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };
    String::from_utf8(bytes.to_vec()).map_err(|e| SourceError::EncodingError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// `csv`'s reader treats a lone `\r` as an ordinary character rather than a
/// line terminator, which silently merges two logical rows. Reject it
/// explicitly (§4.3 edge case) rather than emit a bad batch.
fn reject_lone_cr(path: &Path, text: &str) -> SourceResult<()> {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\r' && bytes.get(i + 1) != Some(&b'\n') {
            let line = text[..i].matches('\n').count() + 1;
            return Err(SourceError::MalformedRecord {
                path: path.to_path_buf(),
                line,
                column: 0,
                message: "lone carriage return is not a supported line terminator".to_string(),
            });
        }
    }
    Ok(())
}

/// A reader over the raw rows, headers and all — header detection happens
/// one level up, so the `csv` crate itself is never told which row (if any)
/// is a header.
fn raw_reader(text: &str, format: SourceFormat) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(false)
        .flexible(false)
        .from_reader(text.as_bytes())
}

/// Decide whether row 1 is a header or the first data row, and return the
/// column names either way (§4.3: "first row is header unless header
/// detection... fails"). Compares row 1's per-cell classification against
/// row 2's: if row 1 reads as all labels (string) while row 2 carries typed
/// data, row 1 is a header; if both rows classify the same way and that
/// classification isn't all-string, row 1 is itself data and columns are
/// synthesized as `column_0..N`. Anything else (too little data to compare,
/// mismatched widths, both rows all-string) defaults to assuming a header,
/// the overwhelmingly common case.
fn resolve_headers(path: &Path, text: &str, format: SourceFormat) -> SourceResult<(Vec<String>, bool)> {
    let mut records = raw_reader(text, format).into_records();

    let row1 = match records.next() {
        Some(row) => row.map_err(|e| csv_error(path, &e))?,
        None => return Ok((Vec::new(), true)),
    };
    let row1: Vec<String> = row1.iter().map(|s| s.to_string()).collect();

    let row2 = match records.next() {
        Some(row) => Some(row.map_err(|e| csv_error(path, &e))?),
        None => None,
    };

    let has_header = match row2 {
        Some(row2) if row2.len() == row1.len() => {
            let row2: Vec<String> = row2.iter().map(|s| s.to_string()).collect();
            row_looks_like_header(&row1, &row2)
        }
        _ => true,
    };

    let headers = if has_header {
        row1
    } else {
        (0..row1.len()).map(|i| format!("column_{i}")).collect()
    };

    Ok((headers, has_header))
}

fn row_looks_like_header(row1: &[String], row2: &[String]) -> bool {
    let types1: Vec<ColumnType> = row1.iter().map(|c| classify_cell(c)).collect();
    let types2: Vec<ColumnType> = row2.iter().map(|c| classify_cell(c)).collect();

    let row1_all_string = types1.iter().all(|t| *t == ColumnType::String);
    let row2_has_typed = types2.iter().any(|t| *t != ColumnType::String);
    if row1_all_string && row2_has_typed {
        return true;
    }

    if types1 == types2 && types1.iter().any(|t| *t != ColumnType::String) {
        return false;
    }

    true
}

fn infer_column_types(
    path: &Path,
    text: &str,
    format: SourceFormat,
    headers: &[String],
    has_header: bool,
) -> SourceResult<Vec<ColumnTypeAccumulator>> {
    let mut accumulators = vec![ColumnTypeAccumulator::new(); headers.len()];
    let mut records = raw_reader(text, format).into_records();
    if has_header {
        records.next();
    }

    for (i, record) in records.enumerate() {
        if i >= INFERENCE_SAMPLE_SIZE {
            break;
        }
        let record = record.map_err(|e| csv_error(path, &e))?;
        validate_width(path, i, headers.len(), record.len(), has_header)?;
        for (acc, cell) in accumulators.iter_mut().zip(record.iter()) {
            acc.observe(Some(cell));
        }
    }

    Ok(accumulators)
}

fn build_batches(
    path: &Path,
    text: &str,
    format: SourceFormat,
    headers: &[String],
    has_header: bool,
    schema: &Schema,
) -> SourceResult<Vec<RecordBatch>> {
    let mut records = raw_reader(text, format).into_records();
    if has_header {
        records.next();
    }

    let mut batches = Vec::new();
    let mut columns: IndexMap<String, ColumnData> = blank_columns(schema);
    let mut rows_in_batch = 0usize;

    for (line, record) in records.enumerate() {
        let record = record.map_err(|e| csv_error(path, &e))?;
        validate_width(path, line, headers.len(), record.len(), has_header)?;

        for (name, cell) in headers.iter().zip(record.iter()) {
            let column_type = schema.get(name).expect("schema built from headers").column_type;
            push_value(columns.get_mut(name).expect("columns from schema"), parse_as(cell, column_type));
        }

        rows_in_batch += 1;
        if rows_in_batch >= DEFAULT_ROW_BATCH_SIZE {
            batches.push(RecordBatch::new(schema.clone(), std::mem::replace(&mut columns, blank_columns(schema))));
            rows_in_batch = 0;
        }
    }

    if rows_in_batch > 0 || batches.is_empty() {
        batches.push(RecordBatch::new(schema.clone(), columns));
    }

    Ok(batches)
}

fn validate_width(path: &Path, line: usize, expected: usize, actual: usize, has_header: bool) -> SourceResult<()> {
    if actual != expected {
        let header_offset = if has_header { 1 } else { 0 };
        return Err(SourceError::MalformedRecord {
            path: path.to_path_buf(),
            line: line + header_offset + 1, // +1 for 1-based line numbers
            column: actual.min(expected),
            message: format!("expected {expected} fields, found {actual}"),
        });
    }
    Ok(())
}

fn blank_columns(schema: &Schema) -> IndexMap<String, ColumnData> {
    schema
        .iter()
        .map(|col| {
            let data = match col.column_type {
                ColumnType::Int64 => ColumnData::Int64(Vec::new()),
                ColumnType::Float64 => ColumnData::Float64(Vec::new()),
                ColumnType::Bool => ColumnData::Bool(Vec::new()),
                ColumnType::Timestamp => ColumnData::Timestamp(Vec::new()),
                ColumnType::String => ColumnData::String(Vec::new()),
            };
            (col.name.clone(), data)
        })
        .collect()
}

fn push_value(column: &mut ColumnData, value: ParsedValue) {
    match (column, value) {
        (ColumnData::Int64(v), ParsedValue::Int64(x)) => v.push(Some(x)),
        (ColumnData::Int64(v), ParsedValue::Null) => v.push(None),
        (ColumnData::Float64(v), ParsedValue::Float64(x)) => v.push(Some(x)),
        (ColumnData::Float64(v), ParsedValue::Int64(x)) => v.push(Some(x as f64)),
        (ColumnData::Float64(v), ParsedValue::Null) => v.push(None),
        (ColumnData::Bool(v), ParsedValue::Bool(x)) => v.push(Some(x)),
        (ColumnData::Bool(v), ParsedValue::Null) => v.push(None),
        (ColumnData::Timestamp(v), ParsedValue::Timestamp(x)) => v.push(Some(x)),
        (ColumnData::Timestamp(v), ParsedValue::Null) => v.push(None),
        (ColumnData::String(v), ParsedValue::String(x)) => v.push(Some(x)),
        (ColumnData::String(v), ParsedValue::Null) => v.push(None),
        _ => unreachable!("parse_as is always called with the column's own settled type"),
    }
}

fn csv_error(path: &Path, e: &csv::Error) -> SourceError {
    match e.kind() {
        csv::ErrorKind::Io(_) => SourceError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        },
        csv::ErrorKind::Utf8 { .. } => SourceError::EncodingError {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
        _ => {
            let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
            SourceError::MalformedRecord {
                path: path.to_path_buf(),
                line,
                column: 0,
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::with_suffix(".csv").unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn infers_mixed_types_across_columns() {
        let f = write_csv("id,name,active\n1,Alice,true\n2,Bob,false\n");
        let batches = read_delimited(f.path(), SourceFormat::Csv).unwrap();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema.get("id").unwrap().column_type, ColumnType::Int64);
        assert_eq!(batch.schema.get("active").unwrap().column_type, ColumnType::Bool);
    }

    #[test]
    fn lone_cr_is_rejected() {
        let f = write_csv("id,name\n1,Alice\r2,Bob\n");
        let result = read_delimited(f.path(), SourceFormat::Csv);
        assert!(matches!(result, Err(SourceError::MalformedRecord { .. })));
    }

    #[test]
    fn ragged_row_is_malformed() {
        let f = write_csv("id,name\n1,Alice\n2\n");
        let result = read_delimited(f.path(), SourceFormat::Csv);
        assert!(matches!(result, Err(SourceError::MalformedRecord { .. })));
    }

    #[test]
    fn bom_is_stripped() {
        let mut f = NamedTempFile::with_suffix(".csv").unwrap();
        f.write_all(b"\xEF\xBB\xBFid,name\n1,Alice\n").unwrap();
        let batches = read_delimited(f.path(), SourceFormat::Csv).unwrap();
        assert!(batches[0].schema.contains("id"));
    }

    #[test]
    fn headerless_all_numeric_first_row_is_treated_as_data() {
        let f = write_csv("1,2.5\n3,4.5\n5,6.5\n");
        let batches = read_delimited(f.path(), SourceFormat::Csv).unwrap();
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 3);
        assert!(batch.schema.contains("column_0"));
        assert!(batch.schema.contains("column_1"));
        assert_eq!(batch.schema.get("column_0").unwrap().column_type, ColumnType::Int64);
    }

    #[test]
    fn string_labels_followed_by_typed_data_is_treated_as_header() {
        let f = write_csv("id,amount\n1,2.5\n3,4.5\n");
        let batches = read_delimited(f.path(), SourceFormat::Csv).unwrap();
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);
        assert!(batch.schema.contains("id"));
        assert!(batch.schema.contains("amount"));
    }
}
