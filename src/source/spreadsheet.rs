//! Spreadsheet reader (xlsx/xls), via `calamine` (§4.3). Reads only the
//! first sheet, treats its first row as headers, and trims trailing
//! entirely-empty rows.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use indexmap::IndexMap;

use super::errors::{SourceError, SourceResult};
use super::infer::ColumnTypeAccumulator;
use super::schema::{ColumnData, ColumnDef, ColumnType, RecordBatch, Schema, DEFAULT_ROW_BATCH_SIZE};

pub fn read_spreadsheet(path: &Path) -> SourceResult<Vec<RecordBatch>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        SourceError::MalformedRecord {
            path: path.to_path_buf(),
            line: 0,
            column: 0,
            message: format!("could not open workbook: {e}"),
        }
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SourceError::UnsupportedFormat(format!("{}: no sheets", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SourceError::MalformedRecord {
            path: path.to_path_buf(),
            line: 0,
            column: 0,
            message: e.to_string(),
        })?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| SourceError::UnsupportedFormat(format!(
        "{}: sheet has no header row",
        path.display()
    )))?;
    let headers: Vec<String> = header_row.iter().map(cell_to_header).collect();

    let mut data_rows: Vec<&[Data]> = rows.collect();
    while data_rows
        .last()
        .map(|row| row.iter().all(|c| matches!(c, Data::Empty)))
        .unwrap_or(false)
    {
        data_rows.pop();
    }

    let schema = infer_schema(&headers, &data_rows);
    build_batches(&schema, &headers, &data_rows)
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn infer_schema(headers: &[String], rows: &[&[Data]]) -> Schema {
    let mut accumulators = vec![ColumnTypeAccumulator::new(); headers.len()];
    for row in rows {
        for (acc, cell) in accumulators.iter_mut().zip(row.iter()) {
            acc.observe(cell_text(cell).as_deref());
        }
    }
    Schema::from_columns(
        headers
            .iter()
            .zip(accumulators)
            .map(|(name, acc)| ColumnDef {
                name: name.clone(),
                column_type: acc.finish(),
                nullable: true,
            })
            .collect(),
    )
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn build_batches(schema: &Schema, headers: &[String], rows: &[&[Data]]) -> SourceResult<Vec<RecordBatch>> {
    let mut batches = Vec::new();
    let mut columns = blank_columns(schema);
    let mut rows_in_batch = 0usize;

    for row in rows {
        for (name, cell) in headers.iter().zip(row.iter()) {
            let column_type = schema.get(name).expect("schema from headers").column_type;
            push_cell(columns.get_mut(name).expect("columns from schema"), cell, column_type);
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

fn push_cell(column: &mut ColumnData, cell: &Data, column_type: ColumnType) {
    if matches!(cell, Data::Empty) {
        match column {
            ColumnData::Int64(v) => v.push(None),
            ColumnData::Float64(v) => v.push(None),
            ColumnData::Bool(v) => v.push(None),
            ColumnData::Timestamp(v) => v.push(None),
            ColumnData::String(v) => v.push(None),
        }
        return;
    }

    match (column, cell, column_type) {
        (ColumnData::Int64(v), Data::Int(n), _) => v.push(Some(*n)),
        (ColumnData::Int64(v), Data::Float(f), _) => v.push(Some(*f as i64)),
        (ColumnData::Int64(v), _, _) => v.push(None),
        (ColumnData::Float64(v), Data::Float(f), _) => v.push(Some(*f)),
        (ColumnData::Float64(v), Data::Int(n), _) => v.push(Some(*n as f64)),
        (ColumnData::Float64(v), _, _) => v.push(None),
        (ColumnData::Bool(v), Data::Bool(b), _) => v.push(Some(*b)),
        (ColumnData::Bool(v), _, _) => v.push(None),
        (ColumnData::Timestamp(v), Data::DateTime(dt), _) => {
            v.push(dt.as_datetime().map(|d| d.and_utc().timestamp()))
        }
        (ColumnData::Timestamp(v), _, _) => v.push(None),
        (ColumnData::String(v), other, _) => v.push(Some(other.to_string())),
    }
}

