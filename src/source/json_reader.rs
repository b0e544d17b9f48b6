//! Whole-document JSON reader (§4.3): a single JSON value at the document
//! root, either an array of objects (the canonical shape) or one bare
//! object (treated as a single row). Distinct from `ndjson_reader`, which
//! expects one object per line and never parses the file as a single value.

use std::path::Path;

use serde_json::Value as JsonValue;

use super::errors::{SourceError, SourceResult};
use super::json_common::{build_batches, build_schema};
use super::schema::RecordBatch;

pub fn read_json(path: &Path) -> SourceResult<Vec<RecordBatch>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceError::FileNotFound(path.to_path_buf())
        } else {
            SourceError::Io { path: path.to_path_buf(), source: e }
        }
    })?;

    let root: JsonValue = serde_json::from_str(&text).map_err(|e| SourceError::MalformedRecord {
        path: path.to_path_buf(),
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })?;

    let items = match root {
        JsonValue::Array(items) => items,
        JsonValue::Object(map) => vec![JsonValue::Object(map)],
        other => {
            return Err(SourceError::MalformedRecord {
                path: path.to_path_buf(),
                line: 1,
                column: 0,
                message: format!(
                    "expected a JSON array or object at the document root, found {}",
                    json_kind(&other)
                ),
            })
        }
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            JsonValue::Object(map) => Ok(map),
            other => Err(SourceError::MalformedRecord {
                path: path.to_path_buf(),
                line: i + 1,
                column: 0,
                message: format!("expected a JSON object at index {i}, found {}", json_kind(&other)),
            }),
        })
        .collect::<SourceResult<Vec<_>>>()?;

    let schema = build_schema(path, &records)?;
    build_batches(&schema, &records)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::with_suffix(".json").unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_a_pretty_printed_array_of_objects() {
        let f = write_json("[\n  {\"id\": 1, \"name\": \"Alice\"},\n  {\"id\": 2, \"name\": \"Bob\"}\n]\n");
        let batches = read_json(f.path()).unwrap();
        assert_eq!(batches[0].num_rows(), 2);
        assert!(batches[0].schema.contains("id"));
        assert!(batches[0].schema.contains("name"));
    }

    #[test]
    fn reads_a_single_bare_object_as_one_row() {
        let f = write_json("{\"id\": 1, \"name\": \"Alice\"}");
        let batches = read_json(f.path()).unwrap();
        assert_eq!(batches[0].num_rows(), 1);
    }

    #[test]
    fn rejects_a_top_level_scalar() {
        let f = write_json("42");
        let result = read_json(f.path());
        assert!(matches!(result, Err(SourceError::MalformedRecord { .. })));
    }
}
