//! Newline-delimited JSON reader (§4.3): one JSON object per line.

use std::path::Path;

use serde_json::Value as JsonValue;

use super::errors::{SourceError, SourceResult};
use super::json_common::{build_batches, build_schema};
use super::schema::RecordBatch;

pub fn read_ndjson(path: &Path) -> SourceResult<Vec<RecordBatch>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceError::FileNotFound(path.to_path_buf())
        } else {
            SourceError::Io { path: path.to_path_buf(), source: e }
        }
    })?;

    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let records = parse_lines(path, &lines)?;

    let schema = build_schema(path, &records)?;
    build_batches(&schema, &records)
}

fn parse_lines<'a>(path: &Path, lines: &[&'a str]) -> SourceResult<Vec<serde_json::Map<String, JsonValue>>> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let value: JsonValue = serde_json::from_str(line).map_err(|e| SourceError::MalformedRecord {
                path: path.to_path_buf(),
                line: i + 1,
                column: e.column(),
                message: e.to_string(),
            })?;
            match value {
                JsonValue::Object(map) => Ok(map),
                _ => Err(SourceError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: i + 1,
                    column: 0,
                    message: "expected a JSON object per line".to_string(),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_ndjson(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::with_suffix(".ndjson").unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn unions_keys_across_records() {
        let f = write_ndjson("{\"a\":1}\n{\"a\":2,\"b\":\"x\"}\n");
        let batches = read_ndjson(f.path()).unwrap();
        let schema = &batches[0].schema;
        assert!(schema.contains("a"));
        assert!(schema.contains("b"));
        assert!(schema.get("b").unwrap().nullable);
    }

    #[test]
    fn drift_past_sample_window_is_rejected() {
        let mut contents = String::new();
        for _ in 0..super::json_common::SCHEMA_SAMPLE_SIZE {
            contents.push_str("{\"a\":1}\n");
        }
        contents.push_str("{\"a\":1,\"new_field\":2}\n");
        let f = write_ndjson(&contents);
        let result = read_ndjson(f.path());
        assert!(matches!(result, Err(SourceError::SchemaDrift { .. })));
    }
}
