//! `meta.json` / `index.json` shapes and the naming/hashing helpers that
//! feed them (§3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::source::{RecordBatch, Schema};

/// Everything recorded about one committed snapshot (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub name: String,
    pub source: String,
    pub source_path: String,
    pub format: String,
    pub sequence: u64,
    pub row_count: u64,
    pub column_count: u64,
    pub schema: Schema,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A source directory's identity record, `sources/<hash>/source.json`:
/// the workspace-relative path and format last used to commit that source,
/// independent of any one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub path: String,
    pub format: String,
}

/// One line in a source's `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub sequence: u64,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The full per-source index, in sequence order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexFile {
    pub source: String,
    pub entries: Vec<IndexEntry>,
}

impl IndexFile {
    pub fn next_sequence(&self) -> u64 {
        self.entries.last().map(|e| e.sequence + 1).unwrap_or(1)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }
}

/// Short, stable, filesystem-safe key derived from a normalized source
/// path, used to bound directory fan-out under `sources/` (§4.4 step 6).
pub fn source_key_hash(normalized_source_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_source_path.as_bytes());
    let digest = hasher.finalize();
    hex_encode(&digest[..8])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Expand `pattern`'s recognized tokens (§9): `{source}`, `{format}`,
/// `{seq}`, `{timestamp}`.
pub fn expand_name_pattern(
    pattern: &str,
    source: &str,
    format: &str,
    seq: u64,
    timestamp: DateTime<Utc>,
) -> String {
    pattern
        .replace("{source}", source)
        .replace("{format}", format)
        .replace("{seq}", &seq.to_string())
        .replace("{timestamp}", &timestamp.format("%Y%m%dT%H%M%SZ").to_string())
}

/// SHA-256 over the canonical byte serialization of every row: columns in
/// schema order, numeric values in canonical decimal form, strings as raw
/// UTF-8, rows in their in-file order (§4.4 step 5 — row order is part of
/// identity, so this is NOT sorted before hashing).
pub fn content_hash(schema: &Schema, batches: &[RecordBatch]) -> String {
    let mut hasher = Sha256::new();
    for batch in batches {
        for row in 0..batch.num_rows() {
            for col in schema.iter() {
                let data = batch.column(&col.name);
                let text = data.and_then(|d| d.value_as_string(row)).unwrap_or_default();
                hasher.update(text.as_bytes());
                hasher.update([0x1f]); // unit separator between cells
            }
            hasher.update([0x1e]); // record separator between rows
        }
    }
    hex_encode(&hasher.finalize())
}

/// First 8 hex characters of a content hash, used in human-facing output
/// (§6): `hash8`.
pub fn hash8(full_hash: &str) -> &str {
    &full_hash[..8.min(full_hash.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ColumnData, ColumnDef, ColumnType};
    use indexmap::IndexMap;

    fn sample_schema() -> Schema {
        Schema::from_columns(vec![ColumnDef {
            name: "id".into(),
            column_type: ColumnType::Int64,
            nullable: false,
        }])
    }

    fn batch(values: Vec<Option<i64>>) -> RecordBatch {
        let mut columns = IndexMap::new();
        columns.insert("id".to_string(), ColumnData::Int64(values));
        RecordBatch::new(sample_schema(), columns)
    }

    #[test]
    fn content_hash_is_deterministic() {
        let schema = sample_schema();
        let b = batch(vec![Some(1), Some(2)]);
        let h1 = content_hash(&schema, &[b.clone()]);
        let h2 = content_hash(&schema, &[b]);
        assert_eq!(h1, h2);
    }

    #[test]
    fn content_hash_is_order_sensitive() {
        let schema = sample_schema();
        let forward = content_hash(&schema, &[batch(vec![Some(1), Some(2)])]);
        let reversed = content_hash(&schema, &[batch(vec![Some(2), Some(1)])]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn name_pattern_expands_all_tokens() {
        let ts = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z").unwrap().with_timezone(&Utc);
        let name = expand_name_pattern("{source}_{format}_{seq}", "orders", "csv", 3, ts);
        assert_eq!(name, "orders_csv_3");
    }
}
