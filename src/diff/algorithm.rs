//! Row comparison algorithms (§4.7 steps 3-6).

use std::collections::HashMap;

use serde::Serialize;

use super::row_source::{render, RowRecord};

/// Rows exceeding this count on either side switch from the in-memory
/// hash-map join to the external sort/merge path (§4.7 step 3).
pub const STREAMING_THRESHOLD: usize = 1_000_000;

#[derive(Debug, Clone, Serialize)]
pub struct ValueChange {
    pub column: String,
    pub from: serde_json::Value,
    pub to: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModifiedRow {
    pub key: String,
    pub changes: Vec<ValueChange>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RowDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<ModifiedRow>,
}

/// Compare two already-loaded, unordered row sets via a hash-map join
/// (§4.7 step 3, in-memory branch). Output is sorted afterward so callers
/// get the same ascending-key ordering regardless of which mode ran.
pub fn hash_map_diff(from: Vec<RowRecord>, to: Vec<RowRecord>, common_columns: &[String], fingerprint_mode: bool) -> RowDiff {
    let from_map: HashMap<String, RowRecord> = from.into_iter().map(|r| (r.key.clone(), r)).collect();
    let to_map: HashMap<String, RowRecord> = to.into_iter().map(|r| (r.key.clone(), r)).collect();

    let mut diff = RowDiff::default();

    for (key, to_row) in &to_map {
        match from_map.get(key) {
            None => diff.added.push(key.clone()),
            Some(from_row) if !fingerprint_mode => {
                let changes = compare_columns(from_row, to_row, common_columns);
                if !changes.is_empty() {
                    diff.modified.push(ModifiedRow { key: key.clone(), changes });
                }
            }
            Some(_) => {} // fingerprint mode: identical key implies identical row
        }
    }

    for key in from_map.keys() {
        if !to_map.contains_key(key) {
            diff.removed.push(key.clone());
        }
    }

    diff.added.sort();
    diff.removed.sort();
    diff.modified.sort_by(|a, b| a.key.cmp(&b.key));
    diff
}

/// Compare two pre-sorted (ascending key) row streams with a lockstep merge
/// (§4.7 step 3, streaming branch). Memory use beyond the sort itself —
/// which duckdb performs, spilling to disk once its own buffer is
/// exceeded — is O(1) per row.
pub fn merge_diff(from: Vec<RowRecord>, to: Vec<RowRecord>, common_columns: &[String], fingerprint_mode: bool) -> RowDiff {
    let mut diff = RowDiff::default();
    let mut i = 0;
    let mut j = 0;

    while i < from.len() && j < to.len() {
        match from[i].key.cmp(&to[j].key) {
            std::cmp::Ordering::Less => {
                diff.removed.push(from[i].key.clone());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                diff.added.push(to[j].key.clone());
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                if !fingerprint_mode {
                    let changes = compare_columns(&from[i], &to[j], common_columns);
                    if !changes.is_empty() {
                        diff.modified.push(ModifiedRow { key: from[i].key.clone(), changes });
                    }
                }
                i += 1;
                j += 1;
            }
        }
    }
    while i < from.len() {
        diff.removed.push(from[i].key.clone());
        i += 1;
    }
    while j < to.len() {
        diff.added.push(to[j].key.clone());
        j += 1;
    }

    diff
}

fn compare_columns(from: &RowRecord, to: &RowRecord, common_columns: &[String]) -> Vec<ValueChange> {
    let mut changes = Vec::new();
    for column in common_columns {
        let from_value = from.values.get(column);
        let to_value = to.values.get(column);
        let from_json = from_value.map(render).unwrap_or(serde_json::Value::Null);
        let to_json = to_value.map(render).unwrap_or(serde_json::Value::Null);
        if from_json != to_json {
            changes.push(ValueChange {
                column: column.clone(),
                from: from_json,
                to: to_json,
            });
        }
    }
    changes
}
