//! Uniform in-memory columnar table abstraction (§4.3).
//!
//! Every reader — delimited text, NDJSON, spreadsheet, or Parquet — lands
//! its data in this shape before anything downstream (hashing, writing,
//! querying) touches it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The inferred or declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int64,
    Float64,
    Bool,
    Timestamp,
    String,
}

impl ColumnType {
    /// Ascending widening order used by type inference and schema-join
    /// reconciliation: an index later in this list can always represent
    /// every value an earlier index can.
    const WIDENING_ORDER: [ColumnType; 5] = [
        ColumnType::Int64,
        ColumnType::Float64,
        ColumnType::Bool,
        ColumnType::Timestamp,
        ColumnType::String,
    ];

    fn rank(self) -> usize {
        Self::WIDENING_ORDER
            .iter()
            .position(|t| *t == self)
            .expect("all variants listed")
    }

    /// The narrowest type that can represent values of both `self` and
    /// `other`. String is the universal fallback.
    pub fn widen(self, other: ColumnType) -> ColumnType {
        if self == other {
            return self;
        }
        Self::WIDENING_ORDER[self.rank().max(other.rank())]
    }

    /// Lowercase name used in diagnostics (§4.6 error messages).
    pub fn label(self) -> &'static str {
        match self {
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Bool => "bool",
            ColumnType::Timestamp => "timestamp",
            ColumnType::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

/// Ordered column definitions. Order is preserved from first encounter
/// because downstream serialization (Parquet, canonical hashing) is
/// positional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: IndexMap<String, ColumnDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<ColumnDef>) -> Self {
        let mut map = IndexMap::with_capacity(columns.len());
        for col in columns {
            map.insert(col.name.clone(), col);
        }
        Self { columns: map }
    }

    pub fn push(&mut self, def: ColumnDef) {
        self.columns.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.values()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Widen `self` to also represent every column in `other`, per the
    /// union-schema reconciliation rule (§4.6): matching names widen their
    /// type; columns present in only one side become nullable in the union.
    pub fn union(&self, other: &Schema) -> Schema {
        let mut result = self.clone();
        for col in other.iter() {
            match result.columns.get(&col.name) {
                Some(existing) => {
                    let widened = ColumnDef {
                        name: existing.name.clone(),
                        column_type: existing.column_type.widen(col.column_type),
                        nullable: existing.nullable || col.nullable,
                    };
                    result.columns.insert(widened.name.clone(), widened);
                }
                None => {
                    result.push(ColumnDef {
                        name: col.name.clone(),
                        column_type: col.column_type,
                        nullable: true,
                    });
                }
            }
        }
        for name in self.names() {
            if !other.contains(name) {
                if let Some(def) = result.columns.get_mut(name) {
                    def.nullable = true;
                }
            }
        }
        result
    }
}

/// A single column's values, one variant per `ColumnType`. Index `i` across
/// every column in a `RecordBatch` refers to the same logical row.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Timestamp(Vec<Option<i64>>),
    String(Vec<Option<String>>),
}

impl ColumnData {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Int64(_) => ColumnType::Int64,
            Self::Float64(_) => ColumnType::Float64,
            Self::Bool(_) => ColumnType::Bool,
            Self::Timestamp(_) => ColumnType::Timestamp,
            Self::String(_) => ColumnType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Timestamp(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render row `i` as a string, for hashing and text fallbacks.
    pub fn value_as_string(&self, i: usize) -> Option<String> {
        match self {
            Self::Int64(v) => v[i].map(|x| x.to_string()),
            Self::Float64(v) => v[i].map(|x| x.to_string()),
            Self::Bool(v) => v[i].map(|x| x.to_string()),
            Self::Timestamp(v) => v[i].map(|x| x.to_string()),
            Self::String(v) => v[i].clone(),
        }
    }
}

/// A row-budget batch of columnar data sharing one `Schema` (§4.3, default
/// 65,536 rows per batch).
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub schema: Schema,
    pub columns: IndexMap<String, ColumnData>,
}

impl RecordBatch {
    pub fn new(schema: Schema, columns: IndexMap<String, ColumnData>) -> Self {
        Self { schema, columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.values().next().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }
}

pub const DEFAULT_ROW_BATCH_SIZE: usize = 65_536;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_ascending() {
        assert_eq!(ColumnType::Int64.widen(ColumnType::Float64), ColumnType::Float64);
        assert_eq!(ColumnType::Float64.widen(ColumnType::String), ColumnType::String);
        assert_eq!(ColumnType::Bool.widen(ColumnType::Bool), ColumnType::Bool);
    }

    #[test]
    fn union_widens_shared_columns_and_nulls_unique_ones() {
        let mut a = Schema::new();
        a.push(ColumnDef { name: "id".into(), column_type: ColumnType::Int64, nullable: false });
        a.push(ColumnDef { name: "amount".into(), column_type: ColumnType::Int64, nullable: false });

        let mut b = Schema::new();
        b.push(ColumnDef { name: "id".into(), column_type: ColumnType::Int64, nullable: false });
        b.push(ColumnDef { name: "amount".into(), column_type: ColumnType::Float64, nullable: false });
        b.push(ColumnDef { name: "note".into(), column_type: ColumnType::String, nullable: true });

        let merged = a.union(&b);
        assert_eq!(merged.get("amount").unwrap().column_type, ColumnType::Float64);
        assert!(merged.get("note").unwrap().nullable);
    }
}
