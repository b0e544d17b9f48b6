//! Row-identity key resolution (§4.7 step 2).

use crate::source::Schema;

#[derive(Debug, Clone)]
pub enum RowKey {
    /// A declared primary key (possibly composite), by column name.
    Declared(Vec<String>),
    /// The literal `id` column, present in both schemas.
    LiteralId,
    /// SHA-256 fingerprint over the common columns. `modified` is always
    /// empty in this mode: an identical fingerprint means an identical row.
    Fingerprint(Vec<String>),
}

impl RowKey {
    pub fn is_fingerprint(&self) -> bool {
        matches!(self, Self::Fingerprint(_))
    }

    pub fn columns(&self) -> &[String] {
        match self {
            Self::Declared(cols) | Self::Fingerprint(cols) => cols,
            Self::LiteralId => {
                static ID: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
                ID.get_or_init(|| vec![ID_COLUMN.to_string()])
            }
        }
    }
}

const ID_COLUMN: &str = "id";

/// Resolve the identity key for a diff, given an optional declared primary
/// key and the two snapshots' schemas (§4.7 step 2).
pub fn resolve_key(declared_pk: Option<&[String]>, from: &Schema, to: &Schema) -> RowKey {
    if let Some(pk) = declared_pk {
        if !pk.is_empty() {
            return RowKey::Declared(pk.to_vec());
        }
    }

    if from.contains(ID_COLUMN) && to.contains(ID_COLUMN) {
        return RowKey::LiteralId;
    }

    let common: Vec<String> = from
        .names()
        .filter(|n| to.contains(n))
        .map(|n| n.to_string())
        .collect();
    RowKey::Fingerprint(common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ColumnDef, ColumnType};

    fn schema(names: &[&str]) -> Schema {
        Schema::from_columns(
            names
                .iter()
                .map(|n| ColumnDef { name: n.to_string(), column_type: ColumnType::String, nullable: true })
                .collect(),
        )
    }

    #[test]
    fn declared_pk_wins() {
        let from = schema(&["id", "name"]);
        let to = schema(&["id", "name"]);
        let key = resolve_key(Some(&["name".to_string()]), &from, &to);
        assert!(matches!(key, RowKey::Declared(cols) if cols == vec!["name".to_string()]));
    }

    #[test]
    fn falls_back_to_literal_id() {
        let from = schema(&["id", "name"]);
        let to = schema(&["id", "email"]);
        let key = resolve_key(None, &from, &to);
        assert!(matches!(key, RowKey::LiteralId));
    }

    #[test]
    fn falls_back_to_fingerprint_over_common_columns() {
        let from = schema(&["name", "dept"]);
        let to = schema(&["name", "salary"]);
        let key = resolve_key(None, &from, &to);
        match key {
            RowKey::Fingerprint(cols) => assert_eq!(cols, vec!["name".to_string()]),
            other => panic!("expected fingerprint, got {other:?}"),
        }
    }
}
