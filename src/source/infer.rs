//! Stable type-inference widening for text-based sources (§4.3).
//!
//! Each cell, taken as raw text, is classified against the narrowest type
//! that can hold it; a column's final type is the widest classification
//! seen across all sampled cells, following the fixed order
//! int64 -> float64 -> bool -> timestamp -> string. An empty/missing cell
//! never forces a widening by itself.

use super::schema::ColumnType;

/// Classify a single non-empty cell's narrowest representable type.
pub fn classify_cell(raw: &str) -> ColumnType {
    if raw.parse::<i64>().is_ok() {
        return ColumnType::Int64;
    }
    if raw.parse::<f64>().is_ok() {
        return ColumnType::Float64;
    }
    if matches!(
        raw.to_ascii_lowercase().as_str(),
        "true" | "false"
    ) {
        return ColumnType::Bool;
    }
    if looks_like_timestamp(raw) {
        return ColumnType::Timestamp;
    }
    ColumnType::String
}

fn looks_like_timestamp(raw: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(raw).is_ok()
        || chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").is_ok()
        || chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

/// Accumulates the widest type seen across a column's sampled cells.
#[derive(Debug, Clone, Copy)]
pub struct ColumnTypeAccumulator {
    current: Option<ColumnType>,
}

impl ColumnTypeAccumulator {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// `None` represents a missing/empty cell and does not affect the type.
    pub fn observe(&mut self, raw: Option<&str>) {
        let Some(raw) = raw else { return };
        if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
            return;
        }
        let cell_type = classify_cell(raw);
        self.current = Some(match self.current {
            Some(existing) => existing.widen(cell_type),
            None => cell_type,
        });
    }

    /// A column with no non-empty cells defaults to `String`.
    pub fn finish(self) -> ColumnType {
        self.current.unwrap_or(ColumnType::String)
    }
}

impl Default for ColumnTypeAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `raw` into the typed value implied by `column_type`, returning
/// `None` for an empty cell. Used once the column's final type is settled.
pub fn parse_as(raw: &str, column_type: ColumnType) -> ParsedValue {
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return ParsedValue::Null;
    }
    match column_type {
        ColumnType::Int64 => raw
            .parse::<i64>()
            .map(ParsedValue::Int64)
            .unwrap_or(ParsedValue::Null),
        ColumnType::Float64 => raw
            .parse::<f64>()
            .map(ParsedValue::Float64)
            .unwrap_or(ParsedValue::Null),
        ColumnType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" => ParsedValue::Bool(true),
            "false" => ParsedValue::Bool(false),
            _ => ParsedValue::Null,
        },
        ColumnType::Timestamp => parse_timestamp(raw)
            .map(ParsedValue::Timestamp)
            .unwrap_or(ParsedValue::Null),
        ColumnType::String => ParsedValue::String(raw.to_string()),
    }
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Null,
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Timestamp(i64),
    String(String),
}
