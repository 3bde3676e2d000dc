//! Dynamic row model
//!
//! The relational source returns a different column set per artifact query,
//! so rows are represented as an ordered mapping of column name to a tagged
//! scalar rather than a fixed struct. The CSV encoder derives its header
//! from the first row.

use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column, Row, TypeInfo};

/// A single tagged scalar value from the relational source.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Field representation used when writing CSV; NULL becomes empty.
    pub fn to_csv_field(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Bool(b) => b.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
        }
    }
}

/// One result row: ordered (column name, value) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Decode a sqlx Postgres row into tagged scalars by column type.
    ///
    /// Types without a first-class mapping are stringified; anything that
    /// fails to decode degrades to NULL rather than failing the export.
    pub fn from_pg_row(row: &PgRow) -> Self {
        let columns = row
            .columns()
            .iter()
            .map(|col| (col.name().to_string(), decode_column(row, col)))
            .collect();
        Self { columns }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn decode_column(row: &PgRow, col: &PgColumn) -> SqlValue {
    let idx = col.ordinal();
    match col.type_info().name() {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, SqlValue::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, SqlValue::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, SqlValue::Float),
        "NUMERIC" => row
            .try_get::<Option<sqlx::types::BigDecimal>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_rfc3339())),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map_or(SqlValue::Null, SqlValue::Text),
    }
}
