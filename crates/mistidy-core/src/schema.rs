use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{PipelineError, Result};

pub const DEFAULT_TABLE_NAME: &str = "mis_long";

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Numeric,
    Date,
}

impl ColumnType {
    pub fn duckdb(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Numeric => "DOUBLE",
            ColumnType::Date => "DATE",
        }
    }

    pub fn postgres(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Numeric => "DOUBLE PRECISION",
            ColumnType::Date => "DATE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TidyColumn {
    pub name: &'static str,
    pub kind: ColumnType,
}

const fn column(name: &'static str, kind: ColumnType) -> TidyColumn {
    TidyColumn { name, kind }
}

/// Output columns of the tidy table, in order.
pub const TIDY_COLUMNS: [TidyColumn; 11] = [
    column("store_name", ColumnType::Text),
    column("parameter", ColumnType::Text),
    column("cafe_code", ColumnType::Text),
    column("region", ColumnType::Text),
    column("category", ColumnType::Text),
    column("for_ssg", ColumnType::Text),
    column("area_store", ColumnType::Numeric),
    column("store_start_date", ColumnType::Date),
    column("vintage", ColumnType::Text),
    column("month", ColumnType::Date),
    column("value", ColumnType::Numeric),
];

/// Columns that get a secondary index in the relational store.
pub const INDEXED_COLUMNS: [&str; 5] = ["store_name", "parameter", "month", "region", "category"];

pub fn column_names() -> impl Iterator<Item = &'static str> {
    TIDY_COLUMNS.iter().map(|column| column.name)
}

/// Table names are interpolated into SQL, so only plain identifiers are accepted.
pub fn validate_table_name(name: &str) -> Result<&str> {
    if TABLE_NAME.is_match(name) {
        Ok(name)
    } else {
        Err(PipelineError::Validation(format!(
            "invalid table name '{name}': use letters, digits and underscores"
        )))
    }
}

/// Column definitions for a `CREATE TABLE` body, one per line.
pub fn column_definitions(type_name: fn(&ColumnType) -> &'static str) -> Vec<String> {
    TIDY_COLUMNS
        .iter()
        .map(|column| format!("{} {}", column.name, type_name(&column.kind)))
        .collect()
}
