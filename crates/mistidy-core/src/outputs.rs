use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series};
use tracing::info;

use crate::error::Result;
use crate::schema::{column_definitions, column_names, validate_table_name, ColumnType};
use crate::tidy::{TidyRow, TidyTable};

/// Default loader script name, written next to the CSV output.
pub const LOADER_SCRIPT_NAME: &str = "duckdb_load.sql";

/// Writes the tidy table as CSV with a header row, even when there are no rows.
///
/// Dates are `YYYY-MM-DD`, nulls are empty fields, and fields containing the delimiter,
/// a quote or a newline are quoted.
pub fn write_csv<W: Write>(table: &TidyTable, writer: W) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    out.write_record(column_names())?;
    for row in table {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_csv_file(table: &TidyTable, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(table, file)?;
    info!(path = %path.display(), rows = table.len(), "wrote tidy CSV");
    Ok(())
}

fn days_since_unix_epoch(date: NaiveDate) -> i32 {
    (date - DateTime::<Utc>::UNIX_EPOCH.date_naive()).num_days() as i32
}

fn text_column(name: &str, rows: &[TidyRow], pick: fn(&TidyRow) -> Option<&str>) -> Column {
    Series::new(name.into(), rows.iter().map(pick).collect::<Vec<_>>()).into()
}

/// Builds a Polars frame with the eleven output columns; date columns are `Date` typed.
pub fn to_dataframe(table: &TidyTable) -> Result<DataFrame> {
    let rows = table.rows();

    let store_start: Vec<Option<i32>> = rows
        .iter()
        .map(|row| row.store_start_date.map(days_since_unix_epoch))
        .collect();
    let month: Vec<i32> = rows
        .iter()
        .map(|row| days_since_unix_epoch(row.month))
        .collect();

    let columns: Vec<Column> = vec![
        text_column("store_name", rows, |row| Some(row.store_name.as_str())),
        text_column("parameter", rows, |row| Some(row.parameter.as_str())),
        text_column("cafe_code", rows, |row| row.cafe_code.as_deref()),
        text_column("region", rows, |row| row.region.as_deref()),
        text_column("category", rows, |row| row.category.as_deref()),
        text_column("for_ssg", rows, |row| row.for_ssg.as_deref()),
        Series::new(
            "area_store".into(),
            rows.iter().map(|row| row.area_store).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("store_start_date".into(), store_start)
            .cast(&DataType::Date)?
            .into(),
        text_column("vintage", rows, |row| row.vintage.as_deref()),
        Series::new("month".into(), month).cast(&DataType::Date)?.into(),
        Series::new(
            "value".into(),
            rows.iter().map(|row| row.value).collect::<Vec<_>>(),
        )
        .into(),
    ];

    Ok(DataFrame::new(columns)?)
}

pub fn write_parquet(table: &TidyTable, path: &Path) -> Result<()> {
    let mut df = to_dataframe(table)?;
    let file = File::create(path)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(&mut df)?;
    info!(path = %path.display(), rows = df.height(), "wrote tidy parquet");
    Ok(())
}

/// DuckDB script that creates `table`, bulk-loads `csv_path` into it and prints a
/// verification summary.
pub fn loader_script(table: &str, csv_path: &Path) -> Result<String> {
    let table = validate_table_name(table)?;
    let csv_literal = absolute_path(csv_path).display().to_string().replace('\'', "''");
    let columns = column_definitions(ColumnType::duckdb).join(",\n    ");

    Ok(format!(
        "-- DuckDB load script for the tidy MIS table\n\
         \n\
         CREATE TABLE IF NOT EXISTS {table} (\n    {columns}\n);\n\
         \n\
         COPY {table} FROM '{csv_literal}' (HEADER, AUTO_DETECT TRUE);\n\
         \n\
         -- Verify the load\n\
         SELECT\n    \
             COUNT(*) AS total_rows,\n    \
             COUNT(DISTINCT store_name) AS unique_stores,\n    \
             COUNT(DISTINCT parameter) AS unique_parameters,\n    \
             MIN(month) AS earliest_month,\n    \
             MAX(month) AS latest_month\n\
         FROM {table};\n\
         \n\
         -- Revenue by region:\n\
         -- SELECT region, SUM(value) AS total_revenue FROM {table}\n\
         --   WHERE parameter = 'Revenue' GROUP BY region ORDER BY total_revenue DESC;\n\
         \n\
         -- Average margin by store (the '%' parameter is stored as a fraction):\n\
         -- SELECT store_name, AVG(value) AS avg_margin FROM {table}\n\
         --   WHERE parameter = '%' GROUP BY store_name ORDER BY avg_margin DESC;\n"
    ))
}

pub fn write_loader_script(table: &str, csv_path: &Path, script_path: &Path) -> Result<()> {
    let script = loader_script(table, csv_path)?;
    fs::write(script_path, script)?;
    info!(path = %script_path.display(), table, "wrote loader script");
    Ok(())
}

/// `duckdb_load.sql` in the directory of `csv_path`.
pub fn default_script_path(csv_path: &Path) -> PathBuf {
    csv_path
        .parent()
        .map(|dir| dir.join(LOADER_SCRIPT_NAME))
        .unwrap_or_else(|| PathBuf::from(LOADER_SCRIPT_NAME))
}

fn absolute_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
