use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use mistidy_parser::{read_grid_file, RawGrid};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::classify::classify_columns;
use crate::error::{PipelineError, Result};
use crate::header::locate_header;
use crate::labels::MetadataField;
use crate::month::SerialPolicy;
use crate::reshape::{melt, MetadataRecord};
use crate::schema::{validate_table_name, DEFAULT_TABLE_NAME};
use crate::tidy::{assemble, Assembled, TidyTable};

const REQUIRED_FIELDS: [MetadataField; 2] = [MetadataField::StoreName, MetadataField::Parameter];

/// Knobs for a tidy run. Every field has a default, so a config file only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TidyOptions {
    /// How many leading rows may hold the header.
    pub header_scan_rows: usize,
    /// Known metadata labels a row needs to count as the header.
    pub min_header_matches: usize,
    pub serial_policy: SerialPolicy,
    /// Table the loader script and the database layer write to.
    pub table_name: String,
}

impl Default for TidyOptions {
    fn default() -> Self {
        Self {
            header_scan_rows: 10,
            min_header_matches: 5,
            serial_policy: SerialPolicy::Unbounded,
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

impl TidyOptions {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: TidyOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.header_scan_rows == 0 {
            return Err(PipelineError::Validation(
                "header_scan_rows must be at least 1".into(),
            ));
        }
        if !(1..=MetadataField::ALL.len()).contains(&self.min_header_matches) {
            return Err(PipelineError::Validation(format!(
                "min_header_matches must be between 1 and {}",
                MetadataField::ALL.len()
            )));
        }
        if let SerialPolicy::Bounded { min, max } = self.serial_policy {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(PipelineError::Validation(format!(
                    "serial bounds must satisfy min <= max (got {min}..{max})"
                )));
            }
        }
        validate_table_name(&self.table_name)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedColumn {
    pub index: usize,
    pub label: String,
    pub reason: &'static str,
}

/// What a run saw and did, for logs and the CLI summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyReport {
    pub header_row: usize,
    pub header_fallback: bool,
    pub header_matches: usize,
    pub data_rows: usize,
    pub month_labels: Vec<String>,
    pub dropped_columns: Vec<DroppedColumn>,
    pub long_rows: usize,
    pub emitted_rows: usize,
    pub filtered_rows: usize,
    pub unique_stores: usize,
    pub parameters: Vec<String>,
    pub month_range: Option<(NaiveDate, NaiveDate)>,
}

impl fmt::Display for TidyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fallback = if self.header_fallback { " (fallback)" } else { "" };
        writeln!(f, "Header row: {}{}", self.header_row, fallback)?;
        writeln!(f, "Data rows: {}", self.data_rows)?;
        writeln!(f, "Month columns: {}", self.month_labels.len())?;
        writeln!(f, "Dropped columns: {}", self.dropped_columns.len())?;
        writeln!(f, "Total rows: {}", self.emitted_rows)?;
        writeln!(f, "Filtered rows: {}", self.filtered_rows)?;
        writeln!(f, "Unique stores: {}", self.unique_stores)?;
        writeln!(f, "Unique parameters: {}", self.parameters.len())?;
        match self.month_range {
            Some((first, last)) => writeln!(
                f,
                "Date range: {} to {}",
                first.format("%Y-%m"),
                last.format("%Y-%m")
            )?,
            None => writeln!(f, "Date range: none")?,
        }
        write!(f, "Parameters: {}", self.parameters.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TidyOutcome {
    pub table: TidyTable,
    pub report: TidyReport,
}

/// Runs header detection, classification, reshaping and cleaning over a raw grid.
///
/// Cell-level problems turn into nulls. An empty grid or a header without store name
/// and parameter columns fails the whole run.
#[instrument(level = "info", skip(grid, options), fields(grid = %grid))]
pub fn run_pipeline(grid: &RawGrid, options: &TidyOptions) -> Result<TidyOutcome> {
    options.validate()?;
    if grid.is_empty() {
        return Err(PipelineError::Validation("input contains no rows".into()));
    }

    let header = locate_header(grid, options.header_scan_rows, options.min_header_matches);
    let header_cells = grid.row(header.index).unwrap_or_default();
    let data_rows = &grid.rows()[header.index + 1..];

    let layout = classify_columns(header_cells, data_rows, grid.width(), &options.serial_policy);
    for field in REQUIRED_FIELDS {
        if !layout.has_field(field) {
            return Err(PipelineError::MissingColumn {
                column: field.raw_label(),
                header_row: header.index,
            });
        }
    }

    let month_labels: Vec<String> = layout
        .month_columns()
        .map(|(_, label)| label.to_string())
        .collect();
    if month_labels.is_empty() {
        warn!(header_row = header.index, "no month columns recognised; output will be empty");
    }
    info!(
        header_row = header.index,
        data_rows = data_rows.len(),
        month_columns = month_labels.len(),
        "columns classified"
    );

    let records: Vec<MetadataRecord> = data_rows
        .iter()
        .map(|row| MetadataRecord::from_row(row, &layout))
        .collect();
    let long = melt(&records, data_rows, &layout);
    let Assembled { table, filtered } = assemble(&long, &options.serial_policy);

    let report = TidyReport {
        header_row: header.index,
        header_fallback: header.fallback,
        header_matches: header.matched_labels,
        data_rows: data_rows.len(),
        month_labels,
        dropped_columns: layout
            .unclassified()
            .map(|(spec, reason)| DroppedColumn {
                index: spec.index,
                label: spec.label.clone(),
                reason: reason.as_str(),
            })
            .collect(),
        long_rows: long.len(),
        emitted_rows: table.len(),
        filtered_rows: filtered,
        unique_stores: table.unique_stores().len(),
        parameters: table
            .unique_parameters()
            .into_iter()
            .map(str::to_string)
            .collect(),
        month_range: table.month_range(),
    };

    info!(
        long_rows = report.long_rows,
        emitted = report.emitted_rows,
        filtered = report.filtered_rows,
        "tidy table assembled"
    );

    Ok(TidyOutcome { table, report })
}

/// Reads `path` (delimited or workbook) and runs the pipeline over it.
pub fn tidy_file(path: &Path, sheet: Option<&str>, options: &TidyOptions) -> Result<TidyOutcome> {
    let grid = read_grid_file(path, sheet)?;
    run_pipeline(&grid, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = TidyOptions::default();
        assert_eq!(options.header_scan_rows, 10);
        assert_eq!(options.min_header_matches, 5);
        assert_eq!(options.serial_policy, SerialPolicy::Unbounded);
        assert_eq!(options.table_name, "mis_long");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let options = TidyOptions::from_toml_str(
            r#"
            table_name = "btc_mis"

            [serial_policy]
            mode = "bounded"
            min = 36526.0
            max = 73051.0
            "#,
        )
        .expect("config parses");

        assert_eq!(options.table_name, "btc_mis");
        assert_eq!(options.header_scan_rows, 10);
        assert_eq!(
            options.serial_policy,
            SerialPolicy::Bounded {
                min: 36526.0,
                max: 73051.0
            }
        );
    }

    #[test]
    fn invalid_options_are_rejected() {
        assert!(TidyOptions::from_toml_str("min_header_matches = 0").is_err());
        assert!(TidyOptions::from_toml_str("min_header_matches = 10").is_err());
        assert!(TidyOptions::from_toml_str("table_name = \"bad name\"").is_err());
        assert!(TidyOptions::from_toml_str("header_rows = 3").is_err());
        assert!(TidyOptions::from_toml_str(
            "[serial_policy]\nmode = \"bounded\"\nmin = 5.0\nmax = 1.0"
        )
        .is_err());
    }

    #[test]
    fn single_store_two_months_yields_two_rows() {
        let grid = RawGrid::from_strings(vec![
            vec![
                "Store Name",
                "Parameter",
                "Cafe Codes",
                "Region",
                "Category",
                "Apr-21",
                "May-21",
            ],
            vec!["Store A", "Revenue", "C1", "North", "Mall", "1,000", "(200)"],
        ]);

        let outcome = run_pipeline(&grid, &TidyOptions::default()).expect("pipeline runs");
        let values: Vec<(String, Option<f64>)> = outcome
            .table
            .iter()
            .map(|row| (row.month.to_string(), row.value))
            .collect();
        assert_eq!(
            values,
            vec![
                ("2021-04-01".to_string(), Some(1000.0)),
                ("2021-05-01".to_string(), Some(-200.0)),
            ]
        );
        assert!(!outcome.report.header_fallback);
        assert_eq!(outcome.report.header_row, 0);
    }

    #[test]
    fn missing_store_name_column_is_fatal() {
        let grid = RawGrid::from_strings(vec![
            vec!["Parameter", "Region", "Apr-21"],
            vec!["Revenue", "North", "1"],
        ]);
        let err = run_pipeline(&grid, &TidyOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumn {
                column: "Store Name",
                header_row: 0
            }
        ));
    }

    #[test]
    fn empty_grid_is_fatal() {
        let err = run_pipeline(&RawGrid::default(), &TidyOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn no_month_columns_gives_empty_table() {
        let grid = RawGrid::from_strings(vec![
            vec!["Store Name", "Parameter", "Comment"],
            vec!["Store A", "Revenue", "fine"],
        ]);
        let outcome = run_pipeline(&grid, &TidyOptions::default()).expect("pipeline runs");
        assert!(outcome.table.is_empty());
        assert_eq!(outcome.report.month_range, None);
        assert_eq!(outcome.report.dropped_columns.len(), 1);
    }

    #[test]
    fn long_month_names_with_short_years_are_dropped_not_dated() {
        let grid = RawGrid::from_strings(vec![
            vec!["Store Name", "Parameter", "Region", "Category", "Area", "April-21", "Apr 21"],
            vec!["Store A", "Revenue", "North", "South", "Mall", "10", "1000"],
        ]);
        let outcome = run_pipeline(&grid, &TidyOptions::default()).expect("pipeline runs");

        assert_eq!(outcome.report.month_labels, vec!["Apr 21"]);
        assert_eq!(outcome.report.dropped_columns.len(), 1);
        assert_eq!(outcome.report.dropped_columns[0].label, "April-21");
        assert_eq!(outcome.report.dropped_columns[0].reason, "not_a_month");

        let rows = outcome.table.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].month, NaiveDate::from_ymd_opt(2021, 4, 1).unwrap());
        assert_eq!(rows[0].value, Some(1000.0));
    }
}
