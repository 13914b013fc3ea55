use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::ColumnLayout;
use crate::cleaners::{clean_numeric, clean_string};
use crate::labels::MetadataField;
use crate::month::parse_date_cell;

/// The cleaned per-store attributes of one data row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub store_name: Option<String>,
    pub parameter: Option<String>,
    pub cafe_code: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub for_ssg: Option<String>,
    pub area_store: Option<f64>,
    pub store_start_date: Option<NaiveDate>,
    pub vintage: Option<String>,
}

impl MetadataRecord {
    /// Reads and cleans the metadata cells of `row`. Fields whose column is absent stay null.
    pub fn from_row(row: &[Option<String>], layout: &ColumnLayout) -> Self {
        let raw = |field: MetadataField| metadata_cell(row, layout, field);
        let text = |field: MetadataField| clean_string(raw(field));

        Self {
            store_name: text(MetadataField::StoreName),
            parameter: text(MetadataField::Parameter),
            cafe_code: text(MetadataField::CafeCode),
            region: text(MetadataField::Region),
            category: text(MetadataField::Category),
            for_ssg: text(MetadataField::ForSsg),
            area_store: clean_numeric(raw(MetadataField::AreaStore), false),
            store_start_date: parse_date_cell(raw(MetadataField::StoreStartDate)),
            vintage: text(MetadataField::Vintage),
        }
    }
}

fn metadata_cell<'r>(
    row: &'r [Option<String>],
    layout: &ColumnLayout,
    field: MetadataField,
) -> Option<&'r str> {
    layout
        .metadata_index(field)
        .and_then(|index| row.get(index))
        .and_then(|cell| cell.as_deref())
}

/// One (data row, month column) pair before month parsing and value cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow<'a> {
    pub meta: &'a MetadataRecord,
    pub month_raw: &'a str,
    pub value_raw: Option<&'a str>,
}

/// Melts wide rows into long rows.
///
/// Emits `records.len() * month_columns` rows, column by column: every data row for the
/// first month, then every data row for the next. `records[i]` must describe
/// `data_rows[i]`.
pub fn melt<'a>(
    records: &'a [MetadataRecord],
    data_rows: &'a [Vec<Option<String>>],
    layout: &'a ColumnLayout,
) -> Vec<LongRow<'a>> {
    let months: Vec<(usize, &str)> = layout.month_columns().collect();
    let mut long = Vec::with_capacity(records.len() * months.len());

    for (column, label) in months {
        for (meta, row) in records.iter().zip(data_rows) {
            long.push(LongRow {
                meta,
                month_raw: label,
                value_raw: row.get(column).and_then(|cell| cell.as_deref()),
            });
        }
    }

    long
}
