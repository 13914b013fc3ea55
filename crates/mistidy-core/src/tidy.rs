use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cleaners::{clean_numeric, is_percent_parameter};
use crate::month::{parse_month_label, SerialPolicy};
use crate::reshape::LongRow;

/// One observation of the long-form table. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRow {
    pub store_name: String,
    pub parameter: String,
    pub cafe_code: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub for_ssg: Option<String>,
    pub area_store: Option<f64>,
    pub store_start_date: Option<NaiveDate>,
    pub vintage: Option<String>,
    pub month: NaiveDate,
    pub value: Option<f64>,
}

/// The assembled, filtered, and sorted tidy table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TidyTable {
    rows: Vec<TidyRow>,
}

impl TidyTable {
    /// Sorts by `(store_name, parameter, month)`; ties keep their input order.
    pub fn from_rows(mut rows: Vec<TidyRow>) -> Self {
        rows.sort_by(|a, b| {
            a.store_name
                .cmp(&b.store_name)
                .then_with(|| a.parameter.cmp(&b.parameter))
                .then_with(|| a.month.cmp(&b.month))
        });
        Self { rows }
    }

    pub fn rows(&self) -> &[TidyRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TidyRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn unique_stores(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|row| row.store_name.as_str()).collect()
    }

    pub fn unique_parameters(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|row| row.parameter.as_str()).collect()
    }

    pub fn month_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.iter().map(|row| row.month).min()?;
        let last = self.rows.iter().map(|row| row.month).max()?;
        Some((first, last))
    }
}

impl<'a> IntoIterator for &'a TidyTable {
    type Item = &'a TidyRow;
    type IntoIter = std::slice::Iter<'a, TidyRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembled {
    pub table: TidyTable,
    /// Long rows discarded for a null store name, parameter, or month.
    pub filtered: usize,
}

/// Turns long rows into tidy rows: parses each month label, cleans each value (dividing
/// by 100 on the `%` parameter row), drops rows missing a required key, and sorts.
pub fn assemble(long_rows: &[LongRow<'_>], policy: &SerialPolicy) -> Assembled {
    let mut months: HashMap<&str, Option<NaiveDate>> = HashMap::new();
    let mut rows = Vec::with_capacity(long_rows.len());
    let mut filtered = 0;

    for long in long_rows {
        let month = *months
            .entry(long.month_raw)
            .or_insert_with(|| parse_month_label(long.month_raw, policy));
        let meta = long.meta;
        let percent = is_percent_parameter(meta.parameter.as_deref());
        let value = clean_numeric(long.value_raw, percent);

        match (&meta.store_name, &meta.parameter, month) {
            (Some(store_name), Some(parameter), Some(month)) => rows.push(TidyRow {
                store_name: store_name.clone(),
                parameter: parameter.clone(),
                cafe_code: meta.cafe_code.clone(),
                region: meta.region.clone(),
                category: meta.category.clone(),
                for_ssg: meta.for_ssg.clone(),
                area_store: meta.area_store,
                store_start_date: meta.store_start_date,
                vintage: meta.vintage.clone(),
                month,
                value,
            }),
            _ => filtered += 1,
        }
    }

    Assembled {
        table: TidyTable::from_rows(rows),
        filtered,
    }
}
