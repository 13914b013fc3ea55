use std::collections::HashSet;

use tracing::{debug, warn};

use crate::labels::{normalize_label, MetadataField};
use crate::month::{is_month_label, SerialPolicy};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Metadata(MetadataField),
    Month(String),
    Unclassified(UnclassifiedReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnclassifiedReason {
    /// Every data cell in the column is null.
    AllNull,
    /// A later copy of a metadata label that already claimed a column.
    DuplicateMetadata,
    NotAMonth,
}

impl UnclassifiedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnclassifiedReason::AllNull => "all_null",
            UnclassifiedReason::DuplicateMetadata => "duplicate_metadata",
            UnclassifiedReason::NotAMonth => "not_a_month",
        }
    }
}

/// Classification of one grid column. `label` is the header text after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub index: usize,
    pub label: String,
    pub kind: ColumnKind,
}

/// One `ColumnSpec` per grid column, in grid order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnLayout {
    columns: Vec<ColumnSpec>,
}

impl ColumnLayout {
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn metadata_index(&self, field: MetadataField) -> Option<usize> {
        self.columns.iter().find_map(|spec| match spec.kind {
            ColumnKind::Metadata(found) if found == field => Some(spec.index),
            _ => None,
        })
    }

    pub fn has_field(&self, field: MetadataField) -> bool {
        self.metadata_index(field).is_some()
    }

    /// `(column index, raw label)` for every month column, left to right.
    pub fn month_columns(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.columns.iter().filter_map(|spec| match &spec.kind {
            ColumnKind::Month(label) => Some((spec.index, label.as_str())),
            _ => None,
        })
    }

    pub fn month_count(&self) -> usize {
        self.month_columns().count()
    }

    pub fn unclassified(&self) -> impl Iterator<Item = (&ColumnSpec, UnclassifiedReason)> + '_ {
        self.columns.iter().filter_map(|spec| match spec.kind {
            ColumnKind::Unclassified(reason) => Some((spec, reason)),
            _ => None,
        })
    }
}

/// Splits the grid's columns into metadata fields, month columns, and everything else.
///
/// `header` holds the raw header cells (missing cells read as empty labels) and
/// `data_rows` the rows below it. Columns with no data at all are dropped before any
/// label is looked at. A month column must pass [`is_month_label`] on its own label.
pub fn classify_columns(
    header: &[Option<String>],
    data_rows: &[Vec<Option<String>>],
    width: usize,
    policy: &SerialPolicy,
) -> ColumnLayout {
    let mut claimed: HashSet<MetadataField> = HashSet::new();
    let mut columns = Vec::with_capacity(width);

    for index in 0..width {
        let raw = header
            .get(index)
            .and_then(|cell| cell.as_deref())
            .unwrap_or("");
        let label = normalize_label(raw);

        let kind = if column_is_empty(data_rows, index) {
            ColumnKind::Unclassified(UnclassifiedReason::AllNull)
        } else if let Some(field) = MetadataField::from_canonical_name(&label) {
            if claimed.insert(field) {
                ColumnKind::Metadata(field)
            } else {
                warn!(column = index, label = %label, "duplicate metadata column ignored");
                ColumnKind::Unclassified(UnclassifiedReason::DuplicateMetadata)
            }
        } else if is_month_label(&label, policy) {
            ColumnKind::Month(label.clone())
        } else {
            ColumnKind::Unclassified(UnclassifiedReason::NotAMonth)
        };

        debug!(column = index, label = %label, kind = ?kind, "classified column");
        columns.push(ColumnSpec { index, label, kind });
    }

    ColumnLayout { columns }
}

fn column_is_empty(data_rows: &[Vec<Option<String>>], index: usize) -> bool {
    data_rows
        .iter()
        .all(|row| row.get(index).map_or(true, Option::is_none))
}
