use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::errors::ParserError;
use crate::model::{InputFormat, RawGrid};
use crate::registry::GridReader;

use super::{extension_format, render_float};

/// Reads one sheet of an Excel/ODS workbook. Uses the first sheet unless a name is given.
#[derive(Debug, Clone, Default)]
pub struct WorkbookReader {
    sheet: Option<String>,
}

impl WorkbookReader {
    const NAME: &'static str = "WORKBOOK";

    pub fn new(sheet: Option<String>) -> Self {
        Self { sheet }
    }

    pub(crate) fn render_cell(cell: &Data) -> Option<String> {
        match cell {
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                if s.trim().is_empty() {
                    None
                } else {
                    Some(s.clone())
                }
            }
            Data::Float(n) => Some(render_float(*n)),
            Data::Int(n) => Some(n.to_string()),
            Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            // Date cells keep their serial so month labels go through the serial rule.
            Data::DateTime(dt) => Some(render_float(dt.as_f64())),
            Data::Error(_) | Data::Empty => None,
        }
    }
}

impl GridReader for WorkbookReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, path: &Path) -> Result<RawGrid, ParserError> {
        if extension_format(Self::NAME, path)? != InputFormat::Workbook {
            return Err(ParserError::FormatMismatch {
                reader: Self::NAME,
                reason: format!("'{}' is not a workbook", path.display()),
            });
        }

        let mut workbook = open_workbook_auto(path).map_err(|source| ParserError::Workbook {
            reader: Self::NAME,
            source,
        })?;

        let sheet_names = workbook.sheet_names().to_vec();
        let sheet = match &self.sheet {
            Some(name) if sheet_names.iter().any(|s| s == name) => name.clone(),
            Some(name) => {
                return Err(ParserError::MissingSheet {
                    reader: Self::NAME,
                    sheet: name.clone(),
                    available: sheet_names,
                })
            }
            None => sheet_names
                .first()
                .cloned()
                .ok_or(ParserError::EmptyInput { reader: Self::NAME })?,
        };

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|source| ParserError::Workbook {
                reader: Self::NAME,
                source,
            })?;
        debug!(sheet = %sheet, size = ?range.get_size(), "reading worksheet");

        let rows: Vec<Vec<Option<String>>> = range
            .rows()
            .map(|row| row.iter().map(Self::render_cell).collect())
            .collect();

        if rows.is_empty() {
            return Err(ParserError::EmptyInput { reader: Self::NAME });
        }

        Ok(RawGrid::new(rows))
    }
}
