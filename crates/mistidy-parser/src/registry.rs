use std::path::Path;

use tracing::debug;

use crate::errors::{ParserError, ReaderAttempt};
use crate::formats::{DelimitedReader, WorkbookReader};
use crate::model::RawGrid;

pub trait GridReader {
    fn name(&self) -> &'static str;
    fn read(&self, path: &Path) -> Result<RawGrid, ParserError>;
}

/// Reads any supported spreadsheet export into a [`RawGrid`].
///
/// `sheet` only matters for workbooks; delimited files ignore it.
pub fn read_grid_file(path: &Path, sheet: Option<&str>) -> Result<RawGrid, ParserError> {
    let delimited = DelimitedReader::default();
    let workbook = WorkbookReader::new(sheet.map(str::to_string));
    let readers: [&dyn GridReader; 2] = [&delimited, &workbook];
    read_with_readers(path, &readers)
}

pub fn read_with_readers(
    path: &Path,
    readers: &[&dyn GridReader],
) -> Result<RawGrid, ParserError> {
    let mut attempts = Vec::new();

    for reader in readers {
        match reader.read(path) {
            Ok(grid) => {
                debug!(reader = reader.name(), %grid, "raw grid loaded");
                return Ok(grid);
            }
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(ReaderAttempt::new(reader.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingReader { attempts })
}
