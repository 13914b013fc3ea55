use std::fs;
use std::path::Path;

use csv::ReaderBuilder;

use crate::errors::ParserError;
use crate::model::{normalize_cell, InputFormat, RawGrid};
use crate::registry::GridReader;

use super::extension_format;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct DelimitedReader;

impl Default for DelimitedReader {
    fn default() -> Self {
        Self
    }
}

impl DelimitedReader {
    const NAME: &'static str = "DELIMITED";
}

impl GridReader for DelimitedReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, path: &Path) -> Result<RawGrid, ParserError> {
        let delimiter = match extension_format(Self::NAME, path)? {
            InputFormat::Delimited { delimiter } => delimiter,
            other => {
                return Err(ParserError::FormatMismatch {
                    reader: Self::NAME,
                    reason: format!("'{}' is a {other} file", path.display()),
                })
            }
        };

        let bytes = fs::read(path).map_err(|source| ParserError::Io {
            reader: Self::NAME,
            path: path.to_path_buf(),
            source,
        })?;

        parse_delimited(&bytes, delimiter)
    }
}

/// Parses delimited text with no header assumption.
///
/// Rows may have different lengths. Bytes that are not valid UTF-8 (common in exports
/// saved with a legacy code page) are replaced rather than rejected.
pub fn parse_delimited(content: &[u8], delimiter: u8) -> Result<RawGrid, ParserError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|source| ParserError::Csv {
            reader: DelimitedReader::NAME,
            source,
        })?;
        let row: Vec<Option<String>> = record
            .iter()
            .map(|field| normalize_cell(&String::from_utf8_lossy(field)))
            .collect();
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ParserError::EmptyInput {
            reader: DelimitedReader::NAME,
        });
    }

    Ok(RawGrid::new(rows))
}
