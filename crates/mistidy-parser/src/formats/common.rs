use std::path::Path;

use crate::errors::ParserError;
use crate::model::InputFormat;

pub(crate) fn extension_format(
    reader: &'static str,
    path: &Path,
) -> Result<InputFormat, ParserError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| ParserError::FormatMismatch {
            reader,
            reason: format!("'{}' has no file extension", path.display()),
        })?;

    InputFormat::from_extension(extension).ok_or_else(|| ParserError::FormatMismatch {
        reader,
        reason: format!("unsupported extension '.{extension}'"),
    })
}

/// Renders a spreadsheet number the way a user would have typed it: whole numbers lose
/// their trailing `.0` so serials like `44287` survive as digit strings.
pub(crate) fn render_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
