mod common;
mod delimited;
mod workbook;

pub use delimited::{parse_delimited, DelimitedReader};
pub use workbook::WorkbookReader;

pub(crate) use common::{extension_format, render_float};
