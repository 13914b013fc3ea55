pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{ParserError, ReaderAttempt};
pub use formats::{parse_delimited, DelimitedReader, WorkbookReader};
pub use model::{InputFormat, RawGrid};
pub use registry::{read_grid_file, read_with_readers, GridReader};

#[cfg(test)]
mod tests;
