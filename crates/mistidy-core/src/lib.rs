pub mod classify;
pub mod cleaners;
pub mod db;
pub mod error;
pub mod header;
pub mod labels;
pub mod month;
pub mod outputs;
pub mod pipeline;
pub mod reshape;
pub mod schema;
pub mod tidy;

pub use error::{PipelineError, Result};
pub use month::SerialPolicy;
pub use pipeline::{run_pipeline, tidy_file, TidyOptions, TidyOutcome, TidyReport};
pub use tidy::{TidyRow, TidyTable};
