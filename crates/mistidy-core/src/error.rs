use mistidy_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input could not be read: {0}")]
    Parser(#[from] ParserError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Invalid configuration file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Required column '{column}' not found in header row {header_row}")]
    MissingColumn {
        column: &'static str,
        header_row: usize,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Only read-only SELECT/WITH statements are allowed: {reason}")]
    ReadOnlyViolation { reason: String },

    #[error("Query did not finish within {seconds}s")]
    QueryTimeout { seconds: u64 },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
