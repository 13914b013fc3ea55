use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ReaderAttempt {
    pub reader: &'static str,
    pub message: String,
}

impl ReaderAttempt {
    pub fn new(reader: &'static str, message: impl Into<String>) -> Self {
        Self {
            reader,
            message: message.into(),
        }
    }
}

impl fmt::Display for ReaderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reader, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{reader} format mismatch: {reason}")]
    FormatMismatch {
        reader: &'static str,
        reason: String,
    },

    #[error("{reader} failed to read {path}: {source}")]
    Io {
        reader: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{reader} CSV error: {source}")]
    Csv {
        reader: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{reader} workbook error: {source}")]
    Workbook {
        reader: &'static str,
        #[source]
        source: calamine::Error,
    },

    #[error("{reader} sheet '{sheet}' not found; available sheets: {available:?}")]
    MissingSheet {
        reader: &'static str,
        sheet: String,
        available: Vec<String>,
    },

    #[error("{reader} input did not contain any rows")]
    EmptyInput { reader: &'static str },

    #[error("no reader recognized this file; attempts: {attempts:?}")]
    NoMatchingReader { attempts: Vec<ReaderAttempt> },
}
