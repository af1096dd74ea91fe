use std::path::PathBuf;

use thiserror::Error;

use crate::computation::Terminal;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal errors returned by configuration and by a pipeline run.
///
/// A run that fails with any of these never leaves a destination file behind.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The origin file does not exist.
    #[error("origin .tsv file does not exist at: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The two header records are not a valid schema.
    #[error("format error: {message}")]
    Format { message: String },

    /// A SUM or STATS computation received an item it cannot accumulate.
    #[error("{terminal} on column '{column}' cannot use item '{item}': {fault}")]
    NumericType {
        column: String,
        terminal: Terminal,
        item: String,
        fault: NumericFault,
    },

    /// Invalid filter or aggregation configuration, detected before any I/O.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A configuration file line could not be parsed.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Any other I/O failure while reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Why a numeric computation rejected an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NumericFault {
    #[error("not a 64-bit integer")]
    NotALong,
    #[error("accumulator overflow")]
    Overflow,
}

/// A data record that does not match the schema.
///
/// Recoverable: the record is skipped and reported to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("record has {found} items but the schema declares {expected}")]
    WrongLength { expected: usize, found: usize },

    #[error("column '{column}' is declared long but holds '{item}'")]
    NotALong { column: String, item: String },
}
