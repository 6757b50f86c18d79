//! # Data Error Types
//!
//! Error types for loading operator data files.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io::Error / csv::Error / bad cell value                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DataError (this module) ← Adds file name and line                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError (shipmate-service) ← Startup fails loudly                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Data file errors.
#[derive(Debug, Error)]
pub enum DataError {
    /// File could not be opened or read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV structure is broken (wrong column count, bad encoding).
    ///
    /// ## When This Occurs
    /// - Missing header column
    /// - Row with fewer fields than the header
    /// - Non-numeric value in a numeric column
    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Row parsed but a value is not acceptable.
    #[error("{path} line {line}: {message}")]
    InvalidRow {
        path: String,
        line: u64,
        message: String,
    },
}

impl DataError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        DataError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_row(path: impl Into<String>, line: u64, message: impl Into<String>) -> Self {
        DataError::InvalidRow {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result type for data operations.
pub type DataResult<T> = Result<T, DataError>;

/// Line number of the record a csv reader just returned (1-based, header
/// included).
pub(crate) fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}
