//! Error types for the ClickHouse bulk loader.

use thiserror::Error;

use crate::schema::types::Dtype;
use crate::store::StoreError;

/// Main error type for the loader.
///
/// Every variant raised while a load is running is fatal: the pipeline
/// stops at the first error and never retries.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad table name, unknown primary key, bad type override.
    /// Always raised before the destination store is touched.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema creation failed for statement `{statement}`: {source}")]
    SchemaCreation {
        statement: String,
        #[source]
        source: StoreError,
    },

    #[error(
        "Batch {batch}: cannot cast value {value:?} in column '{column}' (row {row}) to {dtype}"
    )]
    Coercion {
        batch: usize,
        column: String,
        row: usize,
        value: String,
        dtype: Dtype,
    },

    #[error("Batch {batch}: columns {found:?} do not match the first batch's columns {expected:?}")]
    ColumnMismatch {
        batch: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Batch {batch}: insert failed: {source}")]
    Insertion {
        batch: usize,
        #[source]
        source: StoreError,
    },

    #[error("Batch {batch}: read failed: {message}")]
    Read { batch: usize, message: String },

    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Index of the batch the error is attributed to, if any.
    pub fn batch(&self) -> Option<usize> {
        match self {
            Error::Coercion { batch, .. }
            | Error::ColumnMismatch { batch, .. }
            | Error::Insertion { batch, .. }
            | Error::Read { batch, .. } => Some(*batch),
            _ => None,
        }
    }

    /// Returns true for errors caused by the caller's configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_configuration_display() {
        let error = Error::Configuration("primary key 'id' not found".to_string());
        assert_eq!(
            format!("{}", error),
            "Configuration error: primary key 'id' not found"
        );
    }

    #[test]
    fn test_error_coercion_display() {
        let error = Error::Coercion {
            batch: 1,
            column: "amount".to_string(),
            row: 7,
            value: "abc".to_string(),
            dtype: Dtype::Int64,
        };
        assert_eq!(
            format!("{}", error),
            "Batch 1: cannot cast value \"abc\" in column 'amount' (row 7) to int64"
        );
    }

    #[test]
    fn test_error_insertion_display() {
        let error = Error::Insertion {
            batch: 3,
            source: StoreError::Transport("connection refused".to_string()),
        };
        let message = format!("{}", error);
        assert!(message.starts_with("Batch 3: insert failed"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_error_batch_index() {
        let error = Error::Read {
            batch: 4,
            message: "bad quote".to_string(),
        };
        assert_eq!(error.batch(), Some(4));
        assert_eq!(Error::CsvParse("x".to_string()).batch(), None);
    }

    #[test]
    fn test_error_is_configuration() {
        assert!(Error::Configuration("x".to_string()).is_configuration());
        assert!(!Error::Serialization("x".to_string()).is_configuration());
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
        assert!(format!("{}", error).contains("file not found"));
    }
}
