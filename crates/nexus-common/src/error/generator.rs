//! Generator error types.
//!
//! Provides the error taxonomy shared by every selection, assembly and plan
//! building step.

use std::fmt;
use thiserror::Error;

use crate::types::{ColumnId, TableId};

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal invariant violated (bug or exhausted retry budget).
    Unexpected = 0x0001,
    /// Value or type outside the supported set.
    NotSupported = 0x0002,
    /// Invalid or empty argument provided.
    InvalidArgument = 0x0003,
    /// Normal end of a sequence.
    IterEnd = 0x0004,
    /// General I/O error.
    Io = 0x0005,

    // Catalog errors (0x0100 - 0x01FF)
    /// Name or id not found in the schema catalog.
    SchemaError = 0x0100,
    /// No eligible candidate to choose from.
    EntryNotExist = 0x0101,

    // Request errors (0x0200 - 0x02FF)
    /// An append would exceed a size bound.
    SizeOverflow = 0x0200,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Catalog",
            0x02 => "Request",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for the workload generator.
///
/// Every multi-step assembly returns the first error it hits; partially
/// populated requests must be discarded by the caller.
///
/// # Example
///
/// ```rust
/// use nexus_common::error::{ErrorCode, NexusError, NexusResult};
///
/// fn lookup(name: &str) -> NexusResult<u64> {
///     Err(NexusError::TableNotFound { table: name.to_string() })
/// }
///
/// assert_eq!(lookup("t1").unwrap_err().code(), ErrorCode::SchemaError);
/// ```
#[derive(Debug, Error)]
pub enum NexusError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - an invariant of the generator was violated.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Operation not supported.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// End of a cursor. Not a failure; drain loops translate it to success.
    #[error("iterator end")]
    IterEnd,

    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    // ==========================================================================
    // Catalog Errors
    // ==========================================================================
    /// Table not found by name.
    #[error("table '{table}' not found")]
    TableNotFound {
        /// The missing table.
        table: String,
    },

    /// Table not found by id.
    #[error("table id {table_id} not found")]
    TableIdNotFound {
        /// The missing table id.
        table_id: TableId,
    },

    /// Column not found by name.
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// The missing column.
        column: String,
        /// The table name.
        table: String,
    },

    /// Column not found by id.
    #[error("column id {column_id} not found in table id {table_id}")]
    ColumnIdNotFound {
        /// The table id.
        table_id: TableId,
        /// The missing column id.
        column_id: ColumnId,
    },

    /// Other catalog inconsistency.
    #[error("schema error: {message}")]
    Schema {
        /// Error message.
        message: String,
    },

    /// Nothing eligible to choose from.
    #[error("entry not exist: {what}")]
    EntryNotExist {
        /// What was being chosen.
        what: String,
    },

    // ==========================================================================
    // Request Errors
    // ==========================================================================
    /// A size bound would be exceeded.
    #[error("size overflow: {size} bytes exceeds limit {limit}")]
    SizeOverflow {
        /// Size the operation would reach.
        size: usize,
        /// The bound.
        limit: usize,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl NexusError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Unexpected,
            Self::NotSupported { .. } => ErrorCode::NotSupported,
            Self::InvalidArgument { .. } | Self::InvalidConfig { .. } => {
                ErrorCode::InvalidArgument
            }
            Self::IterEnd => ErrorCode::IterEnd,
            Self::Io { .. } => ErrorCode::Io,
            Self::TableNotFound { .. }
            | Self::TableIdNotFound { .. }
            | Self::ColumnNotFound { .. }
            | Self::ColumnIdNotFound { .. }
            | Self::Schema { .. } => ErrorCode::SchemaError,
            Self::EntryNotExist { .. } => ErrorCode::EntryNotExist,
            Self::SizeOverflow { .. } => ErrorCode::SizeOverflow,
        }
    }

    /// Returns true if this error is the normal end-of-sequence signal.
    #[must_use]
    pub const fn is_iter_end(&self) -> bool {
        matches!(self, Self::IterEnd)
    }

    /// Returns true if this error is a catalog lookup failure.
    #[must_use]
    pub const fn is_schema_error(&self) -> bool {
        matches!(self.code(), ErrorCode::SchemaError)
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not-supported error.
    #[must_use]
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Creates a schema error.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates an entry-not-exist error.
    #[must_use]
    pub fn entry_not_exist(what: impl Into<String>) -> Self {
        Self::EntryNotExist { what: what.into() }
    }
}

/// Maps the end-of-sequence signal to success.
///
/// Cursor drain loops run until they see [`NexusError::IterEnd`]; callers
/// that only needed to exhaust the sequence use this to report success.
pub trait IterEndExt {
    /// Converts `Err(IterEnd)` into `Ok(())`, passing other errors through.
    ///
    /// # Errors
    ///
    /// Returns any error other than [`NexusError::IterEnd`].
    fn ignore_iter_end(self) -> Result<(), NexusError>;
}

impl IterEndExt for Result<(), NexusError> {
    fn ignore_iter_end(self) -> Result<(), NexusError> {
        match self {
            Err(NexusError::IterEnd) => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = NexusError::TableIdNotFound {
            table_id: TableId::new(42),
        };
        assert_eq!(err.code(), ErrorCode::SchemaError);
        assert_eq!(err.code().category(), "Catalog");
    }

    #[test]
    fn test_error_display() {
        let err = NexusError::ColumnNotFound {
            column: "v".to_string(),
            table: "t".to_string(),
        };
        assert_eq!(err.to_string(), "column 'v' not found in table 't'");

        let err = NexusError::SizeOverflow {
            size: 300,
            limit: 256,
        };
        assert_eq!(err.to_string(), "size overflow: 300 bytes exceeds limit 256");
    }

    #[test]
    fn test_schema_family() {
        assert!(NexusError::schema("broken").is_schema_error());
        assert!(NexusError::TableNotFound {
            table: "t".into()
        }
        .is_schema_error());
        assert!(!NexusError::entry_not_exist("table").is_schema_error());
    }

    #[test]
    fn test_ignore_iter_end() {
        let drained: Result<(), NexusError> = Err(NexusError::IterEnd);
        assert!(drained.ignore_iter_end().is_ok());

        let failed: Result<(), NexusError> = Err(NexusError::internal("boom"));
        let err = failed.ignore_iter_end().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unexpected);
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let nexus_err: NexusError = io_err.into();
        assert_eq!(nexus_err.code(), ErrorCode::Io);
    }
}
