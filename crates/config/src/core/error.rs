//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An argument passed to an operation was rejected
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message describing the rejected argument
        message: String,
    },

    /// A source with the same id is already registered
    #[error("Configuration source already registered: {id}")]
    DuplicateSource {
        /// Id of the rejected source
        id: String,
    },

    /// No source is registered under the given id
    #[error("Configuration source not found: {id}")]
    SourceNotFound {
        /// Id that was looked up
        id: String,
    },

    /// A typed accessor was used against a value of another kind
    #[error("Type mismatch at '{path}': expected {expected}, found {actual}")]
    TypeMismatch {
        /// Path of the offending value
        path: String,
        /// Expected kind
        expected: String,
        /// Kind actually stored
        actual: String,
    },

    /// Nothing is stored at the path and no default was supplied
    #[error("Configuration path not found: {path}")]
    PathNotFound {
        /// Path that was looked up
        path: String,
    },

    /// The aggregator was closed
    #[error("Configuration has been closed")]
    Closed,

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the configuration file
        path: PathBuf,
    },

    /// Configuration file read error
    #[error("Failed to read configuration file {path}: {message}")]
    FileReadError {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration content could not be decoded
    #[error("Failed to parse configuration {origin}: {message}")]
    ParseError {
        /// File path or decoder name the content came from
        origin: String,
        /// Error message describing the parse failure
        message: String,
    },

    /// Configuration format not supported
    #[error("Configuration format not supported: {format}")]
    FormatNotSupported {
        /// Format that is not supported
        format: String,
    },

    /// Source-specific failure
    #[error("Configuration source error ({origin}): {message}")]
    SourceError {
        /// Error message describing the source error
        message: String,
        /// Origin of the failure
        origin: String,
    },
}

impl ConfigError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a duplicate source error
    pub fn duplicate_source(id: impl Into<String>) -> Self {
        Self::DuplicateSource { id: id.into() }
    }

    /// Create a source not found error
    pub fn source_not_found(id: impl Into<String>) -> Self {
        Self::SourceNotFound { id: id.into() }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a file read error
    pub fn file_read_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileReadError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse_error(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Create a format not supported error
    pub fn format_not_supported(format: impl Into<String>) -> Self {
        Self::FormatNotSupported {
            format: format.into(),
        }
    }

    /// Create a source error
    pub fn source_error(message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::SourceError {
            message: message.into(),
            origin: origin.into(),
        }
    }

    /// Check if error is recoverable
    ///
    /// Lookup failures and missing files may resolve themselves once the
    /// backing data changes; structural misuse never does.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConfigError::PathNotFound { .. }
                | ConfigError::FileNotFound { .. }
                | ConfigError::FileReadError { .. }
        )
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConfigError::InvalidArgument { .. }
            | ConfigError::DuplicateSource { .. }
            | ConfigError::SourceNotFound { .. }
            | ConfigError::Closed => ErrorCategory::Registry,
            ConfigError::TypeMismatch { .. } | ConfigError::PathNotFound { .. } => {
                ErrorCategory::Access
            }
            ConfigError::FileNotFound { .. } | ConfigError::FileReadError { .. } => {
                ErrorCategory::Io
            }
            ConfigError::ParseError { .. } | ConfigError::FormatNotSupported { .. } => {
                ErrorCategory::Parse
            }
            ConfigError::SourceError { .. } => ErrorCategory::Source,
        }
    }
}

/// Error category for grouping errors
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Misuse of the source or observer registry
    Registry,
    /// Failed lookup or typed access
    Access,
    /// I/O error
    Io,
    /// Parse error
    Parse,
    /// Failure reported by a source implementation
    Source,
}
