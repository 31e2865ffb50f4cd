//! Unified error types for fretpath.
//!
//! Only programmer errors and infrastructure failures are errors. A brand-new
//! skill tree, a compound with no statistics, or a candidate with no related
//! history are modelled as default values inside the engine, never as errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fretpath operations.
#[derive(Error, Debug)]
pub enum FretpathError {
    /// I/O errors from the progress snapshot or attempt log.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// A compound could not be parsed or names an unknown dimension value.
    #[error("invalid compound: {message}")]
    InvalidCompound { message: String },

    /// Invalid call arguments (bad speed score, mismatched selector input).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The selector was handed nothing to choose from.
    #[error("Cannot select from empty set")]
    EmptySelection,
}

/// A specialized Result type for fretpath operations.
pub type Result<T> = std::result::Result<T, FretpathError>;

impl FretpathError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid compound error.
    pub fn invalid_compound(message: impl Into<String>) -> Self {
        Self::InvalidCompound {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCompound { .. } | Self::InvalidInput { .. } | Self::EmptySelection
        )
    }
}

impl From<io::Error> for FretpathError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for FretpathError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Used on paths where a missing or unreadable auxiliary file should degrade
/// to a default instead of aborting the command.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the fretpath CLI.
pub mod exit_codes {
    /// The command succeeded.
    pub const SUCCESS: i32 = 0;

    /// The command failed because of the environment (I/O, config).
    pub const FAILURE: i32 = 1;

    /// The command was given invalid input.
    pub const USAGE: i32 = 2;
}
