//! Error types for the core crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while building and querying the package model.
#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("invalid version '{value}': {source}")]
    #[diagnostic(
        code(wharf_core::invalid_version),
        help("Versions must be strict semantic versions, like 1.0.2 or 1.3.0-beta.1")
    )]
    InvalidVersion {
        value: String,
        source: semver::Error,
    },

    #[error("invalid version constraint '{value}': {source}")]
    #[diagnostic(
        code(wharf_core::invalid_constraint),
        help("Constraints use semver range syntax, like ^7.9.0 or >=1.2.3")
    )]
    InvalidConstraint {
        value: String,
        source: semver::Error,
    },

    #[error(transparent)]
    #[diagnostic(
        code(wharf_core::manifest),
        help("The package manifest may be corrupted or in an invalid format")
    )]
    Manifest(#[from] serde_json::Error),

    #[error("package validation failed: {0}")]
    #[diagnostic(code(wharf_core::validation))]
    Validation(String),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf_core::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            CoreError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
