//! Error types for the package file system crate.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;
use wharf_core::CoreError;

/// Errors that can occur while opening package content.
#[derive(Error, Diagnostic, Debug)]
pub enum FsError {
    /// The path does not resolve inside the package (or to a signature
    /// sibling). Never fatal; maps to a "does not exist" outcome.
    #[error("resource not found: {path}")]
    #[diagnostic(code(wharf_fs::not_found))]
    NotFound { path: String },

    #[error("corrupt archive {}: {source}", path.display())]
    #[diagnostic(
        code(wharf_fs::corrupt_archive),
        help("The zip file may be truncated or not a zip archive at all")
    )]
    CorruptArchive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("operation cancelled")]
    #[diagnostic(code(wharf_fs::cancelled))]
    Cancelled,

    #[error("lock poisoned")]
    #[diagnostic(
        code(wharf_fs::poison),
        help("This is an internal error, please report it")
    )]
    LockPoisoned,

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf_fs::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] CoreError),
}

/// A specialized Result type for package file access.
pub type Result<T> = std::result::Result<T, FsError>;

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
            FsError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
