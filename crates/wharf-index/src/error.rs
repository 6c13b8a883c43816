//! Error types for the indexing crate.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;
use wharf_core::CoreError;
use wharf_fs::FsError;

/// Errors that can occur while discovering packages and answering queries.
#[derive(Error, Diagnostic, Debug)]
pub enum IndexError {
    /// A root could not be walked. Fatal to `init`; discovery never starts
    /// serving a partially-scanned catalog.
    #[error("listing packages failed (path: {})", path.display())]
    #[diagnostic(
        code(wharf_index::indexing_failure),
        help("Check that the package root is a readable directory")
    )]
    IndexingFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A discovered package-version path could not be turned into a package.
    #[error("loading package failed (path: {})", path.display())]
    #[diagnostic(code(wharf_index::package_load))]
    PackageLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("operation cancelled")]
    #[diagnostic(code(wharf_index::cancelled))]
    Cancelled,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fs(#[from] FsError),
}

/// A specialized Result type for indexing operations.
pub type Result<T> = std::result::Result<T, IndexError>;
