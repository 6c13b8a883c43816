//! Package discovery and catalog queries for the wharf package catalog.
//!
//! This crate builds the in-memory catalog from heterogeneous storage
//! backends and answers filtered queries over it:
//!
//! - [`FileSystemIndexer`] discovers packages from extracted
//!   `<root>/<name>/<version>/...` trees or from `.zip` archives
//! - [`CombinedIndexer`] composes several indexers into one logical catalog
//! - [`Filter`] deterministically narrows a catalog to the response set for
//!   a query
//!
//! Initialization is one-time and blocking; afterwards the catalog is
//! immutable and any number of concurrent callers may query it without
//! synchronization.
//!
//! # Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use wharf_index::{FileSystemIndexer, Indexer};
//!
//! fn main() -> wharf_index::Result<()> {
//!     let cancel = CancellationToken::new();
//!     let mut indexer =
//!         FileSystemIndexer::for_extracted_packages(["/var/lib/wharf/packages"]);
//!     indexer.init(&cancel)?;
//!
//!     for package in &indexer.get(&cancel, None)? {
//!         println!("{} {}", package.name, package.version);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod filter;
pub mod indexer;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{IndexError, Result};
pub use filter::{Filter, GetOptions};
pub use indexer::{CombinedIndexer, FileSystemIndexer, Indexer};
pub use walk::{collect_indexed_paths, WalkDecision};
