//! Directory traversal with explicit control flow.
//!
//! The walker hands every entry to a visitor and acts on a three-way
//! [`WalkDecision`] instead of overloading an error value as a "skip this
//! subtree" sentinel. Entries are visited in lexical order so discovery
//! order is deterministic across platforms.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tokio_util::sync::CancellationToken;

use crate::error::{IndexError, Result};

/// What to do with a visited entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkDecision {
    /// Keep walking. Descends into directories; a no-op for files.
    Descend,
    /// Ignore this entry and everything beneath it.
    SkipSubtree,
    /// Record this path. Its whole subtree belongs to it and is not
    /// walked further.
    Index,
}

/// The visitor sees each entry's absolute path and whether it is a directory.
/// Returning an error aborts the walk.
pub type WalkVisitor<'a> = dyn FnMut(&Path, bool) -> Result<WalkDecision> + 'a;

/// Walks `root` and collects the paths the visitor marked [`WalkDecision::Index`].
///
/// A nonexistent root contributes zero paths; any other I/O failure aborts
/// with [`IndexError::IndexingFailure`]. Cancellation is checked per entry.
pub fn collect_indexed_paths(
    root: &Path,
    cancel: &CancellationToken,
    visit: &mut WalkVisitor<'_>,
) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if !root.exists() {
        return Ok(found);
    }
    walk_dir(root, cancel, visit, &mut found)?;
    Ok(found)
}

fn walk_dir(
    dir: &Path,
    cancel: &CancellationToken,
    visit: &mut WalkVisitor<'_>,
    found: &mut Vec<PathBuf>,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|source| {
        IndexError::IndexingFailure {
            path: dir.to_path_buf(),
            source,
        }
    })?;

    let mut entries: Vec<fs::DirEntry> = entries
        .collect::<std::io::Result<_>>()
        .map_err(|source| {
            IndexError::IndexingFailure {
                path: dir.to_path_buf(),
                source,
            }
        })?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        let path = entry.path();
        let is_dir = entry
            .file_type()
            .map_err(|source| {
                IndexError::IndexingFailure {
                    path: path.clone(),
                    source,
                }
            })?
            .is_dir();

        match visit(&path, is_dir)? {
            WalkDecision::Index => found.push(path),
            WalkDecision::SkipSubtree => {}
            WalkDecision::Descend => {
                if is_dir {
                    walk_dir(&path, cancel, visit, found)?;
                }
            }
        }
    }
    Ok(())
}
