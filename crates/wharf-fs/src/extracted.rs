//! File access for packages extracted as directory trees.

use std::{
    fs::File,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use crate::{
    error::{ErrorContext, FsError, Result},
    PackageFile, PackageFileSystem,
};

/// File system over an extracted package-version directory.
///
/// Paths map directly to files under the package root; range reads are
/// ordinary file seeks.
pub struct ExtractedFileSystem {
    root: PathBuf,
}

impl ExtractedFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ExtractedFileSystem { root: root.into() }
    }

    /// Resolves a relative resource path under the root.
    ///
    /// Absolute paths and paths escaping the root via `..` do not resolve
    /// inside the package.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if relative.is_absolute() {
            return None;
        }
        if relative
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl PackageFileSystem for ExtractedFileSystem {
    fn open(&self, path: &str) -> Result<PackageFile> {
        let full_path = self.resolve(path).ok_or_else(|| {
            FsError::NotFound {
                path: path.to_string(),
            }
        })?;

        let file = match File::open(&full_path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FsError::NotFound {
                    path: path.to_string(),
                });
            }
            Err(source) => {
                return Err(FsError::IoError {
                    action: format!("opening {}", full_path.display()),
                    source,
                });
            }
        };

        let metadata = file
            .metadata()
            .with_context(|| format!("reading metadata of {}", full_path.display()))?;
        if !metadata.is_file() {
            return Err(FsError::NotFound {
                path: path.to_string(),
            });
        }
        let modified = metadata
            .modified()
            .with_context(|| format!("reading mtime of {}", full_path.display()))?;

        Ok(PackageFile {
            size: metadata.len(),
            modified,
            content: Box::new(file),
        })
    }
}
