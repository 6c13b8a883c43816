//! Uniform read access to a single package's files.
//!
//! A [`PackageFileSystem`] gives callers identical access to package content
//! whether the package lives as an extracted directory tree or as entries
//! inside a zip archive. Opened resources come back as seekable handles, so
//! byte-range reads work the same way over both backends; for archives this
//! means entries are decompressed into an addressable buffer first.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//!
//! use tokio_util::sync::CancellationToken;
//! use wharf_fs::{package_filesystem, PackageFileSystem, Result};
//! use wharf_core::Package;
//!
//! fn read_readme(package: &Package) -> Result<String> {
//!     let fs = package_filesystem(package, CancellationToken::new())?;
//!     let mut file = fs.open("docs/README.md")?;
//!     let mut readme = String::new();
//!     file.content.read_to_string(&mut readme).map_err(|err| {
//!         wharf_fs::FsError::IoError {
//!             action: "reading README".to_string(),
//!             source: err,
//!         }
//!     })?;
//!     Ok(readme)
//! }
//! ```

use std::{
    fmt,
    io::{Read, Seek},
    time::SystemTime,
};

use tokio_util::sync::CancellationToken;
use wharf_core::{Package, PackageLocation};

pub mod archive;
pub mod error;
pub mod extracted;

pub use archive::ZipFileSystem;
pub use error::{ErrorContext, FsError, Result};
pub use extracted::ExtractedFileSystem;

/// A readable, seekable content handle.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// An opened package resource.
pub struct PackageFile {
    /// Random-access handle over the resource's bytes.
    pub content: Box<dyn ReadSeek>,
    /// Size of the resource in bytes (uncompressed, for archived packages).
    pub size: u64,
    /// Last modification time of the backing file.
    pub modified: SystemTime,
}

impl fmt::Debug for PackageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The content handle is an opaque stream, only the metadata prints.
        f.debug_struct("PackageFile")
            .field("size", &self.size)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

/// Read-only view over a package's named resources.
///
/// Paths are relative to the package root, like `manifest.json` or
/// `docs/README.md`. Opening a path that does not resolve inside the
/// package fails with [`FsError::NotFound`].
pub trait PackageFileSystem: Send + Sync {
    fn open(&self, path: &str) -> Result<PackageFile>;
}

/// Builds the file system matching the package's storage location.
///
/// The cancellation token is observed by archive decompression; extracted
/// packages never block long enough to need it.
pub fn package_filesystem(
    package: &Package,
    cancel: CancellationToken,
) -> Result<Box<dyn PackageFileSystem>> {
    match &package.location {
        PackageLocation::Extracted { root } => {
            Ok(Box::new(ExtractedFileSystem::new(root.clone())))
        }
        PackageLocation::Archive { path } => {
            Ok(Box::new(ZipFileSystem::open_archive(path.clone(), cancel)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write, path::Path};

    use wharf_core::{Validation, MANIFEST_NAME};
    use zip::write::SimpleFileOptions;

    use super::*;

    const MANIFEST: &str = r#"{"name": "example", "version": "1.0.0"}"#;
    const README: &[u8] = b"# Example\n\nIdentical bytes on both backends.";

    fn write_extracted(dir: &Path) -> Package {
        let root = dir.join("example").join("1.0.0");
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join(MANIFEST_NAME), MANIFEST).unwrap();
        fs::write(root.join("docs/README.md"), README).unwrap();
        Package::from_extracted_dir(&root, Validation::Enabled).unwrap()
    }

    fn write_archived(dir: &Path) -> Package {
        let path = dir.join("example-1.0.0.zip");
        let file = fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        writer
            .start_file(format!("example-1.0.0/{MANIFEST_NAME}"), options)
            .unwrap();
        writer.write_all(MANIFEST.as_bytes()).unwrap();
        writer
            .start_file("example-1.0.0/docs/README.md", options)
            .unwrap();
        writer.write_all(README).unwrap();
        writer.finish().unwrap();

        let manifest = wharf_core::read_manifest(MANIFEST.as_bytes()).unwrap();
        Package::from_manifest(
            manifest,
            PackageLocation::Archive { path },
            Validation::Enabled,
        )
        .unwrap()
    }

    fn read_all(fs: &dyn PackageFileSystem, path: &str) -> Vec<u8> {
        let mut file = fs.open(path).unwrap();
        let mut content = Vec::new();
        file.content.read_to_end(&mut content).unwrap();
        content
    }

    #[test]
    fn test_backends_serve_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let extracted = write_extracted(dir.path());
        let archived = write_archived(dir.path());

        let extracted_fs = package_filesystem(&extracted, CancellationToken::new()).unwrap();
        let archived_fs = package_filesystem(&archived, CancellationToken::new()).unwrap();

        for path in ["manifest.json", "docs/README.md"] {
            assert_eq!(
                read_all(extracted_fs.as_ref(), path),
                read_all(archived_fs.as_ref(), path),
                "content differs for {path}"
            );
        }
    }

    #[test]
    fn test_package_file_debug_elides_content() {
        let dir = tempfile::tempdir().unwrap();
        let package = write_extracted(dir.path());
        let fs = package_filesystem(&package, CancellationToken::new()).unwrap();

        let file = fs.open("docs/README.md").unwrap();
        let repr = format!("{file:?}");
        assert!(repr.contains("size"));
        assert!(!repr.contains("content"));
    }
}
