//! File access for packages stored as zip archives.

use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{Cursor, ErrorKind, Read},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::SystemTime,
};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use wharf_core::MANIFEST_NAME;
use zip::{result::ZipError, ZipArchive};

use crate::{
    error::{ErrorContext, FsError, Result},
    PackageFile, PackageFileSystem,
};

/// Decompression copies this many bytes between cancellation checks.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// File system over a zip-archived package.
///
/// Archive entries are compressed and only sequentially decodable, so a
/// byte-range request cannot seek the compressed stream directly: the entry
/// is decompressed in full into an in-memory buffer first. Buffers are
/// cached for the lifetime of this value with compute-once semantics, so
/// concurrent first readers are serialized and every reader observes the
/// same bytes.
///
/// Two request shapes bypass entry lookup: a path matching the archive's
/// own file name serves the raw archive bytes (the downloadable artifact),
/// and a signature request (any path ending in `.sig`) reads the sibling
/// `<archive-name>.sig` file on the same storage root.
pub struct ZipFileSystem {
    archive_path: PathBuf,
    archive: Mutex<ZipArchive<File>>,
    /// Internal top-level folder of the archive, stripped when matching
    /// resource paths against entry names. Empty when entries sit at the
    /// archive root.
    prefix: String,
    modified: SystemTime,
    cache: Mutex<HashMap<String, Arc<[u8]>>>,
    cancel: CancellationToken,
}

impl ZipFileSystem {
    /// Opens the archive at `path` and prepares entry lookup.
    ///
    /// Fails with [`FsError::NotFound`] if the archive file is missing and
    /// [`FsError::CorruptArchive`] if it cannot be read as a zip archive.
    pub fn open_archive(path: impl Into<PathBuf>, cancel: CancellationToken) -> Result<Self> {
        let archive_path = path.into();

        let file = match File::open(&archive_path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FsError::NotFound {
                    path: archive_path.display().to_string(),
                });
            }
            Err(source) => {
                return Err(FsError::IoError {
                    action: format!("opening archive {}", archive_path.display()),
                    source,
                });
            }
        };
        let modified = file
            .metadata()
            .and_then(|metadata| metadata.modified())
            .with_context(|| format!("reading mtime of {}", archive_path.display()))?;

        let archive = ZipArchive::new(file).map_err(|source| {
            FsError::CorruptArchive {
                path: archive_path.clone(),
                source,
            }
        })?;
        let prefix = detect_prefix(&archive);

        Ok(ZipFileSystem {
            archive_path,
            archive: Mutex::new(archive),
            prefix,
            modified,
            cache: Mutex::new(HashMap::new()),
            cancel,
        })
    }

    /// Decompressed bytes of the entry backing `path`, cached after the
    /// first read.
    fn entry_bytes(&self, path: &str) -> Result<Arc<[u8]>> {
        // Holding the cache lock across decompression is what gives
        // compute-once semantics for concurrent first readers.
        let mut cache = self.cache.lock().map_err(|_| FsError::LockPoisoned)?;
        if let Some(bytes) = cache.get(path) {
            return Ok(bytes.clone());
        }

        let entry_name = format!("{}{}", self.prefix, path);
        let mut archive = self.archive.lock().map_err(|_| FsError::LockPoisoned)?;
        let mut entry = match archive.by_name(&entry_name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(FsError::NotFound {
                    path: path.to_string(),
                });
            }
            Err(source) => {
                return Err(FsError::CorruptArchive {
                    path: self.archive_path.clone(),
                    source,
                });
            }
        };

        let mut buffer = Vec::with_capacity(entry.size() as usize);
        let mut chunk = [0u8; COPY_CHUNK_SIZE];
        loop {
            if self.cancel.is_cancelled() {
                return Err(FsError::Cancelled);
            }
            let read = entry
                .read(&mut chunk)
                .with_context(|| format!("decompressing {entry_name}"))?;
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
        }
        debug!(
            "decompressed {} ({} bytes) from {}",
            entry_name,
            buffer.len(),
            self.archive_path.display()
        );

        let bytes: Arc<[u8]> = Arc::from(buffer);
        cache.insert(path.to_string(), bytes.clone());
        Ok(bytes)
    }

    /// Opens the archive file itself, compressed bytes as stored.
    fn open_artifact(&self) -> Result<PackageFile> {
        let file = File::open(&self.archive_path)
            .with_context(|| format!("opening artifact {}", self.archive_path.display()))?;
        let metadata = file
            .metadata()
            .with_context(|| format!("reading metadata of {}", self.archive_path.display()))?;

        Ok(PackageFile {
            size: metadata.len(),
            modified: self.modified,
            content: Box::new(file),
        })
    }

    /// Opens the detached signature sibling of the archive.
    fn open_signature(&self, path: &str) -> Result<PackageFile> {
        let mut sibling = self.archive_path.clone().into_os_string();
        sibling.push(".sig");
        let sibling = PathBuf::from(sibling);

        let file = match File::open(&sibling) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FsError::NotFound {
                    path: path.to_string(),
                });
            }
            Err(source) => {
                return Err(FsError::IoError {
                    action: format!("opening signature {}", sibling.display()),
                    source,
                });
            }
        };
        let metadata = file
            .metadata()
            .with_context(|| format!("reading metadata of {}", sibling.display()))?;
        let modified = metadata
            .modified()
            .with_context(|| format!("reading mtime of {}", sibling.display()))?;

        Ok(PackageFile {
            size: metadata.len(),
            modified,
            content: Box::new(file),
        })
    }
}

impl fmt::Debug for ZipFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipFileSystem")
            .field("archive_path", &self.archive_path)
            .field("prefix", &self.prefix)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

impl PackageFileSystem for ZipFileSystem {
    fn open(&self, path: &str) -> Result<PackageFile> {
        if path.ends_with(".sig") {
            return self.open_signature(path);
        }
        if self.archive_path.file_name().and_then(|name| name.to_str()) == Some(path) {
            return self.open_artifact();
        }

        let bytes = self.entry_bytes(path)?;
        Ok(PackageFile {
            size: bytes.len() as u64,
            modified: self.modified,
            content: Box::new(Cursor::new(bytes)),
        })
    }
}

/// Finds the archive's internal top-level folder from the location of its
/// manifest entry. An archive with the manifest at its root has no prefix.
fn detect_prefix(archive: &ZipArchive<File>) -> String {
    for name in archive.file_names() {
        if let Some(prefix) = name.strip_suffix(MANIFEST_NAME) {
            if prefix.is_empty() {
                return String::new();
            }
            // Only a single top-level folder counts as the package root.
            if prefix.ends_with('/') && prefix.matches('/').count() == 1 {
                return prefix.to_string();
            }
        }
    }
    String::new()
}
