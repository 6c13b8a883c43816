//! Package discovery and the in-memory catalog.
//!
//! An [`Indexer`] scans its roots once during [`Indexer::init`] and serves
//! the resulting immutable catalog from memory afterwards; `get` never goes
//! back to disk. Re-running `init` rebuilds the catalog wholesale and swaps
//! it in, it never mutates the old one in place.

use std::{
    collections::HashSet,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wharf_core::{
    read_manifest, version, Package, PackageLocation, Packages, Validation, MANIFEST_NAME,
};
use wharf_fs::{PackageFileSystem, ZipFileSystem};

use crate::{
    error::{IndexError, Result},
    filter::GetOptions,
    walk::{collect_indexed_paths, WalkDecision},
};

/// Discovers packages from a storage backend and answers catalog queries.
pub trait Indexer: Send + Sync {
    /// Scans the roots and builds the catalog. Must be called before `get`.
    fn init(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Returns the catalog, filtered when the options carry a filter.
    ///
    /// Passing no options (or options without a filter) returns the raw
    /// catalog, internal and experimental entries included.
    fn get(&self, cancel: &CancellationToken, options: Option<&GetOptions>) -> Result<Packages>;
}

/// Which physical representation an indexer's roots hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageKind {
    /// `<root>/<name>/<version>/...` directory trees.
    Extracted,
    /// `.zip` archives anywhere under the roots.
    ZipArchives,
}

/// Indexes packages from one or more filesystem roots.
///
/// Root order is significant: when the same (name, version) is discovered
/// under more than one root, the first discovery wins and later duplicates
/// are logged and dropped.
pub struct FileSystemIndexer {
    paths: Vec<PathBuf>,
    kind: StorageKind,
    validation: Validation,
    label: &'static str,
    catalog: Packages,
}

impl FileSystemIndexer {
    /// An indexer over extracted `<root>/<name>/<version>/...` trees.
    pub fn for_extracted_packages<P>(paths: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<PathBuf>,
    {
        Self::new(StorageKind::Extracted, "FileSystemIndexer", paths)
    }

    /// An indexer over `.zip` package archives found under the roots.
    pub fn for_zip_archives<P>(paths: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<PathBuf>,
    {
        Self::new(StorageKind::ZipArchives, "ZipFileSystemIndexer", paths)
    }

    fn new<P>(kind: StorageKind, label: &'static str, paths: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<PathBuf>,
    {
        FileSystemIndexer {
            paths: paths.into_iter().map(Into::into).collect(),
            kind,
            validation: Validation::default(),
            label,
            catalog: Packages::new(),
        }
    }

    /// Overrides the validation mode threaded into package construction.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    fn scan(&self, cancel: &CancellationToken) -> Result<Packages> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut catalog = Packages::new();

        for base in &self.paths {
            debug!("{}: scanning {}", self.label, base.display());
            let found = self.discover(base, cancel)?;

            info!("packages in {}:", base.display());
            for path in found {
                if cancel.is_cancelled() {
                    return Err(IndexError::Cancelled);
                }
                let package = self.load_package(&path, cancel)?;

                let key = (package.name.clone(), package.version.clone());
                if !seen.insert(key) {
                    info!(
                        "{:<20}\t{:>10}\t{}",
                        format!("{} (duplicated)", package.name),
                        package.version,
                        package.location.base_path().display()
                    );
                    continue;
                }

                info!(
                    "{:<20}\t{:>10}\t{}",
                    package.name,
                    package.version,
                    package.location.base_path().display()
                );
                catalog.push(Arc::new(package));
            }
        }
        Ok(catalog)
    }

    fn discover(&self, base: &Path, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        match self.kind {
            StorageKind::Extracted => {
                collect_indexed_paths(base, cancel, &mut |path, is_dir| {
                    Ok(visit_extracted(base, path, is_dir))
                })
            }
            StorageKind::ZipArchives => {
                collect_indexed_paths(base, cancel, &mut |path, is_dir| {
                    Ok(visit_archive(path, is_dir))
                })
            }
        }
    }

    fn load_package(&self, path: &Path, cancel: &CancellationToken) -> Result<Package> {
        self.build_package(path, cancel).map_err(|source| {
            IndexError::PackageLoad {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn build_package(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<Package, Box<dyn std::error::Error + Send + Sync>> {
        match self.kind {
            StorageKind::Extracted => Ok(Package::from_extracted_dir(path, self.validation)?),
            StorageKind::ZipArchives => {
                // Name, version and all other metadata come from the
                // embedded manifest, not from any path convention.
                let fs = ZipFileSystem::open_archive(path, cancel.clone())?;
                let mut manifest_file = fs.open(MANIFEST_NAME)?;
                let manifest = read_manifest(&mut manifest_file.content)?;
                Ok(Package::from_manifest(
                    manifest,
                    PackageLocation::Archive {
                        path: path.to_path_buf(),
                    },
                    self.validation,
                )?)
            }
        }
    }
}

/// Walk decision for the extracted layout: descend until the second path
/// segment, gate it on strict semver, and treat everything else as a stray
/// artifact to warn about and skip.
fn visit_extracted(base: &Path, path: &Path, is_dir: bool) -> WalkDecision {
    let Ok(relative) = path.strip_prefix(base) else {
        return WalkDecision::SkipSubtree;
    };

    let mut segments = relative.components();
    let (Some(_name), Some(version_segment)) = (segments.next(), segments.next()) else {
        // Not yet at package-version depth.
        return WalkDecision::Descend;
    };

    if !is_dir {
        // Stray files (a leftover .DS_Store, for instance) must not break
        // indexing of sibling packages.
        warn!("unexpected file: {}, ignoring", path.display());
        return WalkDecision::SkipSubtree;
    }

    let version_dir = version_segment.as_os_str().to_str();
    if !version_dir.is_some_and(|dir| version::parse_strict(dir).is_ok()) {
        warn!("unexpected directory: {}, ignoring", path.display());
        return WalkDecision::SkipSubtree;
    }

    // This directory is a package-version root; its whole subtree belongs
    // to the package.
    WalkDecision::Index
}

/// Walk decision for archive roots: files with a `.zip` suffix that
/// actually open as zip archives.
fn visit_archive(path: &Path, is_dir: bool) -> WalkDecision {
    if is_dir {
        return WalkDecision::Descend;
    }
    if path.extension().and_then(|ext| ext.to_str()) != Some("zip") {
        return WalkDecision::SkipSubtree;
    }

    let openable = File::open(path)
        .map_err(zip::result::ZipError::Io)
        .and_then(zip::ZipArchive::new);
    match openable {
        Ok(_) => WalkDecision::Index,
        Err(err) => {
            // One corrupt archive must never abort indexing of the rest.
            warn!(
                "zip file cannot be opened as zip: {}, ignoring: {err}",
                path.display()
            );
            WalkDecision::SkipSubtree
        }
    }
}

impl Indexer for FileSystemIndexer {
    fn init(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.catalog = self.scan(cancel)?;
        Ok(())
    }

    fn get(&self, cancel: &CancellationToken, options: Option<&GetOptions>) -> Result<Packages> {
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }
        match options.and_then(|options| options.filter.as_ref()) {
            Some(filter) => Ok(filter.apply(&self.catalog)),
            None => Ok(self.catalog.clone()),
        }
    }
}

/// Composes an ordered list of child indexers into one logical catalog.
pub struct CombinedIndexer {
    indexers: Vec<Box<dyn Indexer>>,
}

impl CombinedIndexer {
    pub fn new(indexers: Vec<Box<dyn Indexer>>) -> Self {
        CombinedIndexer { indexers }
    }
}

impl Indexer for CombinedIndexer {
    /// Initializes each child in order; the first failure aborts the whole
    /// operation (no partial startup).
    fn init(&mut self, cancel: &CancellationToken) -> Result<()> {
        for indexer in &mut self.indexers {
            indexer.init(cancel)?;
        }
        Ok(())
    }

    /// Concatenates each child's raw catalog in child order, then filters
    /// the joined result once.
    ///
    /// No cross-child deduplication happens here: if two children both
    /// produce an entry for the same (name, version), both appear unless
    /// the filter's version selection collapses them. Filtering after the
    /// join is what lets that collapse see entries from different children.
    fn get(&self, cancel: &CancellationToken, options: Option<&GetOptions>) -> Result<Packages> {
        let mut all = Packages::new();
        for indexer in &self.indexers {
            all = all.join(indexer.get(cancel, None)?);
        }
        match options.and_then(|options| options.filter.as_ref()) {
            Some(filter) => Ok(filter.apply(&all)),
            None => Ok(all),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::filter::Filter;
    use crate::test_utils::{
        manifest_json, write_package_dir, write_package_dir_with_manifest, write_zip_package,
    };

    fn names_and_versions(packages: &Packages) -> Vec<(String, String)> {
        packages
            .iter()
            .map(|p| (p.name.clone(), p.version.clone()))
            .collect()
    }

    #[test]
    fn test_extracted_indexer_discovers_versions() {
        let dir = tempfile::tempdir().unwrap();
        write_package_dir(dir.path(), "example", "0.0.2");
        write_package_dir(dir.path(), "example", "1.0.0");
        write_package_dir(dir.path(), "other", "0.1.0");

        let mut indexer = FileSystemIndexer::for_extracted_packages([dir.path()]);
        indexer.init(&CancellationToken::new()).unwrap();

        let packages = indexer.get(&CancellationToken::new(), None).unwrap();
        assert_eq!(
            names_and_versions(&packages),
            vec![
                ("example".to_string(), "0.0.2".to_string()),
                ("example".to_string(), "1.0.0".to_string()),
                ("other".to_string(), "0.1.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_extracted_indexer_skips_non_version_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_package_dir(dir.path(), "example", "1.0.0");
        fs::create_dir_all(dir.path().join("foo").join("not-a-version")).unwrap();
        // A stray file at package depth must be tolerated too.
        fs::write(dir.path().join("example").join(".DS_Store"), b"junk").unwrap();

        let mut indexer = FileSystemIndexer::for_extracted_packages([dir.path()]);
        indexer.init(&CancellationToken::new()).unwrap();

        let packages = indexer.get(&CancellationToken::new(), None).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages.get(0).unwrap().name, "example");
    }

    #[test]
    fn test_extracted_indexer_first_root_wins_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let first_root = dir.path().join("first");
        let second_root = dir.path().join("second");
        write_package_dir_with_manifest(
            &first_root,
            "example",
            "1.0.0",
            &serde_json::json!({
                "name": "example",
                "version": "1.0.0",
                "title": "From First Root"
            })
            .to_string(),
        );
        write_package_dir_with_manifest(
            &second_root,
            "example",
            "1.0.0",
            &serde_json::json!({
                "name": "example",
                "version": "1.0.0",
                "title": "From Second Root"
            })
            .to_string(),
        );

        let mut indexer =
            FileSystemIndexer::for_extracted_packages([&first_root, &second_root]);
        indexer.init(&CancellationToken::new()).unwrap();

        let packages = indexer.get(&CancellationToken::new(), None).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(
            packages.get(0).unwrap().title.as_deref(),
            Some("From First Root")
        );
    }

    #[test]
    fn test_extracted_indexer_tolerates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        write_package_dir(dir.path(), "example", "1.0.0");

        let mut indexer = FileSystemIndexer::for_extracted_packages([
            dir.path().join("does-not-exist"),
            dir.path().to_path_buf(),
        ]);
        indexer.init(&CancellationToken::new()).unwrap();
        assert_eq!(
            indexer.get(&CancellationToken::new(), None).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_extracted_indexer_broken_manifest_aborts_init() {
        let dir = tempfile::tempdir().unwrap();
        write_package_dir_with_manifest(dir.path(), "example", "1.0.0", "{not json");

        let mut indexer = FileSystemIndexer::for_extracted_packages([dir.path()]);
        let err = indexer.init(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, IndexError::PackageLoad { .. }));
    }

    #[test]
    fn test_no_filter_differs_from_default_filter() {
        let dir = tempfile::tempdir().unwrap();
        write_package_dir(dir.path(), "plain", "1.0.0");
        write_package_dir_with_manifest(
            dir.path(),
            "hidden",
            "1.0.0",
            &serde_json::json!({
                "name": "hidden",
                "version": "1.0.0",
                "internal": true
            })
            .to_string(),
        );
        write_package_dir_with_manifest(
            dir.path(),
            "edgy",
            "1.0.0",
            &serde_json::json!({
                "name": "edgy",
                "version": "1.0.0",
                "release": "experimental"
            })
            .to_string(),
        );

        let mut indexer = FileSystemIndexer::for_extracted_packages([dir.path()]);
        indexer.init(&CancellationToken::new()).unwrap();
        let cancel = CancellationToken::new();

        // No filter at all: the raw catalog.
        assert_eq!(indexer.get(&cancel, None).unwrap().len(), 3);
        let no_filter = GetOptions::default();
        assert_eq!(indexer.get(&cancel, Some(&no_filter)).unwrap().len(), 3);

        // A zero-value filter actively excludes internal and experimental.
        let default_filter = GetOptions {
            filter: Some(Filter::default()),
        };
        let filtered = indexer.get(&cancel, Some(&default_filter)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get(0).unwrap().name, "plain");
    }

    #[test]
    fn test_zip_indexer_skips_corrupt_archives() {
        let dir = tempfile::tempdir().unwrap();
        write_zip_package(dir.path(), "example", "1.0.1");
        write_zip_package(dir.path(), "other", "0.2.0");
        fs::write(dir.path().join("broken.zip"), b"not a zip archive").unwrap();
        fs::write(dir.path().join("notes.txt"), b"not even a zip").unwrap();

        let mut indexer = FileSystemIndexer::for_zip_archives([dir.path()]);
        indexer.init(&CancellationToken::new()).unwrap();

        let packages = indexer.get(&CancellationToken::new(), None).unwrap();
        assert_eq!(
            names_and_versions(&packages),
            vec![
                ("example".to_string(), "1.0.1".to_string()),
                ("other".to_string(), "0.2.0".to_string()),
            ]
        );
        for package in &packages {
            assert!(matches!(
                package.location,
                PackageLocation::Archive { .. }
            ));
        }
    }

    #[test]
    fn test_zip_indexer_metadata_comes_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        // Archive file name does not follow any convention; the manifest
        // inside is authoritative.
        let conventional = write_zip_package(dir.path(), "example", "1.0.1");
        fs::rename(conventional, dir.path().join("whatever.zip")).unwrap();

        let mut indexer = FileSystemIndexer::for_zip_archives([dir.path()]);
        indexer.init(&CancellationToken::new()).unwrap();

        let packages = indexer.get(&CancellationToken::new(), None).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages.get(0).unwrap().name, "example");
        assert_eq!(packages.get(0).unwrap().version, "1.0.1");
    }

    #[test]
    fn test_combined_indexer_concatenates_in_child_order() {
        let dir = tempfile::tempdir().unwrap();
        let extracted_root = dir.path().join("extracted");
        let archive_root = dir.path().join("archives");
        fs::create_dir_all(&archive_root).unwrap();
        write_package_dir(&extracted_root, "alpha", "1.0.0");
        write_zip_package(&archive_root, "zulu", "2.0.0");
        // The same (name, version) in both children is preserved twice.
        write_zip_package(&archive_root, "alpha", "1.0.0");

        let mut indexer = CombinedIndexer::new(vec![
            Box::new(FileSystemIndexer::for_extracted_packages([&extracted_root])),
            Box::new(FileSystemIndexer::for_zip_archives([&archive_root])),
        ]);
        indexer.init(&CancellationToken::new()).unwrap();

        let packages = indexer.get(&CancellationToken::new(), None).unwrap();
        assert_eq!(
            names_and_versions(&packages),
            vec![
                ("alpha".to_string(), "1.0.0".to_string()),
                ("alpha".to_string(), "1.0.0".to_string()),
                ("zulu".to_string(), "2.0.0".to_string()),
            ]
        );

        // The filter's version selection sees both children at once and
        // collapses the overlap.
        let options = GetOptions {
            filter: Some(Filter::default()),
        };
        let filtered = indexer
            .get(&CancellationToken::new(), Some(&options))
            .unwrap();
        assert_eq!(
            names_and_versions(&filtered),
            vec![
                ("alpha".to_string(), "1.0.0".to_string()),
                ("zulu".to_string(), "2.0.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_combined_indexer_init_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let good_root = dir.path().join("good");
        write_package_dir(&good_root, "example", "1.0.0");
        let bad_root = dir.path().join("bad-root");
        fs::write(&bad_root, b"a file where a directory should be").unwrap();

        let mut indexer = CombinedIndexer::new(vec![
            Box::new(FileSystemIndexer::for_extracted_packages([&bad_root])),
            Box::new(FileSystemIndexer::for_extracted_packages([&good_root])),
        ]);
        let err = indexer.init(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, IndexError::IndexingFailure { .. }));
    }

    #[test]
    fn test_reinit_swaps_catalog() {
        let dir = tempfile::tempdir().unwrap();
        write_package_dir(dir.path(), "example", "1.0.0");

        let mut indexer = FileSystemIndexer::for_extracted_packages([dir.path()]);
        let cancel = CancellationToken::new();
        indexer.init(&cancel).unwrap();
        assert_eq!(indexer.get(&cancel, None).unwrap().len(), 1);

        write_package_dir(dir.path(), "example", "1.1.0");
        indexer.init(&cancel).unwrap();
        assert_eq!(indexer.get(&cancel, None).unwrap().len(), 2);
    }

    #[test]
    fn test_get_with_manifest_json_helper() {
        // Guard against the fixture helper and the indexer disagreeing on
        // the manifest shape.
        let manifest = manifest_json("example", "1.0.0");
        let parsed = wharf_core::read_manifest(manifest.as_bytes()).unwrap();
        assert_eq!(parsed.name, "example");
    }
}
