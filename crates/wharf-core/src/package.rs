//! The package model and the catalog collection type.
//!
//! A [`Package`] is built once from a manifest during indexing and is
//! immutable afterwards. [`Packages`] holds the catalog as shared `Arc`
//! entries, so handing out filtered views never copies package data and
//! never aliases mutable state.

use std::{
    path::{Path, PathBuf},
    slice,
    sync::Arc,
};

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    manifest::{self, Manifest, Validation, MANIFEST_NAME},
    version,
};

/// Release channel of a package version.
///
/// `experimental` is the only channel gated by the filter; `ga` and `beta`
/// are always listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Release {
    #[default]
    Ga,
    Beta,
    Experimental,
}

/// A named sub-configuration within a package, carrying its own categories.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PolicyTemplate {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

/// Summary record paired with a [`PolicyTemplate`], used in listings.
///
/// Kept as a parallel list on [`Package`]; category narrowing trims both
/// lists with the same indices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasePolicyTemplate {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&PolicyTemplate> for BasePolicyTemplate {
    fn from(template: &PolicyTemplate) -> Self {
        BasePolicyTemplate {
            name: template.name.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
        }
    }
}

/// Where a package's content physically lives.
///
/// This is a path reference resolved through the owning indexer, not an
/// owning handle; opening the content goes through the package file system
/// abstraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageLocation {
    /// Files laid out directly on disk under this package-version root.
    Extracted { root: PathBuf },
    /// Content stored as entries of this zip archive.
    Archive { path: PathBuf },
}

impl PackageLocation {
    /// The on-disk path backing this package, whichever variant it is.
    pub fn base_path(&self) -> &Path {
        match self {
            PackageLocation::Extracted { root } => root,
            PackageLocation::Archive { path } => path,
        }
    }
}

/// One package version and its metadata-derived attributes.
#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub name: String,
    pub version: String,

    #[serde(skip)]
    pub parsed_version: Version,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub release: Release,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub internal: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policy_templates: Vec<PolicyTemplate>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub base_policy_templates: Vec<BasePolicyTemplate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kibana_version: Option<VersionReq>,

    #[serde(skip)]
    pub location: PackageLocation,
}

impl Package {
    /// Builds a package from an already-read manifest.
    pub fn from_manifest(
        manifest: Manifest,
        location: PackageLocation,
        validation: Validation,
    ) -> Result<Self> {
        if validation == Validation::Enabled {
            manifest.validate()?;
        }
        let parsed_version = version::parse_strict(&manifest.version)?;
        let kibana_version = manifest
            .kibana_constraint()
            .map(version::parse_constraint)
            .transpose()?;
        let base_policy_templates = manifest
            .policy_templates
            .iter()
            .map(BasePolicyTemplate::from)
            .collect();

        Ok(Package {
            name: manifest.name,
            version: manifest.version,
            parsed_version,
            title: manifest.title,
            release: manifest.release,
            internal: manifest.internal,
            categories: manifest.categories,
            policy_templates: manifest.policy_templates,
            base_policy_templates,
            kibana_version,
            location,
        })
    }

    /// Builds a package from an extracted package-version directory.
    ///
    /// The directory name is the version the indexer discovered; with
    /// validation enabled it must match the manifest's version.
    pub fn from_extracted_dir(root: impl Into<PathBuf>, validation: Validation) -> Result<Self> {
        let root = root.into();
        let manifest = manifest::read_manifest_file(&root.join(MANIFEST_NAME))?;

        if validation == Validation::Enabled {
            if let Some(dir) = root.file_name().and_then(|name| name.to_str()) {
                if dir != manifest.version {
                    return Err(CoreError::Validation(format!(
                        "package '{}' version '{}' does not match its directory '{}'",
                        manifest.name, manifest.version, dir
                    )));
                }
            }
        }

        Self::from_manifest(manifest, PackageLocation::Extracted { root }, validation)
    }

    /// Whether the package's own top-level categories include `category`.
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Whether any policy template declares `category`.
    pub fn has_policy_template_with_category(&self, category: &str) -> bool {
        self.policy_templates
            .iter()
            .any(|template| template.categories.iter().any(|c| c == category))
    }

    /// Whether the given Kibana version satisfies the declared constraint.
    ///
    /// Packages without a constraint are compatible with every version.
    pub fn has_kibana_version(&self, kibana_version: &Version) -> bool {
        match &self.kibana_version {
            Some(constraint) => constraint.matches(kibana_version),
            None => true,
        }
    }

    /// Whether this package's version is greater than or equal to `other`'s,
    /// by semantic version ordering (pre-releases order below releases).
    pub fn is_newer_or_equal(&self, other: &Package) -> bool {
        self.parsed_version >= other.parsed_version
    }
}

/// The ordered catalog of packages.
///
/// Entry order is discovery order until [`Packages::sort_by_title_and_version`]
/// is called. Entries are shared; filter results hold additional `Arc`s into
/// the same packages (or fresh copies when narrowed).
#[derive(Debug, Clone, Default)]
pub struct Packages(Vec<Arc<Package>>);

impl Packages {
    pub fn new() -> Self {
        Packages(Vec::new())
    }

    pub fn push(&mut self, package: Arc<Package>) {
        self.0.push(package);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Package>> {
        self.0.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Arc<Package>> {
        self.0.iter()
    }

    /// Appends `other` to this catalog.
    ///
    /// This is a structural append: duplicate (name, version) entries across
    /// the two catalogs are kept, not deduplicated. Callers must not assume
    /// uniqueness after joining.
    pub fn join(mut self, other: Packages) -> Packages {
        self.0.extend(other.0);
        self
    }

    /// Re-sorts the catalog for display: by title where both titles are set
    /// and differ, falling back to version-string order.
    pub fn sort_by_title_and_version(&mut self) {
        self.0.sort_by(|a, b| {
            match (&a.title, &b.title) {
                (Some(left), Some(right)) if left != right => left.cmp(right),
                _ => a.version.cmp(&b.version),
            }
        });
    }
}

impl From<Vec<Arc<Package>>> for Packages {
    fn from(packages: Vec<Arc<Package>>) -> Self {
        Packages(packages)
    }
}

impl FromIterator<Arc<Package>> for Packages {
    fn from_iter<I: IntoIterator<Item = Arc<Package>>>(iter: I) -> Self {
        Packages(iter.into_iter().collect())
    }
}

impl IntoIterator for Packages {
    type Item = Arc<Package>;
    type IntoIter = std::vec::IntoIter<Arc<Package>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Packages {
    type Item = &'a Arc<Package>;
    type IntoIter = slice::Iter<'a, Arc<Package>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
