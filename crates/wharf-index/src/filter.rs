//! The filter / selection engine.
//!
//! [`Filter::apply`] is a pure function from a candidate catalog to the
//! response set for a query. It allocates its result and never writes
//! through to the catalog; when category narrowing has to trim a package's
//! policy templates it copies the package first.

use std::sync::Arc;

use semver::Version;
use wharf_core::{Package, Packages, Release};

/// Options passed to an indexer's `get`.
///
/// A missing filter returns the raw catalog, internal and experimental
/// entries included. This is different from a default-constructed filter,
/// which actively excludes both.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub filter: Option<Filter>,
}

impl GetOptions {
    /// The usual options to look up one package by name and version across
    /// everything indexed.
    pub fn name_version(name: impl Into<String>, version: impl Into<String>) -> Self {
        GetOptions {
            filter: Some(Filter {
                experimental: true,
                internal: true,
                package_name: Some(name.into()),
                package_version: Some(version.into()),
                ..Default::default()
            }),
        }
    }
}

/// Query descriptor narrowing a catalog.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Keep every version of each package instead of only the latest.
    pub all_versions: bool,
    /// Keep only packages declaring this category, directly or through a
    /// policy template.
    pub category: Option<String>,
    /// Keep experimental packages. `beta` is never gated by this flag.
    pub experimental: bool,
    /// Keep internal packages.
    pub internal: bool,
    /// Keep only packages whose compatibility range contains this version.
    pub kibana_version: Option<Version>,
    /// Keep only this exact package name.
    pub package_name: Option<String>,
    /// Keep only this exact package version.
    pub package_version: Option<String>,
}

impl Filter {
    /// Applies the filter, returning a newly allocated result set.
    pub fn apply(&self, packages: &Packages) -> Packages {
        let mut selected: Vec<Arc<Package>> = Vec::new();
        for package in packages {
            if package.internal && !self.internal {
                continue;
            }
            if package.release == Release::Experimental && !self.experimental {
                continue;
            }
            if let Some(kibana_version) = &self.kibana_version {
                if !package.has_kibana_version(kibana_version) {
                    continue;
                }
            }
            if let Some(name) = &self.package_name {
                if name != &package.name {
                    continue;
                }
            }
            if let Some(version) = &self.package_version {
                if version != &package.version {
                    continue;
                }
            }

            let mut add_package = true;
            if !self.all_versions {
                // At most one entry per name survives: the greatest version,
                // kept at the position where the name first appeared.
                for current in selected.iter_mut() {
                    if current.name != package.name {
                        continue;
                    }
                    add_package = false;
                    if current.is_newer_or_equal(package) {
                        continue;
                    }
                    *current = Arc::clone(package);
                }
            }
            if add_package {
                selected.push(Arc::clone(package));
            }
        }

        // Category narrowing runs last, over the selected versions.
        filter_categories(Packages::from(selected), self.category.as_deref())
    }
}

fn filter_categories(packages: Packages, category: Option<&str>) -> Packages {
    let Some(category) = category else {
        return packages;
    };

    packages
        .into_iter()
        .filter_map(|package| {
            if package.has_category(category) {
                return Some(package);
            }
            if package.has_policy_template_with_category(category) {
                return Some(Arc::new(narrow_policy_templates(&package, category)));
            }
            None
        })
        .collect()
}

/// Copies `package` with its policy templates (and the paired base records)
/// narrowed to those declaring `category`, preserving order. The source
/// entry is left untouched.
fn narrow_policy_templates(package: &Package, category: &str) -> Package {
    let mut narrowed = package.clone();
    let mut templates = Vec::new();
    let mut base_templates = Vec::new();
    for (index, template) in package.policy_templates.iter().enumerate() {
        if template.categories.iter().any(|c| c == category) {
            templates.push(template.clone());
            if let Some(base) = package.base_policy_templates.get(index) {
                base_templates.push(base.clone());
            }
        }
    }
    narrowed.policy_templates = templates;
    narrowed.base_policy_templates = base_templates;
    narrowed
}
