//! Package manifest reading.
//!
//! Every package, extracted or archived, carries a `manifest.json` at its
//! root describing its identity and attributes. The catalog only needs the
//! fields modeled here; unknown fields are ignored so manifests can carry
//! additional data for other consumers.

use std::{fs::File, io::Read, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, ErrorContext, Result},
    package::{PolicyTemplate, Release},
    version,
};

/// File name of the package manifest, relative to the package root.
pub const MANIFEST_NAME: &str = "manifest.json";

/// Whether package construction validates manifest contents.
///
/// Threaded explicitly into package construction instead of living in global
/// state, so that catalog behavior is a pure function of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    #[default]
    Enabled,
    Disabled,
}

/// Kibana compatibility condition declared by a manifest.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KibanaCondition {
    /// Semver range constraint, like `^7.9.0`.
    pub version: Option<String>,
}

/// Compatibility conditions declared by a manifest.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Conditions {
    pub kibana: Option<KibanaCondition>,
}

/// Parsed contents of a package's `manifest.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,

    pub title: Option<String>,

    #[serde(default)]
    pub release: Release,

    /// Internal packages are hidden from default listings.
    #[serde(default)]
    pub internal: bool,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub policy_templates: Vec<PolicyTemplate>,

    #[serde(default)]
    pub conditions: Conditions,
}

impl Manifest {
    /// Checks manifest coherence: a usable name and a strict version.
    ///
    /// Release channel and policy template shapes are already enforced by
    /// deserialization; schema-level validation is a separate concern and
    /// not performed here.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CoreError::Validation("manifest has no name".to_string()));
        }
        version::parse_strict(&self.version)?;
        for template in &self.policy_templates {
            if template.name.is_empty() {
                return Err(CoreError::Validation(format!(
                    "package '{}' has a policy template without a name",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the declared Kibana version constraint, if any.
    pub fn kibana_constraint(&self) -> Option<&str> {
        self.conditions
            .kibana
            .as_ref()
            .and_then(|kibana| kibana.version.as_deref())
    }
}

/// Reads a manifest from any reader.
pub fn read_manifest(reader: impl Read) -> Result<Manifest> {
    let manifest = serde_json::from_reader(reader)?;
    Ok(manifest)
}

/// Reads a manifest from a file on disk.
pub fn read_manifest_file(path: &Path) -> Result<Manifest> {
    let file =
        File::open(path).with_context(|| format!("opening manifest {}", path.display()))?;
    read_manifest(file)
}
