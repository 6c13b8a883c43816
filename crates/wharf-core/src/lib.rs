//! Package model for the wharf package catalog.
//!
//! This crate provides the in-memory representation of a versioned package
//! and the operations the catalog needs on it:
//!
//! - **Package**: one named, versioned unit of content plus the attributes
//!   derived from its manifest (release channel, categories, policy
//!   templates, Kibana compatibility constraint)
//! - **Packages**: the ordered, immutable catalog built by an indexer
//! - **Manifest**: the serde model of `manifest.json` found at every
//!   package root
//!
//! Version handling is strict: anything that `semver` rejects is rejected
//! here too, and surfaces as [`CoreError::InvalidVersion`] rather than a
//! generic parse failure.

pub mod error;
pub mod manifest;
pub mod package;
pub mod version;

pub use error::{CoreError, ErrorContext, Result};
pub use manifest::{read_manifest, read_manifest_file, Manifest, Validation, MANIFEST_NAME};
pub use package::{
    BasePolicyTemplate, Package, PackageLocation, Packages, PolicyTemplate, Release,
};
