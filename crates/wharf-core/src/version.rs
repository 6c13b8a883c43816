//! Strict semantic version parsing.
//!
//! Every version string in the catalog goes through [`parse_strict`]. There
//! is no lenient mode: partial versions (`1.0`) and prefixed versions
//! (`v1.0.0`) are rejected, which is what lets the directory walker tell a
//! package version directory apart from a stray directory.

use semver::{Version, VersionReq};

use crate::error::{CoreError, Result};

/// Parses a strict semantic version, failing with [`CoreError::InvalidVersion`].
pub fn parse_strict(value: &str) -> Result<Version> {
    Version::parse(value).map_err(|source| {
        CoreError::InvalidVersion {
            value: value.to_string(),
            source,
        }
    })
}

/// Parses a semver range constraint, failing with [`CoreError::InvalidConstraint`].
pub fn parse_constraint(value: &str) -> Result<VersionReq> {
    VersionReq::parse(value).map_err(|source| {
        CoreError::InvalidConstraint {
            value: value.to_string(),
            source,
        }
    })
}
