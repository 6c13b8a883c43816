//! Fixture builders shared by the crate's tests.

use std::{fs, io::Write, path::Path, path::PathBuf, sync::Arc};

use wharf_core::{
    Manifest, Package, PackageLocation, Packages, PolicyTemplate, Validation, MANIFEST_NAME,
};

pub fn template(name: &str, categories: Vec<String>) -> PolicyTemplate {
    PolicyTemplate {
        name: name.to_string(),
        title: None,
        description: None,
        categories,
    }
}

pub fn package_with_templates(
    name: &str,
    version: &str,
    categories: Vec<String>,
    policy_templates: Vec<PolicyTemplate>,
) -> Package {
    let manifest = Manifest {
        name: name.to_string(),
        version: version.to_string(),
        categories,
        policy_templates,
        ..Default::default()
    };
    Package::from_manifest(
        manifest,
        PackageLocation::Extracted {
            root: PathBuf::from(format!("/packages/{name}/{version}")),
        },
        Validation::Enabled,
    )
    .unwrap()
}

pub fn package(name: &str, version: &str) -> Package {
    package_with_templates(name, version, Vec::new(), Vec::new())
}

pub fn catalog(packages: Vec<Package>) -> Packages {
    packages.into_iter().map(Arc::new).collect()
}

/// JSON manifest body for the on-disk fixtures.
pub fn manifest_json(name: &str, version: &str) -> String {
    serde_json::json!({ "name": name, "version": version }).to_string()
}

/// Writes `<root>/<name>/<version>/manifest.json` plus a doc file.
pub fn write_package_dir(root: &Path, name: &str, version: &str) {
    write_package_dir_with_manifest(root, name, version, &manifest_json(name, version));
}

pub fn write_package_dir_with_manifest(root: &Path, name: &str, version: &str, manifest: &str) {
    let package_root = root.join(name).join(version);
    fs::create_dir_all(package_root.join("docs")).unwrap();
    fs::write(package_root.join(MANIFEST_NAME), manifest).unwrap();
    fs::write(
        package_root.join("docs").join("README.md"),
        format!("# {name} {version}\n"),
    )
    .unwrap();
}

/// Writes `<dir>/<name>-<version>.zip` with the conventional internal
/// top-level folder, returning the archive path.
pub fn write_zip_package(dir: &Path, name: &str, version: &str) -> PathBuf {
    let archive_path = dir.join(format!("{name}-{version}.zip"));
    let file = fs::File::create(&archive_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    let prefix = format!("{name}-{version}");
    writer
        .start_file(format!("{prefix}/{MANIFEST_NAME}"), options)
        .unwrap();
    writer
        .write_all(manifest_json(name, version).as_bytes())
        .unwrap();
    writer
        .start_file(format!("{prefix}/docs/README.md"), options)
        .unwrap();
    writer
        .write_all(format!("# {name} {version}\n").as_bytes())
        .unwrap();
    writer.finish().unwrap();
    archive_path
}
