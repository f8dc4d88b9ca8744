//! Package and workspace manifest files.
//!
//! A package manifest (`dylan-package.json`, its transitional alias
//! `deft-package.json`, or the legacy `pkg.json`) declares one package
//! release: name, version, dependencies, and where its source lives. A
//! workspace file (`workspace.json`) marks a workspace root and may carry a
//! default-library hint. Unknown keys in either file are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::release::{Release, SourceOrigin};
use crate::version::{PackageError, Version};

pub const WORKSPACE_FILE: &str = "workspace.json";
pub const LEGACY_MANIFEST: &str = "pkg.json";

/// Recognized package manifest file names, in probe order.
pub const MANIFEST_FILES: [&str; 3] = ["dylan-package.json", "deft-package.json", LEGACY_MANIFEST];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid manifest {}: {source}", path.display())]
    Package {
        path: PathBuf,
        #[source]
        source: PackageError,
    },
}

#[derive(Debug, Deserialize)]
struct RawPackageManifest {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: Vec<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    branch: Option<String>,
}

/// Load a package manifest and turn it into the release it declares.
pub fn load_package_manifest(path: &Path) -> Result<Release, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_package_manifest(&raw, path)
}

pub fn parse_package_manifest(raw: &str, path: &Path) -> Result<Release, ManifestError> {
    let manifest: RawPackageManifest =
        serde_json::from_str(raw).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    release_from_raw(manifest).map_err(|source| ManifestError::Package {
        path: path.to_path_buf(),
        source,
    })
}

fn release_from_raw(raw: RawPackageManifest) -> Result<Release, PackageError> {
    let name = raw.name.parse()?;
    let version = Version::parse(&raw.version)?;
    let deps = raw
        .dependencies
        .iter()
        .map(|dep| dep.parse())
        .collect::<Result<Vec<_>, _>>()?;
    let dev_deps = raw
        .dev_dependencies
        .iter()
        .map(|dep| dep.parse())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Release {
        name,
        version,
        deps,
        dev_deps,
        origin: raw
            .url
            .map(|url| SourceOrigin::from_manifest(url, raw.branch)),
    })
}

/// Contents of `workspace.json`. An empty object is a valid workspace file.
#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default, rename = "default-library")]
    pub default_library: Option<String>,
}

pub fn load_workspace_file(path: &Path) -> Result<WorkspaceFile, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })
}
