//! Workspace discovery and the active package set.
//!
//! A workspace root is the nearest ancestor directory holding
//! `workspace.json`, or failing that the nearest ancestor holding a package
//! manifest. A manifest at the root makes the workspace single-package;
//! otherwise every immediate subdirectory with a manifest contributes one
//! active package.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dep::PackageName;
use crate::manifest::{
    self, LEGACY_MANIFEST, MANIFEST_FILES, ManifestError, WORKSPACE_FILE, load_package_manifest,
};
use crate::release::Release;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("no workspace found: no `{WORKSPACE_FILE}` or package manifest in `{}` or any parent directory", start.display())]
    NotFound { start: PathBuf },
    #[error("workspace at {} is nested inside the workspace at {}", inner.display(), outer.display())]
    Nested { inner: PathBuf, outer: PathBuf },
    #[error("package `{name}` is defined by more than one workspace directory")]
    DuplicatePackage { name: PackageName },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("i/o failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
struct ActivePackage {
    release: Release,
    directory: PathBuf,
    manifest: PathBuf,
}

#[derive(Debug)]
pub struct Workspace {
    directory: PathBuf,
    active: BTreeMap<PackageName, ActivePackage>,
    default_library: Option<String>,
    multi_package: bool,
    warnings: Vec<String>,
}

impl Workspace {
    /// Discover and load the workspace containing `start`.
    pub fn load(start: &Path) -> Result<Workspace, WorkspaceError> {
        let start = start
            .canonicalize()
            .map_err(|source| WorkspaceError::Io {
                path: start.to_path_buf(),
                source,
            })?;
        let root = find_root(&start)?;

        let workspace_file = root.join(WORKSPACE_FILE);
        let default_library = if workspace_file.is_file() {
            manifest::load_workspace_file(&workspace_file)?.default_library
        } else {
            None
        };

        let mut workspace = Workspace {
            directory: root.clone(),
            active: BTreeMap::new(),
            default_library,
            multi_package: false,
            warnings: Vec::new(),
        };

        if let Some(root_manifest) = manifest_in(&root) {
            workspace.add_active(&root, &root_manifest)?;
            workspace.warn_ignored_subdirectories(&root)?;
        } else {
            workspace.multi_package = true;
            for dir in package_subdirectories(&root)? {
                if let Some(manifest_path) = manifest_in(&dir) {
                    workspace.add_active(&dir, &manifest_path)?;
                }
            }
        }

        if workspace.default_library.is_none() && workspace.active.len() == 1 {
            workspace.default_library = workspace
                .active
                .keys()
                .next()
                .map(|name| name.to_string());
        }

        Ok(workspace)
    }

    fn add_active(&mut self, directory: &Path, manifest_path: &Path) -> Result<(), WorkspaceError> {
        if manifest_path.file_name().and_then(|name| name.to_str()) == Some(LEGACY_MANIFEST) {
            self.warnings.push(format!(
                "{} uses the obsolete `{LEGACY_MANIFEST}` name; rename it to `dylan-package.json`",
                manifest_path.display()
            ));
        }
        let release = load_package_manifest(manifest_path)?;
        if self.active.contains_key(&release.name) {
            return Err(WorkspaceError::DuplicatePackage { name: release.name });
        }
        self.active.insert(
            release.name.clone(),
            ActivePackage {
                release,
                directory: directory.to_path_buf(),
                manifest: manifest_path.to_path_buf(),
            },
        );
        Ok(())
    }

    fn warn_ignored_subdirectories(&mut self, root: &Path) -> Result<(), WorkspaceError> {
        for dir in package_subdirectories(root)? {
            if manifest_in(&dir).is_some() {
                self.warnings.push(format!(
                    "ignoring package directory {}: the workspace root already holds a manifest",
                    dir.display()
                ));
            }
        }
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn registry_directory(&self) -> PathBuf {
        self.directory.join("registry")
    }

    pub fn default_library(&self) -> Option<&str> {
        self.default_library.as_deref()
    }

    pub fn is_multi_package(&self) -> bool {
        self.multi_package
    }

    pub fn active_releases(&self) -> impl Iterator<Item = &Release> {
        self.active.values().map(|package| &package.release)
    }

    pub fn is_active(&self, name: &PackageName) -> bool {
        self.active.contains_key(name)
    }

    pub fn active_package_directory(&self, name: &PackageName) -> Option<&Path> {
        self.active.get(name).map(|package| package.directory.as_path())
    }

    pub fn active_package_file(&self, name: &PackageName) -> Option<&Path> {
        self.active.get(name).map(|package| package.manifest.as_path())
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// The workspace root for `start`: the nearest ancestor with a workspace
/// file, else the nearest ancestor with a package manifest. A workspace file
/// above another workspace file is a structural contradiction.
fn find_root(start: &Path) -> Result<PathBuf, WorkspaceError> {
    if let Some(root) = nearest_ancestor_with(start, &[WORKSPACE_FILE]) {
        if let Some(parent) = root.parent()
            && let Some(outer) = nearest_ancestor_with(parent, &[WORKSPACE_FILE])
        {
            return Err(WorkspaceError::Nested { inner: root, outer });
        }
        return Ok(root);
    }
    nearest_ancestor_with(start, &MANIFEST_FILES).ok_or_else(|| WorkspaceError::NotFound {
        start: start.to_path_buf(),
    })
}

fn nearest_ancestor_with(start: &Path, file_names: &[&str]) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| file_names.iter().any(|name| dir.join(name).is_file()))
        .map(Path::to_path_buf)
}

/// The first recognized manifest file in `dir`, probing current names before
/// the legacy one.
fn manifest_in(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Immediate subdirectories that may hold active packages, sorted for
/// deterministic load order. Hidden directories and deft's own output
/// directories are skipped.
fn package_subdirectories(root: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    let entries = fs::read_dir(root).map_err(|source| WorkspaceError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| WorkspaceError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name == "_packages" || name == "registry" {
            continue;
        }
        dirs.push(path);
    }
    dirs.sort();
    Ok(dirs)
}
