//! The `update` operation: bring a workspace into a buildable state.
//!
//! Strict phase order: resolve the dependency closure, install every missing
//! release into the store, then write the registry. The registry therefore
//! never points at a release that is not installed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::catalog::Catalog;
use crate::config::{self, DeftConfig};
use crate::dep::{Dep, PackageName};
use crate::fetcher::SourceFetcher;
use crate::registry::RegistryGenerator;
use crate::release::Release;
use crate::resolver::Resolver;
use crate::store::{PACKAGES_DIR, Store};
use crate::workspace::Workspace;

#[derive(Debug, Default)]
pub struct UpdateOptions {
    /// Install into the per-user store instead of `${workspace}/_packages`.
    pub global: bool,
    /// Explicit catalog location, overriding env and config discovery.
    pub catalog: Option<PathBuf>,
}

#[derive(Debug)]
pub struct UpdateReport {
    pub releases: Vec<Release>,
    pub active: Vec<PackageName>,
    pub installed: usize,
    pub written: usize,
    pub checked: usize,
    pub missing_lids: Vec<String>,
    pub warnings: Vec<String>,
}

/// Resolve, install, and regenerate the registry for the workspace
/// containing `start`.
pub fn update(start: &Path, options: &UpdateOptions) -> Result<UpdateReport> {
    let config = config::load()?;
    let workspace = Workspace::load(start).context("failed to load workspace")?;
    let catalog = load_catalog(&config, options.catalog.as_deref())?;

    let resolution = Resolver::new(&catalog)
        .with_active(workspace.active_releases().cloned())
        .resolve()
        .context("dependency resolution failed")?;

    let store = open_store(&config, &workspace, options.global);
    let fetcher = SourceFetcher;
    let mut installed = 0;
    for release in &resolution.releases {
        if workspace.is_active(&release.name) {
            continue;
        }
        if store
            .install(release, &fetcher)
            .with_context(|| format!("failed to install `{release}`"))?
        {
            installed += 1;
        }
    }

    let mut package_dirs = Vec::new();
    for release in &resolution.releases {
        match workspace.active_package_directory(&release.name) {
            Some(dir) => package_dirs.push(dir.to_path_buf()),
            None => package_dirs.push(store.source_directory(release)),
        }
    }

    let registry = RegistryGenerator::new(&workspace)
        .generate(&package_dirs)
        .context("failed to write registry")?;

    let mut warnings = Vec::new();
    warnings.extend(workspace.warnings().iter().cloned());
    warnings.extend(resolution.warnings);
    warnings.extend(registry.warnings);

    Ok(UpdateReport {
        active: workspace.active_releases().map(|r| r.name.clone()).collect(),
        releases: resolution.releases,
        installed,
        written: registry.written,
        checked: registry.checked,
        missing_lids: registry.missing,
        warnings,
    })
}

#[derive(Debug)]
pub struct InstallReport {
    pub releases: Vec<Release>,
    pub installed: usize,
    pub store_root: PathBuf,
}

/// Resolve one package against the catalog and install its closure into the
/// store. No registry is written.
pub fn install(spec: &str, start: &Path, options: &UpdateOptions) -> Result<InstallReport> {
    let dep: Dep = spec
        .parse()
        .with_context(|| format!("invalid package spec `{spec}`"))?;
    let config = config::load()?;
    let catalog = load_catalog(&config, options.catalog.as_deref())?;
    let resolution = Resolver::new(&catalog)
        .resolve_deps(std::slice::from_ref(&dep), &[])
        .context("dependency resolution failed")?;

    let store = if options.global {
        Store::new(config::global_store_dir(&config))
    } else {
        let workspace = Workspace::load(start)
            .context("no workspace here; use --global to install into the user store")?;
        Store::new(workspace.directory().join(PACKAGES_DIR))
    };

    let fetcher = SourceFetcher;
    let mut installed = 0;
    for release in &resolution.releases {
        if store
            .install(release, &fetcher)
            .with_context(|| format!("failed to install `{release}`"))?
        {
            installed += 1;
        }
    }
    Ok(InstallReport {
        releases: resolution.releases,
        installed,
        store_root: store.root().to_path_buf(),
    })
}

pub fn load_catalog(config: &DeftConfig, cli_override: Option<&Path>) -> Result<Catalog> {
    let location = config::catalog_location(config, cli_override)?;
    let catalog = Catalog::load(&location)
        .with_context(|| format!("failed to load catalog from {}", location.display()))?;
    catalog
        .validate()
        .with_context(|| format!("catalog at {} is inconsistent", location.display()))?;
    Ok(catalog)
}

fn open_store(config: &DeftConfig, workspace: &Workspace, global: bool) -> Store {
    if global {
        Store::new(config::global_store_dir(config))
    } else {
        Store::new(workspace.directory().join(PACKAGES_DIR))
    }
}
