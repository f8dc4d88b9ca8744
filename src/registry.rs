//! Registry generation.
//!
//! The Dylan build tool locates libraries through a registry: one small text
//! file per (platform, library) whose single line points at the LID file
//! defining that library. The generator scans every package source tree
//! (active and installed) for `*.lid` files, applies platform and inclusion
//! rules, and rewrites only those entries whose contents changed. Entries
//! for libraries that no longer exist are left in place; a future `clean`
//! pass can collect them.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::lid::LidFile;
use crate::workspace::Workspace;

/// Platform directory for LIDs with no `Platforms:` header.
pub const GENERIC_PLATFORM: &str = "generic";

/// The platform tag registry entries are checked against for coverage
/// reporting.
pub fn host_platform() -> &'static str {
    match (std::env::consts::ARCH, std::env::consts::OS) {
        ("x86_64", "linux") => "x86_64-linux",
        ("aarch64", "linux") => "aarch64-linux",
        ("x86_64", "macos") => "x86_64-darwin",
        ("aarch64", "macos") => "aarch64-darwin",
        ("x86_64", "windows") => "x86_64-windows",
        ("x86_64", "freebsd") => "x86_64-freebsd",
        _ => GENERIC_PLATFORM,
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("i/o failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a generation run did: how many entries were written vs merely
/// checked, which libraries have no LID usable on the current platform, and
/// any non-fatal scan warnings.
#[derive(Debug, Default)]
pub struct RegistryUpdate {
    pub written: usize,
    pub checked: usize,
    pub missing: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct RegistryGenerator<'a> {
    workspace: &'a Workspace,
    platform: String,
}

impl<'a> RegistryGenerator<'a> {
    pub fn new(workspace: &'a Workspace) -> RegistryGenerator<'a> {
        RegistryGenerator {
            workspace,
            platform: host_platform().to_string(),
        }
    }

    pub fn with_platform(mut self, platform: &str) -> RegistryGenerator<'a> {
        self.platform = platform.to_string();
        self
    }

    /// Generate registry entries for every eligible LID under the given
    /// package source directories.
    pub fn generate(&self, package_dirs: &[PathBuf]) -> Result<RegistryUpdate, RegistryError> {
        let registry_dir = self.workspace.registry_directory();
        let mut update = RegistryUpdate::default();
        // library -> has an entry usable on the current platform
        let mut coverage: BTreeMap<String, bool> = BTreeMap::new();

        for dir in package_dirs {
            let lids = scan_lids(dir, &mut update.warnings);
            let included = included_paths(&lids);
            for lid in &lids {
                if included.contains(lid.path()) {
                    continue;
                }
                let platforms = match lid.platforms() {
                    Some(platforms) => platforms.iter().map(|p| p.to_string()).collect(),
                    None => vec![GENERIC_PLATFORM.to_string()],
                };
                let covered = coverage.entry(lid.library().to_string()).or_default();
                *covered |= platforms
                    .iter()
                    .any(|platform| platform == &self.platform || platform == GENERIC_PLATFORM);
                for platform in &platforms {
                    self.write_entry(&registry_dir, platform, lid, &mut update)?;
                }
            }
        }

        update.missing = coverage
            .into_iter()
            .filter_map(|(library, covered)| (!covered).then_some(library))
            .collect();
        Ok(update)
    }

    /// Write `registry/<platform>/<library>` when its contents differ from
    /// the desired pointer line.
    fn write_entry(
        &self,
        registry_dir: &Path,
        platform: &str,
        lid: &LidFile,
        update: &mut RegistryUpdate,
    ) -> Result<(), RegistryError> {
        let contents = format!("abstract://{}\n", self.lid_location(lid));
        let entry_dir = registry_dir.join(platform);
        let entry_path = entry_dir.join(lid.library());
        update.checked += 1;

        if fs::read_to_string(&entry_path).ok().as_deref() == Some(contents.as_str()) {
            return Ok(());
        }
        fs::create_dir_all(&entry_dir).map_err(|source| RegistryError::Io {
            path: entry_dir.clone(),
            source,
        })?;
        fs::write(&entry_path, contents).map_err(|source| RegistryError::Io {
            path: entry_path.clone(),
            source,
        })?;
        update.written += 1;
        Ok(())
    }

    /// The pointer target: the LID path relative to the workspace when it is
    /// inside it (the usual case), otherwise the full path (global store).
    fn lid_location(&self, lid: &LidFile) -> String {
        let path = lid
            .path()
            .strip_prefix(self.workspace.directory())
            .unwrap_or(lid.path());
        path.to_string_lossy().replace('\\', "/")
    }
}

/// All parseable LID files under `dir`, sorted by path. Unparseable ones
/// become warnings rather than failures.
fn scan_lids(dir: &Path, warnings: &mut Vec<String>) -> Vec<LidFile> {
    let mut lids = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("lid") {
            continue;
        }
        match LidFile::load(entry.path()) {
            Ok(lid) => lids.push(lid),
            Err(error) => warnings.push(error.to_string()),
        }
    }
    lids
}

/// Paths named by `LID:` include directives, resolved against each LID's
/// own directory. The targets are fragments to be skipped.
fn included_paths(lids: &[LidFile]) -> BTreeSet<PathBuf> {
    let mut included = BTreeSet::new();
    for lid in lids {
        let Some(parent) = lid.path().parent() else {
            continue;
        };
        for include in lid.includes() {
            included.insert(parent.join(include));
        }
    }
    included
}
