//! The shared release store.
//!
//! Installed releases live under `${root}/<name>/<version>/src/`. A release
//! is installed exactly when that `src` directory exists and is non-empty.
//! Installation stages the fetched tree in a sibling temporary directory and
//! commits it with a single atomic rename, so concurrent installers of the
//! same release cannot observe a partially populated entry: whoever renames
//! first wins and the loser discards its staging directory.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::fetcher::Fetch;
use crate::release::Release;

/// Directory under the workspace root holding installed releases.
pub const PACKAGES_DIR: &str = "_packages";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("release `{release}` has no source origin to fetch from")]
    MissingOrigin { release: String },
    #[error("`{tool}` is not available on PATH: {source}")]
    ToolMissing {
        tool: &'static str,
        #[source]
        source: which::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Command {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} failed with HTTP status {status}")]
    DownloadStatus { url: String, status: u16 },
    #[error("failed to extract archive {url}: {source}")]
    Archive {
        url: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("archive entry `{entry}` escapes the extraction root")]
    UnsafePath { entry: String },
    #[error("fetch of `{release}` produced an empty source tree")]
    Empty { release: String },
    #[error("store entry {} exists but holds no source tree", path.display())]
    Corrupted { path: PathBuf },
    #[error("failed to commit {} into the store: {source}", path.display())]
    Commit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Store {
        Store { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `${root}/<name>/<version>` for a release.
    pub fn release_directory(&self, release: &Release) -> PathBuf {
        self.root
            .join(release.name.as_str())
            .join(release.version.to_string())
    }

    /// `${root}/<name>/<version>/src`, where the source tree lives.
    pub fn source_directory(&self, release: &Release) -> PathBuf {
        self.release_directory(release).join("src")
    }

    /// A release counts as installed when its source directory exists and
    /// holds at least one entry.
    pub fn installed(&self, release: &Release) -> bool {
        directory_non_empty(&self.source_directory(release))
    }

    /// Ensure `release` is present in the store, fetching if needed. Returns
    /// `true` when a fetch actually happened. Idempotent, and safe under
    /// concurrent callers: the directory rename is the only commit point.
    #[tracing::instrument(level = "debug", skip(self, fetcher), fields(release = %release))]
    pub fn install(&self, release: &Release, fetcher: &dyn Fetch) -> Result<bool, InstallError> {
        if self.installed(release) {
            debug!("already installed");
            return Ok(false);
        }

        let target = self.release_directory(release);
        if target.exists() {
            // An entry directory with no source tree is a corrupted store.
            return Err(InstallError::Corrupted { path: target });
        }

        // Stage next to the target so the commit rename stays on one
        // filesystem. Branch identifiers may contain `/`, hence the parent
        // of the target rather than `${root}/<name>` itself.
        let package_dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&package_dir).map_err(|source| InstallError::Io {
            path: package_dir.clone(),
            source,
        })?;

        let prefix = format!(".{}-", release.version.to_string().replace('/', "-"));
        let staging = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&package_dir)
            .map_err(|source| InstallError::Io {
                path: package_dir.clone(),
                source,
            })?;
        let staged_src = staging.path().join("src");

        // A fetch failure drops `staging` here, removing the partial tree.
        fetcher.fetch(release, &staged_src)?;
        if !directory_non_empty(&staged_src) {
            return Err(InstallError::Empty {
                release: release.to_string(),
            });
        }

        let staged = staging.keep();
        if let Err(source) = fs::rename(&staged, &target) {
            let _ = fs::remove_dir_all(&staged);
            if self.installed(release) {
                // Another caller committed first; their tree is equivalent.
                debug!("lost install race, reusing existing entry");
                return Ok(false);
            }
            return Err(InstallError::Commit {
                path: target,
                source,
            });
        }
        debug!("installed");
        Ok(true)
    }
}

fn directory_non_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
