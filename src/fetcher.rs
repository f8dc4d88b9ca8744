//! Source acquisition for releases.
//!
//! A release's origin is either a clonable repository or a zip archive. The
//! fetcher's contract is simple: populate the destination directory fully or
//! leave it absent, so the store can treat "non-empty directory" as the
//! installed predicate.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use bytes::Bytes;
use tracing::debug;
use which::which;
use zip::ZipArchive;

use crate::release::{Release, SourceOrigin};
use crate::store::InstallError;

pub trait Fetch {
    fn fetch(&self, release: &Release, dest: &Path) -> Result<(), InstallError>;
}

/// The production fetcher: `git clone` for repository origins, download and
/// extract for archive origins.
#[derive(Debug, Default)]
pub struct SourceFetcher;

impl Fetch for SourceFetcher {
    fn fetch(&self, release: &Release, dest: &Path) -> Result<(), InstallError> {
        match &release.origin {
            None => Err(InstallError::MissingOrigin {
                release: release.to_string(),
            }),
            Some(SourceOrigin::Git { url, branch }) => {
                fetch_git(release, url, branch.as_deref(), dest)
            }
            Some(SourceOrigin::Archive { url }) => fetch_archive(url, dest),
        }
    }
}

/// The ref to clone for a release: an explicit origin branch wins, then a
/// branch version's identifier, then the `v<M.N.P>` tag convention.
pub fn clone_reference(release: &Release, origin_branch: Option<&str>) -> String {
    if let Some(branch) = origin_branch {
        return branch.to_string();
    }
    match &release.version {
        crate::version::Version::Branch(name) => name.clone(),
        crate::version::Version::Semantic(version) => format!("v{version}"),
    }
}

fn fetch_git(
    release: &Release,
    url: &str,
    origin_branch: Option<&str>,
    dest: &Path,
) -> Result<(), InstallError> {
    let git = which("git").map_err(|source| InstallError::ToolMissing {
        tool: "git",
        source,
    })?;
    let reference = clone_reference(release, origin_branch);
    debug!(%url, %reference, "cloning");

    let output = Command::new(&git)
        .arg("clone")
        .arg("--quiet")
        .arg("--depth")
        .arg("1")
        .arg("--branch")
        .arg(&reference)
        .arg(url)
        .arg(dest)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| InstallError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
    if !output.status.success() {
        return Err(InstallError::Command {
            program: "git".to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    // The clone is a source snapshot; its repository metadata has no place
    // in the store.
    let git_dir = dest.join(".git");
    if git_dir.exists() {
        fs::remove_dir_all(&git_dir).map_err(|source| InstallError::Io {
            path: git_dir,
            source,
        })?;
    }
    Ok(())
}

fn fetch_archive(url: &str, dest: &Path) -> Result<(), InstallError> {
    let bytes = download(url)?;
    fs::create_dir_all(dest).map_err(|source| InstallError::Io {
        path: dest.to_path_buf(),
        source,
    })?;
    extract_zip(url, bytes, dest)?;
    flatten_single_root(dest)?;
    Ok(())
}

/// Fetch archive bytes from an `http(s)` URL, a `file://` URL, or a plain
/// filesystem path.
fn download(url: &str) -> Result<Bytes, InstallError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        debug!(%url, "downloading");
        let response = reqwest::blocking::get(url).map_err(|source| InstallError::Download {
            url: url.to_string(),
            source,
        })?;
        if !response.status().is_success() {
            return Err(InstallError::DownloadStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        return response.bytes().map_err(|source| InstallError::Download {
            url: url.to_string(),
            source,
        });
    }
    let path = url.strip_prefix("file://").unwrap_or(url);
    fs::read(path)
        .map(Bytes::from)
        .map_err(|source| InstallError::Io {
            path: path.into(),
            source,
        })
}

fn extract_zip(url: &str, bytes: Bytes, dest: &Path) -> Result<(), InstallError> {
    let archive_error = |source| InstallError::Archive {
        url: url.to_string(),
        source,
    };
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(archive_error)?;
        let Some(relative) = file.enclosed_name() else {
            return Err(InstallError::UnsafePath {
                entry: file.name().to_string(),
            });
        };
        let out_path = dest.join(relative);
        if file.name().ends_with('/') {
            fs::create_dir_all(&out_path).map_err(|source| InstallError::Io {
                path: out_path.clone(),
                source,
            })?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|source| InstallError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|source| InstallError::Io {
                path: out_path.clone(),
                source,
            })?;
        let mut out = fs::File::create(&out_path).map_err(|source| InstallError::Io {
            path: out_path.clone(),
            source,
        })?;
        out.write_all(&buffer).map_err(|source| InstallError::Io {
            path: out_path.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Forge-produced archives wrap everything in a `<name>-<version>/` root
/// directory; hoist its contents so the destination is the source tree
/// itself.
fn flatten_single_root(dest: &Path) -> Result<(), InstallError> {
    let io_error = |path: &Path, source| InstallError::Io {
        path: path.to_path_buf(),
        source,
    };
    let entries: Vec<_> = fs::read_dir(dest)
        .map_err(|source| io_error(dest, source))?
        .collect::<Result<_, _>>()
        .map_err(|source| io_error(dest, source))?;
    if entries.len() != 1 || !entries[0].path().is_dir() {
        return Ok(());
    }
    let root = entries[0].path();
    let children: Vec<_> = fs::read_dir(&root)
        .map_err(|source| io_error(&root, source))?
        .collect::<Result<_, _>>()
        .map_err(|source| io_error(&root, source))?;
    for child in children {
        let from = child.path();
        let to = dest.join(child.file_name());
        fs::rename(&from, &to).map_err(|source| io_error(&from, source))?;
    }
    fs::remove_dir(&root).map_err(|source| io_error(&root, source))?;
    Ok(())
}
