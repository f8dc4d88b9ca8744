//! LID (library interchange description) files.
//!
//! A LID file is a sequence of `Key: value` headers whose values are
//! whitespace-separated tokens; a line starting with whitespace continues
//! the previous header. `Library:` is required. `//` comment lines and
//! blank lines are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LidError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: malformed header line `{text}`", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        text: String,
    },
    #[error("{}:{line}: continuation line without a preceding header", path.display())]
    DanglingContinuation { path: PathBuf, line: usize },
    #[error("{}: missing the required `Library:` header", path.display())]
    MissingLibrary { path: PathBuf },
}

#[derive(Debug, Clone)]
struct Header {
    key: String,
    values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LidFile {
    path: PathBuf,
    library: String,
    headers: Vec<Header>,
}

impl LidFile {
    pub fn load(path: &Path) -> Result<LidFile, LidError> {
        let contents = fs::read_to_string(path).map_err(|source| LidError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        LidFile::parse(path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<LidFile, LidError> {
        let mut headers: Vec<Header> = Vec::new();
        for (index, raw_line) in contents.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim_end();
            if line.trim().is_empty() || line.trim_start().starts_with("//") {
                continue;
            }
            if line.starts_with(char::is_whitespace) {
                let Some(last) = headers.last_mut() else {
                    return Err(LidError::DanglingContinuation {
                        path: path.to_path_buf(),
                        line: line_number,
                    });
                };
                last.values.extend(line.split_whitespace().map(String::from));
                continue;
            }
            let Some((key, rest)) = line.split_once(':') else {
                return Err(LidError::Malformed {
                    path: path.to_path_buf(),
                    line: line_number,
                    text: line.to_string(),
                });
            };
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
                return Err(LidError::Malformed {
                    path: path.to_path_buf(),
                    line: line_number,
                    text: line.to_string(),
                });
            }
            headers.push(Header {
                key: key.to_string(),
                values: rest.split_whitespace().map(String::from).collect(),
            });
        }

        let library = headers
            .iter()
            .find(|header| header.key.eq_ignore_ascii_case("library"))
            .and_then(|header| header.values.first())
            .cloned()
            .ok_or_else(|| LidError::MissingLibrary {
                path: path.to_path_buf(),
            })?;

        Ok(LidFile {
            path: path.to_path_buf(),
            library,
            headers,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The library this LID defines.
    pub fn library(&self) -> &str {
        &self.library
    }

    /// Values of the `Platforms:` header; `None` when the LID is
    /// platform-independent.
    pub fn platforms(&self) -> Option<Vec<&str>> {
        let values: Vec<&str> = self.values("platforms").collect();
        if values.is_empty() { None } else { Some(values) }
    }

    /// Values of every `LID:` include directive; such targets are
    /// inclusion-only fragments, not registry candidates.
    pub fn includes(&self) -> Vec<&str> {
        self.values("lid").collect()
    }

    /// All values under `key` across repeated headers, case-insensitively.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |header| header.key.eq_ignore_ascii_case(key))
            .flat_map(|header| header.values.iter().map(String::as_str))
    }
}
