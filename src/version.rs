use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while constructing package names, versions, or dependency
/// constraints from their textual forms.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("invalid package name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("invalid version `{version}`: {reason}")]
    InvalidVersion {
        version: String,
        reason: &'static str,
    },
    #[error("invalid dependency `{dep}`: {reason}")]
    InvalidDep { dep: String, reason: &'static str },
}

/// A release version: either a semantic `major.minor.patch` triple or a bare
/// branch identifier such as `master`. Branch versions compare equal only to
/// themselves and are unordered relative to semantic versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Semantic(semver::Version),
    Branch(String),
}

impl Version {
    /// Parse `M`, `M.N`, or `M.N.P` (missing components default to zero) as a
    /// semantic version; any other non-empty identifier that does not start
    /// with a digit is a branch version.
    pub fn parse(input: &str) -> Result<Version, PackageError> {
        if input.is_empty() {
            return Err(PackageError::InvalidVersion {
                version: input.to_string(),
                reason: "version cannot be empty",
            });
        }
        let starts_numeric = input
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_digit());
        if starts_numeric {
            return parse_semantic(input);
        }
        if input.chars().any(char::is_whitespace) {
            return Err(PackageError::InvalidVersion {
                version: input.to_string(),
                reason: "branch names cannot contain whitespace",
            });
        }
        Ok(Version::Branch(input.to_string()))
    }

    pub fn minimum() -> Version {
        Version::Semantic(semver::Version::new(0, 0, 0))
    }

    pub fn is_minimum(&self) -> bool {
        matches!(self, Version::Semantic(v) if v.major == 0 && v.minor == 0 && v.patch == 0)
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Version::Semantic(_))
    }

    /// Two versions are compatible when both are semantic with the same major
    /// component, or both name the same branch.
    pub fn compatible(&self, other: &Version) -> bool {
        match (self, other) {
            (Version::Semantic(a), Version::Semantic(b)) => a.major == b.major,
            (Version::Branch(a), Version::Branch(b)) => a == b,
            _ => false,
        }
    }

    /// The greater of two compatible versions; `None` when the versions are
    /// not compatible with each other.
    pub fn max<'a>(&'a self, other: &'a Version) -> Option<&'a Version> {
        match (self, other) {
            (Version::Semantic(a), Version::Semantic(b)) if a.major == b.major => {
                Some(if b > a { other } else { self })
            }
            (Version::Branch(a), Version::Branch(b)) if a == b => Some(self),
            _ => None,
        }
    }
}

fn parse_semantic(input: &str) -> Result<Version, PackageError> {
    let mut components = [0u64; 3];
    let parts: Vec<&str> = input.split('.').collect();
    if parts.len() > 3 {
        return Err(PackageError::InvalidVersion {
            version: input.to_string(),
            reason: "expected at most three dotted components",
        });
    }
    for (slot, part) in components.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(PackageError::InvalidVersion {
                version: input.to_string(),
                reason: "version components must be non-negative integers",
            });
        }
        *slot = part.parse().map_err(|_| PackageError::InvalidVersion {
            version: input.to_string(),
            reason: "version component out of range",
        })?;
    }
    Ok(Version::Semantic(semver::Version::new(
        components[0],
        components[1],
        components[2],
    )))
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Version) -> Option<Ordering> {
        match (self, other) {
            (Version::Semantic(a), Version::Semantic(b)) => Some(a.cmp(b)),
            (Version::Branch(a), Version::Branch(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Semantic(v) => write!(f, "{v}"),
            Version::Branch(name) => f.write_str(name),
        }
    }
}

impl FromStr for Version {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}
