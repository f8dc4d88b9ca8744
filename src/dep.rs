use std::fmt;
use std::str::FromStr;

use crate::version::{PackageError, Version};

/// A validated package name: an ASCII letter followed by letters, digits,
/// dots, underscores, or hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    pub fn parse(name: impl Into<String>) -> Result<PackageName, PackageError> {
        let name = name.into();
        let mut chars = name.chars();
        match chars.next() {
            None => {
                return Err(PackageError::InvalidName {
                    name,
                    reason: "name cannot be empty",
                });
            }
            Some(first) if !first.is_ascii_alphabetic() => {
                return Err(PackageError::InvalidName {
                    name,
                    reason: "name must start with a letter",
                });
            }
            Some(_) => {}
        }
        if chars.any(|ch| !is_name_char(ch)) {
            return Err(PackageError::InvalidName {
                name,
                reason: "name may only contain letters, digits, `.`, `_`, and `-`",
            });
        }
        Ok(PackageName(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-')
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageName {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackageName::parse(s)
    }
}

/// A dependency constraint: a package name plus the minimum acceptable
/// semantic version, or an exact branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dep {
    pub name: PackageName,
    pub version: Version,
}

impl Dep {
    pub fn new(name: PackageName, version: Version) -> Dep {
        Dep { name, version }
    }

    /// Parse `name` or `name@version`. A bare name means "any release",
    /// i.e. a minimum of `0.0.0`.
    pub fn parse(input: &str) -> Result<Dep, PackageError> {
        match input.split_once('@') {
            None => Ok(Dep {
                name: PackageName::parse(input)?,
                version: Version::minimum(),
            }),
            Some((_, "")) => Err(PackageError::InvalidDep {
                dep: input.to_string(),
                reason: "missing version after `@`",
            }),
            Some((name, version)) => Ok(Dep {
                name: PackageName::parse(name)?,
                version: Version::parse(version)?,
            }),
        }
    }
}

impl fmt::Display for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_minimum() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}@{}", self.name, self.version)
        }
    }
}

impl FromStr for Dep {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dep::parse(s)
    }
}
