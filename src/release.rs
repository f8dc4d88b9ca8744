use std::fmt;
use std::hash::{Hash, Hasher};

use crate::dep::{Dep, PackageName};
use crate::version::Version;

/// Where a release's source tree comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// A version-control repository cloned at a tag or branch.
    Git { url: String, branch: Option<String> },
    /// A URL-addressed zip archive.
    Archive { url: String },
}

impl SourceOrigin {
    /// Classify a manifest `url` (plus optional `branch`) as an archive or a
    /// repository location. Zip archives are recognized by their extension;
    /// everything else is treated as a clonable repository.
    pub fn from_manifest(url: String, branch: Option<String>) -> SourceOrigin {
        if url.ends_with(".zip") {
            SourceOrigin::Archive { url }
        } else {
            SourceOrigin::Git { url, branch }
        }
    }

    pub fn url(&self) -> &str {
        match self {
            SourceOrigin::Git { url, .. } | SourceOrigin::Archive { url } => url,
        }
    }
}

/// A concrete (package, version) pair with its declared dependencies and the
/// origin its source tree can be fetched from. Identity is (name, version).
#[derive(Debug, Clone)]
pub struct Release {
    pub name: PackageName,
    pub version: Version,
    pub deps: Vec<Dep>,
    pub dev_deps: Vec<Dep>,
    pub origin: Option<SourceOrigin>,
}

impl Release {
    pub fn new(name: PackageName, version: Version) -> Release {
        Release {
            name,
            version,
            deps: Vec::new(),
            dev_deps: Vec::new(),
            origin: None,
        }
    }

    pub fn with_deps(mut self, deps: Vec<Dep>) -> Release {
        self.deps = deps;
        self
    }

    pub fn with_dev_deps(mut self, dev_deps: Vec<Dep>) -> Release {
        self.dev_deps = dev_deps;
        self
    }

    pub fn with_origin(mut self, origin: SourceOrigin) -> Release {
        self.origin = Some(origin);
        self
    }
}

impl PartialEq for Release {
    fn eq(&self, other: &Release) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for Release {}

impl Hash for Release {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_name_and_version() {
        let name: PackageName = "http".parse().unwrap();
        let a = Release::new(name.clone(), Version::parse("1.2.0").unwrap());
        let b = Release::new(name.clone(), Version::parse("1.2.0").unwrap())
            .with_deps(vec!["strings@1.0".parse().unwrap()]);
        let c = Release::new(name, Version::parse("1.3.0").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn zip_urls_are_archives() {
        let archive =
            SourceOrigin::from_manifest("https://example.com/p-1.0.zip".to_string(), None);
        assert!(matches!(archive, SourceOrigin::Archive { .. }));
        let git = SourceOrigin::from_manifest(
            "https://example.com/p.git".to_string(),
            Some("main".to_string()),
        );
        assert!(matches!(git, SourceOrigin::Git { .. }));
    }
}
