//! The package catalog: every known package and its published releases.
//!
//! On disk a catalog is either a single `catalog.json` mapping package names
//! to arrays of release objects, or a directory of `<package>.json` files
//! each holding one such array. Releases are kept ascending by version so
//! candidate selection can take the first match.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::dep::{Dep, PackageName};
use crate::release::{Release, SourceOrigin};
use crate::version::{PackageError, Version};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog JSON at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("duplicate release `{name} {version}` in catalog")]
    DuplicateRelease { name: PackageName, version: Version },
    #[error("release `{release}` depends on `{dep}`, which is not in the catalog")]
    MissingDependency { release: String, dep: Dep },
    #[error("release `{release}` depends on `{dep}`, but no release satisfies it")]
    UnsatisfiableDependency { release: String, dep: Dep },
}

#[derive(Debug, Default)]
pub struct Catalog {
    packages: BTreeMap<PackageName, Vec<Release>>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    /// Build a catalog from loose releases, sorting each package's releases
    /// ascending by version. Duplicate (name, version) pairs are rejected.
    pub fn from_releases(
        releases: impl IntoIterator<Item = Release>,
    ) -> Result<Catalog, CatalogError> {
        let mut packages: BTreeMap<PackageName, Vec<Release>> = BTreeMap::new();
        for release in releases {
            let shelf = packages.entry(release.name.clone()).or_default();
            if shelf.iter().any(|existing| existing.version == release.version) {
                return Err(CatalogError::DuplicateRelease {
                    name: release.name,
                    version: release.version,
                });
            }
            shelf.push(release);
        }
        for shelf in packages.values_mut() {
            shelf.sort_by(|a, b| release_order(&a.version, &b.version));
        }
        Ok(Catalog { packages })
    }

    /// Load a catalog from a `catalog.json` file or a directory of
    /// `<package>.json` files.
    pub fn load(path: &Path) -> Result<Catalog, CatalogError> {
        if path.is_dir() {
            Catalog::load_directory(path)
        } else {
            Catalog::load_file(path)
        }
    }

    fn load_file(path: &Path) -> Result<Catalog, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: BTreeMap<String, Vec<RawCatalogRelease>> = serde_json::from_str(&raw)
            .map_err(|source| CatalogError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let mut releases = Vec::new();
        for (name, shelf) in entries {
            let name: PackageName = name.parse()?;
            for raw in shelf {
                releases.push(raw.into_release(&name)?);
            }
        }
        Catalog::from_releases(releases)
    }

    fn load_directory(path: &Path) -> Result<Catalog, CatalogError> {
        let mut releases = Vec::new();
        let entries = fs::read_dir(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let file = entry.path();
            if file.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = file.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let name: PackageName = stem.parse()?;
            let raw = fs::read_to_string(&file).map_err(|source| CatalogError::Io {
                path: file.clone(),
                source,
            })?;
            let shelf: Vec<RawCatalogRelease> =
                serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
                    path: file.clone(),
                    source,
                })?;
            for raw in shelf {
                releases.push(raw.into_release(&name)?);
            }
        }
        Catalog::from_releases(releases)
    }

    /// All releases of `name`, ascending by version; empty when the package
    /// is unknown.
    pub fn releases(&self, name: &PackageName) -> &[Release] {
        self.packages.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn release(&self, name: &PackageName, version: &Version) -> Option<&Release> {
        self.releases(name)
            .iter()
            .find(|release| release.version == *version)
    }

    pub fn contains(&self, name: &PackageName) -> bool {
        self.packages.contains_key(name)
    }

    pub fn package_names(&self) -> impl Iterator<Item = &PackageName> {
        self.packages.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Verify the catalog invariant: every prod-dep of every release names a
    /// catalog package holding at least one release of the same major with
    /// version >= the constraint (an exact match for branch constraints).
    /// Dev-deps are exempt; dev-deps of non-active releases are never used.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for shelf in self.packages.values() {
            for release in shelf {
                for dep in &release.deps {
                    if !self.contains(&dep.name) {
                        return Err(CatalogError::MissingDependency {
                            release: release.to_string(),
                            dep: dep.clone(),
                        });
                    }
                    if !self
                        .releases(&dep.name)
                        .iter()
                        .any(|candidate| satisfies(&candidate.version, &dep.version))
                    {
                        return Err(CatalogError::UnsatisfiableDependency {
                            release: release.to_string(),
                            dep: dep.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Whether `candidate` can stand in for a constraint of `minimum`: same
/// major and not older for semantic versions, exact match for branches.
pub(crate) fn satisfies(candidate: &Version, minimum: &Version) -> bool {
    candidate.compatible(minimum)
        && candidate.partial_cmp(minimum).is_some_and(Ordering::is_ge)
}

fn release_order(a: &Version, b: &Version) -> Ordering {
    match (a, b) {
        (Version::Semantic(x), Version::Semantic(y)) => x.cmp(y),
        (Version::Branch(x), Version::Branch(y)) => x.cmp(y),
        (Version::Semantic(_), Version::Branch(_)) => Ordering::Less,
        (Version::Branch(_), Version::Semantic(_)) => Ordering::Greater,
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalogRelease {
    version: String,
    #[serde(default)]
    deps: Vec<String>,
    #[serde(default, rename = "dev-deps")]
    dev_deps: Vec<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    branch: Option<String>,
}

impl RawCatalogRelease {
    fn into_release(self, name: &PackageName) -> Result<Release, PackageError> {
        Ok(Release {
            name: name.clone(),
            version: Version::parse(&self.version)?,
            deps: self
                .deps
                .iter()
                .map(|dep| dep.parse())
                .collect::<Result<Vec<_>, _>>()?,
            dev_deps: self
                .dev_deps
                .iter()
                .map(|dep| dep.parse())
                .collect::<Result<Vec<_>, _>>()?,
            origin: self
                .url
                .map(|url| SourceOrigin::from_manifest(url, self.branch)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn release(name: &str, version: &str, deps: &[&str]) -> Release {
        Release::new(name.parse().unwrap(), Version::parse(version).unwrap())
            .with_deps(deps.iter().map(|dep| dep.parse().unwrap()).collect())
    }

    #[test]
    fn releases_are_sorted_ascending() {
        let catalog = Catalog::from_releases([
            release("p", "1.4", &[]),
            release("p", "1.2", &[]),
            release("p", "2.0", &[]),
        ])
        .unwrap();
        let versions: Vec<String> = catalog
            .releases(&"p".parse().unwrap())
            .iter()
            .map(|release| release.version.to_string())
            .collect();
        assert_eq!(versions, ["1.2.0", "1.4.0", "2.0.0"]);
    }

    #[test]
    fn duplicate_releases_are_rejected() {
        let result = Catalog::from_releases([release("p", "1.2", &[]), release("p", "1.2.0", &[])]);
        assert!(matches!(result, Err(CatalogError::DuplicateRelease { .. })));
    }

    #[test]
    fn validate_requires_dependencies_to_exist() {
        let catalog = Catalog::from_releases([release("a", "1.0", &["b@1.0"])]).unwrap();
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::MissingDependency { .. })
        ));
    }

    #[test]
    fn validate_requires_a_satisfying_release() {
        // b exists only at 2.0, so a's constraint on b@1.0 has no candidate
        // with a matching major.
        let catalog = Catalog::from_releases([
            release("a", "1.0", &["b@1.0"]),
            release("b", "2.0", &[]),
        ])
        .unwrap();
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::UnsatisfiableDependency { .. })
        ));

        let catalog = Catalog::from_releases([
            release("a", "1.0", &["b@1.0"]),
            release("b", "1.3", &[]),
        ])
        .unwrap();
        catalog.validate().unwrap();
    }

    #[test]
    fn dev_deps_are_exempt_from_validation() {
        let catalog = Catalog::from_releases([Release::new(
            "a".parse().unwrap(),
            Version::parse("1.0").unwrap(),
        )
        .with_dev_deps(vec!["missing@1.0".parse().unwrap()])])
        .unwrap();
        catalog.validate().unwrap();
    }

    #[test]
    fn loads_a_catalog_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("catalog.json");
        fs::write(
            &path,
            r#"{
                "strings": [{"version": "1.0", "url": "https://example.com/strings.zip"}],
                "http": [
                    {"version": "1.2", "deps": ["strings@1.0"]},
                    {"version": "1.4", "deps": ["strings@1.0"], "dev-deps": ["testworks"]}
                ]
            }"#,
        )
        .unwrap();
        let catalog = Catalog::load(&path).unwrap();
        catalog.validate().unwrap();
        assert_eq!(catalog.releases(&"http".parse().unwrap()).len(), 2);
        assert!(catalog
            .release(
                &"strings".parse().unwrap(),
                &Version::parse("1.0").unwrap()
            )
            .is_some());
    }

    #[test]
    fn loads_a_catalog_directory() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("strings.json"),
            r#"[{"version": "1.0"}, {"version": "1.1"}]"#,
        )
        .unwrap();
        fs::write(temp.path().join("README.md"), "not a package").unwrap();
        let catalog = Catalog::load(temp.path()).unwrap();
        assert_eq!(catalog.releases(&"strings".parse().unwrap()).len(), 2);
    }
}
