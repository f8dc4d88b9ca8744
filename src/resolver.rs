//! Minimum Version Selection over the catalog.
//!
//! Resolution starts from the workspace's root dependencies and repeatedly
//! selects, for each required package, the *smallest* catalog release that
//! satisfies every stated minimum within one major version. Learning a
//! higher minimum later raises the choice; downgrades never happen. Dev
//! dependencies are consulted for the roots only and never propagate.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use thiserror::Error;

use crate::catalog::{Catalog, satisfies};
use crate::dep::{Dep, PackageName};
use crate::release::Release;
use crate::version::Version;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("package `{name}` is not in the catalog{chain}")]
    Missing { name: PackageName, chain: String },
    #[error("no release of `{name}` satisfies `{requested}`{chain}")]
    NoCandidate {
        name: PackageName,
        requested: Version,
        chain: String,
    },
    #[error("conflicting requirements for `{name}`: {left} is incompatible with {right}{chain}")]
    Conflict {
        name: PackageName,
        left: Version,
        right: Version,
        chain: String,
    },
    #[error("dependency cycle: {chain}")]
    Cycle { chain: String },
}

/// The outcome of a successful resolution: the transitive closure of chosen
/// releases (sorted by package name) plus non-fatal warnings to surface at
/// the end of the run.
#[derive(Debug)]
pub struct Resolution {
    pub releases: Vec<Release>,
    pub warnings: Vec<String>,
}

/// The higher of two releases of the same package, or a conflict when their
/// versions are incompatible.
pub fn max_release<'a>(a: &'a Release, b: &'a Release) -> Result<&'a Release, ResolveError> {
    match a.version.max(&b.version) {
        Some(version) if *version == a.version => Ok(a),
        Some(_) => Ok(b),
        None => Err(ResolveError::Conflict {
            name: a.name.clone(),
            left: a.version.clone(),
            right: b.version.clone(),
            chain: String::new(),
        }),
    }
}

pub struct Resolver<'a> {
    catalog: &'a Catalog,
    active: BTreeMap<PackageName, Release>,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Resolver<'a> {
        Resolver {
            catalog,
            active: BTreeMap::new(),
        }
    }

    /// Register workspace-local releases. An active release shadows every
    /// catalog entry of the same name and is never upgraded.
    pub fn with_active(mut self, releases: impl IntoIterator<Item = Release>) -> Resolver<'a> {
        for release in releases {
            self.active.insert(release.name.clone(), release);
        }
        self
    }

    /// Resolve the workspace: roots are the prod- and dev-deps of every
    /// active release.
    pub fn resolve(&self) -> Result<Resolution, ResolveError> {
        let mut prod_roots = Vec::new();
        let mut dev_roots = Vec::new();
        for release in self.active.values() {
            prod_roots.extend(release.deps.iter().cloned());
            dev_roots.extend(release.dev_deps.iter().cloned());
        }
        self.resolve_deps(&prod_roots, &dev_roots)
    }

    /// Resolve an explicit set of root deps against the catalog.
    pub fn resolve_deps(
        &self,
        prod_roots: &[Dep],
        dev_roots: &[Dep],
    ) -> Result<Resolution, ResolveError> {
        let mut walk = Walk {
            catalog: self.catalog,
            active: &self.active,
            chosen: self.active.clone(),
            requesters: BTreeMap::new(),
            warnings: Vec::new(),
        };

        walk.close_over(
            prod_roots
                .iter()
                .map(|dep| (dep.clone(), None))
                .collect(),
        )?;
        let prod_required: BTreeSet<PackageName> = walk.chosen.keys().cloned().collect();
        walk.absorb_dev_roots(dev_roots, &prod_required)?;
        walk.detect_cycles()?;

        Ok(Resolution {
            releases: walk.chosen.into_values().collect(),
            warnings: walk.warnings,
        })
    }
}

struct Walk<'a> {
    catalog: &'a Catalog,
    active: &'a BTreeMap<PackageName, Release>,
    chosen: BTreeMap<PackageName, Release>,
    requesters: BTreeMap<PackageName, Option<PackageName>>,
    warnings: Vec<String>,
}

impl Walk<'_> {
    /// Drain a worklist of deps, growing `chosen` to the transitive closure
    /// over prod-deps. Terminates because an entry only ever moves to a
    /// strictly higher version within a finite candidate set.
    fn close_over(
        &mut self,
        mut queue: VecDeque<(Dep, Option<PackageName>)>,
    ) -> Result<(), ResolveError> {
        while let Some((dep, requester)) = queue.pop_front() {
            self.requesters
                .entry(dep.name.clone())
                .or_insert_with(|| requester.clone());

            if let Some(active) = self.active.get(&dep.name) {
                // Active releases are pinned; they satisfy or conflict, but
                // are never replaced by a catalog release.
                if !active.version.compatible(&dep.version) {
                    return Err(self.conflict(&dep.name, &active.version, &dep.version, requester));
                }
                continue;
            }

            if let Some(current) = self.chosen.get(&dep.name) {
                if !current.version.compatible(&dep.version) {
                    return Err(self.conflict(
                        &dep.name,
                        &current.version,
                        &dep.version,
                        requester,
                    ));
                }
                if satisfies(&current.version, &dep.version) {
                    continue;
                }
                // A higher minimum was learned; raise the choice.
                let upgraded = self.candidate(&dep, requester.as_ref())?.clone();
                self.enqueue_deps(&upgraded, &mut queue);
                self.chosen.insert(dep.name.clone(), upgraded);
                continue;
            }

            let selected = self.candidate(&dep, requester.as_ref())?.clone();
            self.enqueue_deps(&selected, &mut queue);
            self.chosen.insert(dep.name.clone(), selected);
        }
        Ok(())
    }

    fn enqueue_deps(&self, release: &Release, queue: &mut VecDeque<(Dep, Option<PackageName>)>) {
        for dep in &release.deps {
            queue.push_back((dep.clone(), Some(release.name.clone())));
        }
    }

    /// Fold the workspace's dev-deps in. A dev minimum never raises a
    /// release that regular dependencies already require: within one major
    /// the prod choice wins and the dev constraint is dropped with a
    /// warning; across majors the disagreement is a conflict.
    fn absorb_dev_roots(
        &mut self,
        dev_roots: &[Dep],
        prod_required: &BTreeSet<PackageName>,
    ) -> Result<(), ResolveError> {
        for dep in dev_roots {
            if let Some(active) = self.active.get(&dep.name) {
                if !active.version.compatible(&dep.version) {
                    return Err(self.conflict(&dep.name, &active.version, &dep.version, None));
                }
                continue;
            }
            if prod_required.contains(&dep.name) {
                let current = &self.chosen[&dep.name];
                if !current.version.compatible(&dep.version) {
                    return Err(self.conflict(&dep.name, &current.version, &dep.version, None));
                }
                if !satisfies(&current.version, &dep.version) {
                    self.warnings.push(format!(
                        "dev dependency `{dep}` ignored: `{current}` is required by regular dependencies"
                    ));
                }
                continue;
            }
            self.close_over(VecDeque::from([(dep.clone(), None)]))?;
        }
        Ok(())
    }

    /// The smallest catalog release satisfying `dep` (exact match for branch
    /// constraints). Relies on the catalog's ascending version order.
    fn candidate(
        &self,
        dep: &Dep,
        requester: Option<&PackageName>,
    ) -> Result<&Release, ResolveError> {
        let releases = self.catalog.releases(&dep.name);
        if releases.is_empty() {
            return Err(ResolveError::Missing {
                name: dep.name.clone(),
                chain: self.chain(requester),
            });
        }
        releases
            .iter()
            .find(|release| satisfies(&release.version, &dep.version))
            .ok_or_else(|| ResolveError::NoCandidate {
                name: dep.name.clone(),
                requested: dep.version.clone(),
                chain: self.chain(requester),
            })
    }

    /// Three-color depth-first search over the chosen prod-dep graph, keyed
    /// by package name. Dev-dep edges do not participate.
    fn detect_cycles(&self) -> Result<(), ResolveError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Open,
            Done,
        }

        let mut marks: BTreeMap<&PackageName, Mark> = BTreeMap::new();
        let mut path: Vec<&PackageName> = Vec::new();

        fn visit<'w>(
            name: &'w PackageName,
            chosen: &'w BTreeMap<PackageName, Release>,
            marks: &mut BTreeMap<&'w PackageName, Mark>,
            path: &mut Vec<&'w PackageName>,
        ) -> Result<(), ResolveError> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Open) => {
                    let start = path.iter().position(|seen| *seen == name).unwrap_or(0);
                    let mut names: Vec<String> =
                        path[start..].iter().map(|n| format!("`{n}`")).collect();
                    names.push(format!("`{name}`"));
                    return Err(ResolveError::Cycle {
                        chain: names.join(" -> "),
                    });
                }
                None => {}
            }
            marks.insert(name, Mark::Open);
            path.push(name);
            if let Some(release) = chosen.get(name) {
                for dep in &release.deps {
                    if chosen.contains_key(&dep.name) {
                        visit(&dep.name, chosen, marks, path)?;
                    }
                }
            }
            path.pop();
            marks.insert(name, Mark::Done);
            Ok(())
        }

        for name in self.chosen.keys() {
            visit(name, &self.chosen, &mut marks, &mut path)?;
        }
        Ok(())
    }

    fn conflict(
        &self,
        name: &PackageName,
        left: &Version,
        right: &Version,
        requester: Option<PackageName>,
    ) -> ResolveError {
        ResolveError::Conflict {
            name: name.clone(),
            left: left.clone(),
            right: right.clone(),
            chain: self.chain(requester.as_ref()),
        }
    }

    /// Render the requester chain for error context, walking back toward the
    /// roots: `` (required by `b` <- `a`)``.
    fn chain(&self, requester: Option<&PackageName>) -> String {
        let Some(start) = requester else {
            return String::new();
        };
        let mut seen = BTreeSet::new();
        let mut parts = Vec::new();
        let mut current = start;
        loop {
            if !seen.insert(current.clone()) {
                break;
            }
            parts.push(format!("`{current}`"));
            match self.requesters.get(current) {
                Some(Some(next)) => current = next,
                _ => break,
            }
        }
        format!(" (required by {})", parts.join(" <- "))
    }
}
