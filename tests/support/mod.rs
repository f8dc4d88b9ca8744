//! Shared builders for integration tests: throwaway workspaces, on-disk
//! catalogs, and zip archives standing in for release sources.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    pub fn new() -> Sandbox {
        Sandbox {
            temp: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Create a workspace directory holding `workspace.json` plus one
    /// subdirectory per package.
    pub fn workspace(&self, packages: &[PackageSpec]) -> PathBuf {
        let root = self.path().join("workspace");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("workspace.json"), "{}").unwrap();
        for package in packages {
            let dir = root.join(package.name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("dylan-package.json"), package.manifest()).unwrap();
            for (file, contents) in &package.files {
                let path = dir.join(file);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
            }
        }
        root
    }

    /// Write a `catalog.json` whose releases fetch from local zip archives.
    pub fn catalog(&self, releases: &[CatalogRelease]) -> PathBuf {
        let mut packages = serde_json::Map::new();
        for release in releases {
            let archive = self.zip_archive(release);
            let entry = json!({
                "version": release.version,
                "deps": release.deps,
                "url": format!("file://{}", archive.display()),
            });
            packages
                .entry(release.name.to_string())
                .or_insert_with(|| json!([]))
                .as_array_mut()
                .unwrap()
                .push(entry);
        }
        let path = self.path().join("catalog.json");
        fs::write(&path, serde_json::Value::Object(packages).to_string()).unwrap();
        path
    }

    fn zip_archive(&self, release: &CatalogRelease) -> PathBuf {
        let dir = self.path().join("archives");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}-{}.zip", release.name, release.version));
        let file = fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, contents) in &release.files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }
}

/// An active package to be placed in a workspace subdirectory.
pub struct PackageSpec {
    pub name: &'static str,
    pub deps: Vec<&'static str>,
    pub files: Vec<(&'static str, String)>,
}

impl PackageSpec {
    pub fn new(name: &'static str) -> PackageSpec {
        PackageSpec {
            name,
            deps: Vec::new(),
            files: vec![(
                "library.lid",
                format!("Library: {name}\nFiles: {name}\n"),
            )],
        }
    }

    pub fn with_deps(mut self, deps: &[&'static str]) -> PackageSpec {
        self.deps = deps.to_vec();
        self
    }

    fn manifest(&self) -> String {
        let deps = self
            .deps
            .iter()
            .map(|dep| format!("\"{dep}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"{{"name": "{}", "version": "0.1.0", "dependencies": [{deps}]}}"#,
            self.name
        )
    }
}

/// A catalog release backed by a zip archive of the given files.
pub struct CatalogRelease {
    pub name: &'static str,
    pub version: &'static str,
    pub deps: Vec<&'static str>,
    pub files: Vec<(&'static str, String)>,
}

impl CatalogRelease {
    pub fn new(name: &'static str, version: &'static str) -> CatalogRelease {
        CatalogRelease {
            name,
            version,
            deps: Vec::new(),
            files: vec![(
                "library.lid",
                format!("Library: {name}\nFiles: {name}\n"),
            )],
        }
    }

    pub fn with_deps(mut self, deps: &[&'static str]) -> CatalogRelease {
        self.deps = deps.to_vec();
        self
    }
}
