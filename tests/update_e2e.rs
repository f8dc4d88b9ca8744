//! Full `update` runs over throwaway workspaces, with releases fetched from
//! local zip archives.

mod support;

use deft::store::PACKAGES_DIR;
use deft::update::{self, UpdateOptions};
use support::{CatalogRelease, PackageSpec, Sandbox};

#[test]
fn update_installs_dependencies_and_writes_the_registry() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[
        PackageSpec::new("app").with_deps(&["http@1.0"]),
        PackageSpec::new("tools"),
    ]);
    let catalog = sandbox.catalog(&[
        CatalogRelease::new("http", "1.0").with_deps(&["strings@1.2"]),
        CatalogRelease::new("strings", "1.2"),
    ]);
    let options = UpdateOptions {
        global: false,
        catalog: Some(catalog),
    };

    let report = update::update(&workspace, &options).unwrap();

    // Two active packages plus two installed dependencies.
    assert_eq!(report.releases.len(), 4);
    assert_eq!(report.installed, 2);
    assert_eq!(report.written, 4);
    assert!(report.missing_lids.is_empty());

    let store = workspace.join(PACKAGES_DIR);
    assert!(store.join("http/1.0.0/src/library.lid").is_file());
    assert!(store.join("strings/1.2.0/src/library.lid").is_file());

    let registry = workspace.join("registry/generic");
    for library in ["app", "tools", "http", "strings"] {
        let entry = registry.join(library);
        assert!(entry.is_file(), "missing registry entry for {library}");
        let contents = std::fs::read_to_string(&entry).unwrap();
        assert!(
            contents.starts_with("abstract://"),
            "bad entry contents: {contents}"
        );
        assert!(contents.ends_with(".lid\n"));
    }
}

#[test]
fn a_second_update_is_a_no_op() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[PackageSpec::new("app").with_deps(&["http@1.0"])]);
    let catalog = sandbox.catalog(&[CatalogRelease::new("http", "1.0")]);
    let options = UpdateOptions {
        global: false,
        catalog: Some(catalog),
    };

    let first = update::update(&workspace, &options).unwrap();
    assert_eq!(first.installed, 1);
    assert_eq!(first.written, 2);

    let second = update::update(&workspace, &options).unwrap();
    assert_eq!(second.installed, 0);
    assert_eq!(second.written, 0);
    assert_eq!(second.checked, 2);
}

#[test]
fn installed_dependencies_keep_their_platform_entries() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[PackageSpec::new("app").with_deps(&["net@2.1"])]);
    let mut net = CatalogRelease::new("net", "2.1");
    net.files = vec![(
        "net.lid",
        "Library: net\nPlatforms: x86_64-linux\n   aarch64-linux\n".to_string(),
    )];
    let catalog = sandbox.catalog(&[net]);
    let options = UpdateOptions {
        global: false,
        catalog: Some(catalog),
    };

    let report = update::update(&workspace, &options).unwrap();
    assert!(workspace.join("registry/x86_64-linux/net").is_file());
    assert!(workspace.join("registry/aarch64-linux/net").is_file());
    assert!(!workspace.join("registry/generic/net").exists());
    // app's own LID is platform-independent.
    assert!(workspace.join("registry/generic/app").is_file());
    assert_eq!(report.written, 3);
}

#[test]
fn resolution_failures_abort_before_any_install() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[PackageSpec::new("app").with_deps(&["ghost@1.0"])]);
    let catalog = sandbox.catalog(&[CatalogRelease::new("http", "1.0")]);
    let options = UpdateOptions {
        global: false,
        catalog: Some(catalog),
    };

    let err = update::update(&workspace, &options).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("ghost"), "unexpected error: {message}");
    assert!(!workspace.join(PACKAGES_DIR).exists());
    assert!(!workspace.join("registry").exists());
}

#[test]
fn install_populates_the_store_without_a_registry() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[PackageSpec::new("app")]);
    let catalog = sandbox.catalog(&[
        CatalogRelease::new("http", "1.0").with_deps(&["strings@1.2"]),
        CatalogRelease::new("strings", "1.2"),
    ]);
    let options = UpdateOptions {
        global: false,
        catalog: Some(catalog),
    };

    let report = update::install("http@1.0", &workspace, &options).unwrap();
    assert_eq!(report.installed, 2);
    assert!(workspace.join(PACKAGES_DIR).join("http/1.0.0/src").is_dir());
    assert!(!workspace.join("registry").exists());

    // Installing again finds everything present.
    let again = update::install("http@1.0", &workspace, &options).unwrap();
    assert_eq!(again.installed, 0);
}
