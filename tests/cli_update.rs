//! Binary-level behavior: exit codes and user-facing output.

mod support;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use support::{CatalogRelease, PackageSpec, Sandbox};

fn deft() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("deft");
    // Keep the test hermetic: never read a developer's real config.
    cmd.env("DEFT_CONFIG", "/nonexistent/deft-config.toml");
    cmd.env_remove("DEFT_CATALOG");
    cmd
}

#[test]
fn update_reports_writes_then_up_to_date() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[PackageSpec::new("app").with_deps(&["http@1.0"])]);
    let catalog = sandbox.catalog(&[CatalogRelease::new("http", "1.0")]);

    deft()
        .current_dir(&workspace)
        .args(["update", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed 1 release(s)."))
        .stdout(predicate::str::contains("Updated 2 of 2 registry entries."));

    deft()
        .current_dir(&workspace)
        .args(["update", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("Registry is up to date"));
}

#[test]
fn update_verbose_lists_the_resolved_releases() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[PackageSpec::new("app").with_deps(&["http@1.0"])]);
    let catalog = sandbox.catalog(&[CatalogRelease::new("http", "1.0")]);

    deft()
        .current_dir(&workspace)
        .args(["update", "--verbose", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("app 0.1.0 (workspace)"))
        .stdout(predicate::str::contains("http 1.0.0 (store)"));
}

#[test]
fn update_outside_a_workspace_fails() {
    let sandbox = Sandbox::new();
    let catalog = sandbox.catalog(&[CatalogRelease::new("http", "1.0")]);
    let empty = sandbox.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();

    deft()
        .current_dir(&empty)
        .args(["update", "--catalog"])
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no workspace found"));
}

#[test]
fn update_without_a_catalog_fails_with_guidance() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[PackageSpec::new("app")]);

    deft()
        .current_dir(&workspace)
        .arg("update")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no catalog configured"));
}

#[test]
fn list_shows_latest_releases_by_default() {
    let sandbox = Sandbox::new();
    let catalog = sandbox.catalog(&[
        CatalogRelease::new("http", "1.0"),
        CatalogRelease::new("http", "1.4"),
        CatalogRelease::new("strings", "2.0"),
    ]);

    deft()
        .args(["list", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("http 1.4.0"))
        .stdout(predicate::str::contains("strings 2.0.0"))
        .stdout(predicate::str::contains("http 1.0.0").not());

    deft()
        .args(["list", "--all", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("http 1.0.0"));
}

#[test]
fn install_resolves_and_reports_the_closure() {
    let sandbox = Sandbox::new();
    let workspace = sandbox.workspace(&[PackageSpec::new("app")]);
    let catalog = sandbox.catalog(&[
        CatalogRelease::new("http", "1.0").with_deps(&["strings@1.2"]),
        CatalogRelease::new("strings", "1.2"),
    ]);

    deft()
        .current_dir(&workspace)
        .args(["install", "http@1.0", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("http 1.0.0"))
        .stdout(predicate::str::contains("strings 1.2.0"))
        .stdout(predicate::str::contains("Installed 2 release(s)"));
}

#[test]
fn malformed_package_specs_are_rejected() {
    let sandbox = Sandbox::new();
    let catalog = sandbox.catalog(&[CatalogRelease::new("http", "1.0")]);

    deft()
        .args(["install", "http@", "--catalog"])
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid package spec"));
}
