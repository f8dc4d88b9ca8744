use anyhow::{Context, Result};
use clap::Parser;

use deft::cli::{Cli, Command, InstallArgs, ListArgs, UpdateArgs};
use deft::config;
use deft::update::{self, UpdateOptions};

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Update(args) => run_update(args),
        Command::Install(args) => run_install(args),
        Command::List(args) => run_list(args),
    }
}

fn run_update(args: UpdateArgs) -> Result<()> {
    let start = std::env::current_dir().context("unable to determine current directory")?;
    let options = UpdateOptions {
        global: args.global,
        catalog: args.catalog,
    };
    let report = update::update(&start, &options)?;

    if args.verbose {
        for release in &report.releases {
            let place = if report.active.contains(&release.name) {
                "workspace"
            } else {
                "store"
            };
            println!("  {release} ({place})");
        }
    }
    if report.installed > 0 {
        println!("Installed {} release(s).", report.installed);
    }
    if report.written == 0 {
        println!("Registry is up to date ({} entries checked).", report.checked);
    } else {
        println!(
            "Updated {} of {} registry entries.",
            report.written, report.checked
        );
    }
    for library in &report.missing_lids {
        eprintln!("warning: library `{library}` has no LID for this platform");
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

fn run_install(args: InstallArgs) -> Result<()> {
    let start = std::env::current_dir().context("unable to determine current directory")?;
    let options = UpdateOptions {
        global: args.global,
        catalog: args.catalog,
    };
    let report = update::install(&args.package, &start, &options)?;
    for release in &report.releases {
        println!("  {release}");
    }
    println!(
        "Installed {} release(s) into {} ({} already present).",
        report.installed,
        report.store_root.display(),
        report.releases.len() - report.installed
    );
    Ok(())
}

fn run_list(args: ListArgs) -> Result<()> {
    let config = config::load()?;
    let catalog = update::load_catalog(&config, args.catalog.as_deref())?;
    for name in catalog.package_names() {
        let releases = catalog.releases(name);
        if args.all {
            for release in releases {
                println!("{} {}", name, release.version);
            }
        } else if let Some(latest) = releases.last() {
            println!("{} {}", name, latest.version);
        }
    }
    Ok(())
}
