use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "deft")]
#[command(version)]
#[command(about = "Workspace and package manager for Dylan")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the workspace into a buildable state: resolve dependencies,
    /// install missing releases, and regenerate the registry
    Update(UpdateArgs),
    /// Install a package and its dependencies into the store
    Install(InstallArgs),
    /// List the packages in the catalog
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Install releases into the per-user store instead of the workspace
    #[arg(long)]
    pub global: bool,
    /// Print the resolved release set
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Catalog file or directory (overrides DEFT_CATALOG and config)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Package to install, as `name` or `name@version`
    pub package: String,
    /// Install into the per-user store instead of the workspace
    #[arg(long)]
    pub global: bool,
    /// Catalog file or directory (overrides DEFT_CATALOG and config)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show every release instead of just the latest
    #[arg(long)]
    pub all: bool,
    /// Catalog file or directory (overrides DEFT_CATALOG and config)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}
