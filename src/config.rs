use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Tool-level configuration, loaded from `config.toml`. Everything here has
/// a sensible default; a missing file is not an error.
#[derive(Debug, Default, Deserialize)]
pub struct DeftConfig {
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogSection {
    /// Path to a catalog file or directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreSection {
    /// Per-user package store, used by `--global` installs.
    pub directory: Option<PathBuf>,
}

pub fn load() -> Result<DeftConfig> {
    let path_override = std::env::var("DEFT_CONFIG").ok();
    load_from(path_override.as_deref())
}

pub fn load_from(path_override: Option<&str>) -> Result<DeftConfig> {
    let Some(path) = path_override.map(PathBuf::from).or_else(config_path) else {
        return Ok(DeftConfig::default());
    };
    if !path.exists() {
        return Ok(DeftConfig::default());
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: DeftConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}

pub fn config_path() -> Option<PathBuf> {
    // Prefer the XDG-style config path, falling back to ~/.deft/config.toml.
    if let Some(mut dir) = dirs::config_dir() {
        dir.push("deft");
        dir.push("config.toml");
        if dir.exists() {
            return Some(dir);
        }
    }
    dirs::home_dir().map(|mut home| {
        home.push(".deft");
        home.push("config.toml");
        home
    })
}

/// Where the catalog lives: an explicit CLI path wins, then `DEFT_CATALOG`,
/// then the config file.
pub fn catalog_location(config: &DeftConfig, cli_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_override {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("DEFT_CATALOG") {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = &config.catalog.path {
        return Ok(path.clone());
    }
    bail!(
        "no catalog configured; pass --catalog, set DEFT_CATALOG, or add `[catalog] path` to {}",
        config_path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "the deft config".to_string())
    );
}

/// The per-user package store used with `--global`.
pub fn global_store_dir(config: &DeftConfig) -> PathBuf {
    if let Some(dir) = &config.store.directory {
        return dir.clone();
    }
    dirs::data_dir()
        .map(|dir| dir.join("deft").join("packages"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".deft").join("packages"))
                .unwrap_or_else(|| PathBuf::from(".deft-packages"))
        })
}
