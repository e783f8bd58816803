//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::PathBuf;
use std::sync::Arc;

use invex_core::{ConfigCache, ExtractionService, JsonConfigStore};

/// Default tenant configuration location: the working directory first,
/// then the user's config directory.
pub(crate) fn default_config_path() -> PathBuf {
    let local = PathBuf::from("tenants.json");
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("tenants.json")
}

pub(crate) fn resolve_config_path(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Build the extraction service from the tenant configuration file.
pub(crate) fn load_service(config_path: Option<&str>) -> anyhow::Result<ExtractionService> {
    let path = resolve_config_path(config_path);

    if !path.exists() {
        anyhow::bail!(
            "Tenant configuration not found at {}. Run 'invex config init' to create one.",
            path.display()
        );
    }

    let store = JsonConfigStore::from_path(&path)?;
    Ok(ExtractionService::new(Arc::new(ConfigCache::new(Arc::new(
        store,
    )))))
}
