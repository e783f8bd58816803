//! Configuration stores and the process-wide profile cache.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tenant::{CodeMapping, TenantProfile};
use crate::error::ConfigError;

/// Collaborator seam over whatever holds the tenant configuration.
///
/// Implementations may be arbitrarily slow; the engine only ever reads
/// through [`ConfigCache`].
pub trait ConfigStore: Send + Sync {
    /// All active tenant profiles with their nested rule sets.
    fn active_profiles(&self) -> Result<Vec<TenantProfile>, ConfigError>;

    /// Code-mapping table for one tenant and mapping type, keyed by
    /// uppercase code.
    fn code_mappings(
        &self,
        tenant_key: &str,
        mapping_type: &str,
    ) -> Result<HashMap<String, String>, ConfigError>;
}

/// On-disk configuration document: tenants plus their code mappings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub tenants: Vec<TenantProfile>,
    #[serde(default)]
    pub mappings: Vec<CodeMapping>,
}

fn active_of(config: &ConfigFile) -> Vec<TenantProfile> {
    config
        .tenants
        .iter()
        .filter(|t| t.is_active())
        .cloned()
        .collect()
}

fn mappings_of(
    config: &ConfigFile,
    tenant_key: &str,
    mapping_type: &str,
) -> Result<HashMap<String, String>, ConfigError> {
    if !config.tenants.iter().any(|t| t.tenant_key == tenant_key) {
        return Err(ConfigError::UnknownTenant(tenant_key.to_string()));
    }

    Ok(config
        .mappings
        .iter()
        .filter(|m| m.tenant_key == tenant_key && m.mapping_type == mapping_type)
        .map(|m| (m.code.to_uppercase(), m.display_name.clone()))
        .collect())
}

/// In-memory store, used in tests and by embedding callers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    config: ConfigFile,
}

impl InMemoryConfigStore {
    pub fn new(tenants: Vec<TenantProfile>, mappings: Vec<CodeMapping>) -> Self {
        Self {
            config: ConfigFile { tenants, mappings },
        }
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn active_profiles(&self) -> Result<Vec<TenantProfile>, ConfigError> {
        Ok(active_of(&self.config))
    }

    fn code_mappings(
        &self,
        tenant_key: &str,
        mapping_type: &str,
    ) -> Result<HashMap<String, String>, ConfigError> {
        mappings_of(&self.config, tenant_key, mapping_type)
    }
}

/// Store backed by a JSON configuration file, loaded once at construction.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    config: ConfigFile,
}

impl JsonConfigStore {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ConfigFile =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        debug!(
            "loaded {} tenants and {} code mappings",
            config.tenants.len(),
            config.mappings.len()
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }
}

impl ConfigStore for JsonConfigStore {
    fn active_profiles(&self) -> Result<Vec<TenantProfile>, ConfigError> {
        Ok(active_of(&self.config))
    }

    fn code_mappings(
        &self,
        tenant_key: &str,
        mapping_type: &str,
    ) -> Result<HashMap<String, String>, ConfigError> {
        mappings_of(&self.config, tenant_key, mapping_type)
    }
}

/// Read-through cache over a [`ConfigStore`].
///
/// Profiles only change when an external administration process edits
/// them, so they are loaded once and held until [`ConfigCache::invalidate`]
/// is called. Profiles are sorted by tenant key ascending, which fixes the
/// classifier's tie-breaking order.
pub struct ConfigCache {
    store: Arc<dyn ConfigStore>,
    profiles: RwLock<Option<Arc<Vec<TenantProfile>>>>,
}

impl ConfigCache {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            profiles: RwLock::new(None),
        }
    }

    pub fn active_profiles(&self) -> Result<Arc<Vec<TenantProfile>>, ConfigError> {
        if let Some(profiles) = self.profiles.read().unwrap().as_ref() {
            return Ok(Arc::clone(profiles));
        }

        let mut profiles = self.store.active_profiles()?;
        profiles.sort_by(|a, b| a.tenant_key.cmp(&b.tenant_key));
        info!("loaded {} active tenant configs", profiles.len());

        let profiles = Arc::new(profiles);
        *self.profiles.write().unwrap() = Some(Arc::clone(&profiles));
        Ok(profiles)
    }

    /// Uncached passthrough; mapping tables are small and fetched per call.
    pub fn code_mappings(
        &self,
        tenant_key: &str,
        mapping_type: &str,
    ) -> Result<HashMap<String, String>, ConfigError> {
        self.store.code_mappings(tenant_key, mapping_type)
    }

    /// Drop the cached profile set. Call after any configuration edit.
    pub fn invalidate(&self) {
        info!("invalidating tenant config cache");
        *self.profiles.write().unwrap() = None;
    }
}
