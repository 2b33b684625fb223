//! Configuration.
//!
//! [`Config`] is the in-process state the engine reads: registered adapters,
//! the active adapter and explicit entity types. [`FileConfig`] is its on-disk
//! form, used by the command-line front end:
//!
//! ```toml
//! adapter = "memory"
//! fixture = "store.json"
//!
//! [entities]
//! user_by_email = "Account"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapter::AdapterFactory;
use crate::adapter::memory::{self, MemoryAdapterFactory, MemoryStore};
use crate::entity::EntityType;
use crate::error::{GetError, GetResult};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "GET_CONFIG";

#[derive(Clone, Default)]
pub struct Config {
    adapter: Option<String>,
    adapters: BTreeMap<String, Arc<dyn AdapterFactory>>,
    entities: HashMap<String, EntityType>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("adapter", &self.adapter)
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .field("entities", &self.entities)
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an adapter selectable under `name`.
    pub fn register_adapter(&mut self, name: impl Into<String>, factory: Arc<dyn AdapterFactory>) {
        self.adapters.insert(name.into(), factory);
    }

    /// Select the active adapter.
    pub fn use_adapter(&mut self, name: impl Into<String>) {
        self.adapter = Some(name.into());
    }

    pub fn adapter_name(&self) -> Option<&str> {
        self.adapter.as_deref()
    }

    /// The active adapter.
    pub fn adapter(&self) -> GetResult<Arc<dyn AdapterFactory>> {
        let name = self
            .adapter
            .as_deref()
            .ok_or_else(|| GetError::base("Adapter has not been configured"))?;
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| GetError::Config(format!("Unknown adapter '{name}'")))
    }

    /// Register an explicit entity type for a canonical key (`user_by_email`).
    pub fn register_entity(&mut self, key: impl Into<String>, entity_type: EntityType) {
        self.entities.insert(key.into(), entity_type);
    }

    pub fn entity_for(&self, key: &str) -> Option<&EntityType> {
        self.entities.get(key)
    }
}

/// On-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Adapter name; defaults to the memory adapter.
    pub adapter: Option<String>,
    /// JSON fixture for the memory adapter, relative to the config file.
    pub fixture: Option<PathBuf>,
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

impl FileConfig {
    /// `<config dir>/get/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("get").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> GetResult<Self> {
        toml::from_str(content).map_err(|e| GetError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> GetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(fixture), Some(dir)) = (&config.fixture, path.parent()) {
            if fixture.is_relative() {
                config.fixture = Some(dir.join(fixture));
            }
        }
        Ok(config)
    }

    /// Build the in-process configuration, loading the fixture if any.
    pub fn into_config(self) -> GetResult<Config> {
        let store = match &self.fixture {
            Some(path) => MemoryStore::load(path)?,
            None => MemoryStore::default(),
        };

        let mut config = Config::new();
        config.register_adapter(memory::NAME, Arc::new(MemoryAdapterFactory::new(store)));
        config.use_adapter(self.adapter.unwrap_or_else(|| memory::NAME.to_string()));
        for (key, name) in self.entities {
            config.register_entity(key, EntityType::new(name));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unconfigured_adapter() {
        let err = Config::new().adapter().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Base);
        assert_eq!(err.to_string(), "Adapter has not been configured");

        let mut config = Config::new();
        config.use_adapter("postgres");
        assert_eq!(config.adapter().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn test_parse_file_config() {
        let config = FileConfig::from_toml(
            r#"
            adapter = "memory"
            fixture = "store.json"

            [entities]
            user_by_email = "Account"
            "#,
        )
        .unwrap();
        assert_eq!(config.adapter.as_deref(), Some("memory"));
        assert_eq!(config.fixture, Some(PathBuf::from("store.json")));
        assert_eq!(config.entities.get("user_by_email").map(String::as_str), Some("Account"));

        assert!(FileConfig::from_toml("adapter = [").is_err());
    }

    #[test]
    fn test_into_config_defaults_to_memory() {
        let mut file = FileConfig::default();
        file.entities
            .insert("users_by_status".to_string(), "Members".to_string());
        let config = file.into_config().unwrap();
        assert_eq!(config.adapter_name(), Some(memory::NAME));
        assert!(config.adapter().is_ok());
        assert_eq!(
            config.entity_for("users_by_status").map(EntityType::name),
            Some("Members")
        );
    }
}
