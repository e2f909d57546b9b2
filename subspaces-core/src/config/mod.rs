//! Configuration management
//!
//! Settings come from a TOML file, from `SUBSPACES_*` environment variables,
//! or both: [`Config::apply_env`] overlays the environment onto a loaded file.
//!
//! ```toml
//! [logging]
//! level = "info"
//! json_format = false
//!
//! [store]
//! backend = "sqlite"
//! sqlite_path = "subspaces.db"
//! pool_size = 4
//!
//! [permissions]
//! registered = ["write", "moderate content", "set permissions"]
//!
//! [address]
//! bech32_prefix = "desmos"
//! ```

mod error;

pub use error::ConfigError;

use crate::core_subspaces::{
    AddressValidator, Bech32Validator, Keeper, KvStore, MemoryStore, PermissionRegistry,
    SqliteStore,
};
use crate::logging::{LogConfig, LogLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

const ENV_LOG_LEVEL: &str = "SUBSPACES_LOG_LEVEL";
const ENV_LOG_JSON: &str = "SUBSPACES_LOG_JSON";
const ENV_LOG_TIMESTAMP: &str = "SUBSPACES_LOG_TIMESTAMP";
const ENV_LOG_TARGET: &str = "SUBSPACES_LOG_TARGET";
const ENV_STORE_BACKEND: &str = "SUBSPACES_STORE_BACKEND";
const ENV_STORE_PATH: &str = "SUBSPACES_STORE_PATH";
const ENV_STORE_POOL_SIZE: &str = "SUBSPACES_STORE_POOL_SIZE";
const ENV_PERMISSIONS: &str = "SUBSPACES_PERMISSIONS";
const ENV_ADDRESS_PREFIX: &str = "SUBSPACES_ADDRESS_PREFIX";

/// Longest human-readable part a bech32 string may carry
const MAX_BECH32_PREFIX_LEN: usize = 83;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LogConfig,
    pub store: StoreConfig,
    pub permissions: PermissionsConfig,
    pub address: AddressConfig,
}

/// Which [`KvStore`] backs the keeper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown store backend: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file, only used by the SQLite backend
    pub sqlite_path: PathBuf,
    pub pool_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite_path: PathBuf::from("subspaces.db"),
            pool_size: 4,
        }
    }
}

/// Permissions registered at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Human-readable permission names; empty registers every known permission
    pub registered: Vec<String>,
}

/// Address validation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressConfig {
    pub bech32_prefix: String,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            bech32_prefix: "desmos".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::FileWriteError(format!("{}: {}", path.display(), e)))
    }

    /// Override fields with the `SUBSPACES_*` variables `lookup` returns
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level
                .parse::<LogLevel>()
                .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", ENV_LOG_LEVEL, e)))?;
        }
        if let Some(value) = lookup(ENV_LOG_JSON) {
            self.logging.json_format = parse_bool(ENV_LOG_JSON, &value)?;
        }
        if let Some(value) = lookup(ENV_LOG_TIMESTAMP) {
            self.logging.with_timestamp = parse_bool(ENV_LOG_TIMESTAMP, &value)?;
        }
        if let Some(value) = lookup(ENV_LOG_TARGET) {
            self.logging.with_target = parse_bool(ENV_LOG_TARGET, &value)?;
        }

        if let Some(backend) = lookup(ENV_STORE_BACKEND) {
            self.store.backend = backend.parse()?;
        }
        if let Some(path) = lookup(ENV_STORE_PATH) {
            self.store.sqlite_path = PathBuf::from(path);
        }
        if let Some(size) = lookup(ENV_STORE_POOL_SIZE) {
            self.store.pool_size = size.trim().parse().map_err(|e| {
                ConfigError::InvalidValue(format!("{}: {}", ENV_STORE_POOL_SIZE, e))
            })?;
        }

        if let Some(names) = lookup(ENV_PERMISSIONS) {
            self.permissions.registered = names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(prefix) = lookup(ENV_ADDRESS_PREFIX) {
            self.address.bech32_prefix = prefix.trim().to_string();
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Sqlite {
            if self.store.pool_size == 0 {
                return Err(ConfigError::ValidationFailed(
                    "store.pool_size must be at least 1".to_string(),
                ));
            }
            if self.store.sqlite_path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "store.sqlite_path must not be empty".to_string(),
                ));
            }
        }

        let prefix = &self.address.bech32_prefix;
        if prefix.is_empty() || prefix.len() > MAX_BECH32_PREFIX_LEN {
            return Err(ConfigError::ValidationFailed(format!(
                "address.bech32_prefix must be 1 to {} characters",
                MAX_BECH32_PREFIX_LEN
            )));
        }
        if !prefix.bytes().all(|b| (33..=126).contains(&b)) {
            return Err(ConfigError::ValidationFailed(format!(
                "address.bech32_prefix contains invalid characters: {}",
                prefix
            )));
        }

        self.build_registry().map(|_| ())
    }

    /// Build the permission registry from `permissions.registered`
    pub fn build_registry(&self) -> Result<PermissionRegistry, ConfigError> {
        if self.permissions.registered.is_empty() {
            return Ok(PermissionRegistry::all());
        }
        PermissionRegistry::from_names(self.permissions.registered.iter().map(String::as_str))
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))
    }

    pub fn address_validator(&self) -> Arc<dyn AddressValidator> {
        Arc::new(Bech32Validator::new(self.address.bech32_prefix.as_str()))
    }

    pub fn log_config(&self) -> LogConfig {
        self.logging.clone()
    }

    /// Open the configured store backend
    pub fn open_store(&self) -> Result<Box<dyn KvStore>, ConfigError> {
        match self.store.backend {
            StoreBackend::Memory => Ok(Box::new(MemoryStore::new())),
            StoreBackend::Sqlite => {
                let store = SqliteStore::open(&self.store.sqlite_path, self.store.pool_size)
                    .map_err(|e| ConfigError::StoreError(e.to_string()))?;
                Ok(Box::new(store))
            }
        }
    }

    /// Validate, then assemble a keeper over the configured store
    pub fn build_keeper(&self) -> Result<Keeper<Box<dyn KvStore>>, ConfigError> {
        self.validate()?;
        let keeper = Keeper::new(
            self.open_store()?,
            self.build_registry()?,
            self.address_validator(),
        );
        info!(
            backend = %self.store.backend,
            permissions = keeper.registry().registered().len(),
            prefix = %self.address.bech32_prefix,
            "Keeper initialized"
        );
        Ok(keeper)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "{}: expected a boolean, got {}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_subspaces::Permission;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.address.bech32_prefix, "desmos");
        assert!(config.permissions.registered.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(lookup(&[
                ("SUBSPACES_LOG_LEVEL", "debug"),
                ("SUBSPACES_LOG_JSON", "true"),
                ("SUBSPACES_STORE_BACKEND", "sqlite"),
                ("SUBSPACES_STORE_POOL_SIZE", "8"),
                ("SUBSPACES_PERMISSIONS", "write, set permissions,,"),
                ("SUBSPACES_ADDRESS_PREFIX", "cosmos"),
            ]))
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.json_format);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.pool_size, 8);
        assert_eq!(config.permissions.registered, vec!["write", "set permissions"]);
        assert_eq!(config.address.bech32_prefix, "cosmos");
    }

    #[test]
    fn test_apply_env_rejects_bad_values() {
        let mut config = Config::default();
        let err = config
            .apply_env(lookup(&[("SUBSPACES_STORE_POOL_SIZE", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        let err = config
            .apply_env(lookup(&[("SUBSPACES_LOG_JSON", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        let err = config
            .apply_env(lookup(&[("SUBSPACES_STORE_BACKEND", "redis")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.pool_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));

        let mut config = Config::default();
        config.address.bech32_prefix = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.permissions.registered = vec!["fly".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_registry() {
        let config = Config::default();
        let registry = config.build_registry().unwrap();
        assert!(registry.is_registered(Permission::ManageSections));

        let mut config = Config::default();
        config.permissions.registered = vec!["write".to_string()];
        let registry = config.build_registry().unwrap();
        assert!(registry.is_registered(Permission::Write));
        assert!(!registry.is_registered(Permission::ManageSections));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subspaces.toml");

        let mut config = Config::default();
        config.logging.json_format = true;
        config.store.backend = StoreBackend::Sqlite;
        config.store.sqlite_path = dir.path().join("state.db");
        config.permissions.registered = vec!["write".to_string()];
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[address]\nbech32_prefix = \"cosmos\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.address.bech32_prefix, "cosmos");
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/subspaces.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError(_)));
    }

    #[test]
    fn test_build_keeper_with_sqlite() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.sqlite_path = dir.path().join("keeper.db");
        config.store.pool_size = 2;

        let keeper = config.build_keeper().unwrap();
        assert_eq!(keeper.get_next_subspace_id().unwrap(), 1);
    }
}
