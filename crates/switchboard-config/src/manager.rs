use crate::security::{
    set_config_permissions, validate_origin, validate_resource_name, validate_resource_pattern,
    validate_table_path, SecurityError,
};
use crate::types::{ResourceEntry, SwitchboardConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use switchboard_url::{Resources, UrlError};
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SWITCHBOARD_CONFIG";

/// Errors that can occur during config management
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Config file already exists at {0}")]
    ConfigExists(PathBuf),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource already exists: {0}")]
    ResourceExists(String),

    #[error("Rule table already configured: {0}")]
    TableExists(PathBuf),

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Manager for Switchboard configuration
///
/// Manages the configuration stored in ~/.switchboard/config.toml, or in
/// the file named by `SWITCHBOARD_CONFIG`. Every mutation is validated and
/// saved immediately.
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
    config: SwitchboardConfig,
}

impl ConfigManager {
    /// Get the config path: `SWITCHBOARD_CONFIG` if set, otherwise
    /// ~/.switchboard/config.toml
    #[cfg(feature = "native-fs")]
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".switchboard").join("config.toml"))
    }

    /// Load config from default location
    #[cfg(feature = "native-fs")]
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load config from specific path (useful for testing)
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let config: SwitchboardConfig = toml::from_str(&contents)?;
        debug!(path = %path.display(), resources = config.resources.len(), "loaded config");

        Ok(Self {
            config_path: path.to_path_buf(),
            config,
        })
    }

    /// Initialize a new config file at the default location
    #[cfg(feature = "native-fs")]
    pub fn init() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        Self::init_at(&config_path)
    }

    /// Initialize config at specific path
    ///
    /// Refuses to overwrite an existing file.
    pub fn init_at(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Err(ConfigError::ConfigExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let manager = Self {
            config_path: path.to_path_buf(),
            config: SwitchboardConfig::default(),
        };
        manager.save()?;

        Ok(manager)
    }

    /// Save config to disk atomically
    ///
    /// Uses a temporary file and atomic rename to prevent corruption
    pub fn save(&self) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(&self.config)?;

        let temp_path = self.config_path.with_extension("toml.tmp");
        fs::write(&temp_path, toml_str)?;

        set_config_permissions(&temp_path)?;

        fs::rename(&temp_path, &self.config_path)?;
        debug!(path = %self.config_path.display(), "saved config");

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get reference to config
    pub fn config(&self) -> &SwitchboardConfig {
        &self.config
    }

    /// Get mutable reference to config (caller must call save())
    pub fn config_mut(&mut self) -> &mut SwitchboardConfig {
        &mut self.config
    }

    /// Add a named URL pattern
    pub fn add_resource(&mut self, entry: ResourceEntry) -> Result<(), ConfigError> {
        validate_resource_name(&entry.name)?;
        validate_resource_pattern(&entry.name, &entry.pattern)?;

        if self.config.resource(&entry.name).is_some() {
            return Err(ConfigError::ResourceExists(entry.name));
        }

        self.config.resources.push(entry);
        self.save()
    }

    /// Remove a resource by name
    pub fn remove_resource(&mut self, name: &str) -> Result<(), ConfigError> {
        let index = self
            .config
            .resources
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| ConfigError::ResourceNotFound(name.to_string()))?;

        self.config.resources.remove(index);
        self.save()
    }

    /// Add a rule table file or directory. The path is stored canonicalized.
    pub fn add_table(&mut self, path: &Path) -> Result<(), ConfigError> {
        let canonical = validate_table_path(path)?;

        if self.config.tables.contains(&canonical) {
            return Err(ConfigError::TableExists(canonical));
        }

        self.config.tables.push(canonical);
        self.save()
    }

    /// Configured rule table paths, in load order
    pub fn tables(&self) -> &[PathBuf] {
        &self.config.tables
    }

    /// Compiled resource table, with the configured origin
    pub fn resources(&self) -> Result<Resources, ConfigError> {
        Ok(self.config.compile_resources()?)
    }

    /// Check the whole config: resource names and patterns, the origin,
    /// and that every table path still exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(origin) = &self.config.origin {
            validate_origin(origin)?;
        }

        for entry in &self.config.resources {
            validate_resource_name(&entry.name)?;
            validate_resource_pattern(&entry.name, &entry.pattern)?;
        }

        for table in &self.config.tables {
            validate_table_path(table)?;
        }

        // duplicate names only surface when the table is compiled
        self.resources()?;
        Ok(())
    }
}
