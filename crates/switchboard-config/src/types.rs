use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use switchboard_core::DispatchMode;
use switchboard_url::{Origin, Resources, UrlError};

/// Main configuration structure for Switchboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchboardConfig {
    /// Schema version for migrations
    pub version: String,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,

    /// Origin for absolute URLs (`https://example.com:8443`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Rule table files or directories, in load order
    #[serde(default)]
    pub tables: Vec<PathBuf>,

    /// Named URL patterns
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            settings: GlobalSettings::default(),
            origin: None,
            tables: Vec::new(),
            resources: Vec::new(),
        }
    }
}

impl SwitchboardConfig {
    pub fn resource(&self, name: &str) -> Option<&ResourceEntry> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Compile the resource table, with the origin when one is configured.
    pub fn compile_resources(&self) -> Result<Resources, UrlError> {
        let mut resources = Resources::new();
        if let Some(origin) = &self.origin {
            resources = resources.with_origin(Origin::parse(origin)?);
        }
        for entry in &self.resources {
            resources.insert(&entry.name, &entry.pattern)?;
        }
        Ok(resources)
    }
}

/// Global settings for Switchboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalSettings {
    /// Stop at the first matching rule, or run every match
    #[serde(default)]
    pub mode: DispatchMode,

    /// Percent-encode placeholder values when building URLs
    #[serde(default = "default_true")]
    pub escape_urls: bool,

    /// Drop fact extractors once they ran after a match
    #[serde(default = "default_true")]
    pub clear_extractors: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            escape_urls: default_true(),
            clear_extractors: default_true(),
        }
    }
}

/// A named URL pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceEntry {
    pub name: String,
    pub pattern: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceEntry {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            description: None,
        }
    }
}

fn default_true() -> bool {
    true
}
