pub mod manager;
pub mod security;
pub mod types;

pub use manager::{ConfigError, ConfigManager, CONFIG_ENV};
pub use security::{
    validate_origin, validate_resource_name, validate_resource_pattern, validate_table_path,
    SecurityError,
};
pub use types::{GlobalSettings, ResourceEntry, SwitchboardConfig};
