//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "rolekeeper.toml",
    "config.toml",
    "./config/rolekeeper.toml",
    "/etc/rolekeeper/config.toml",
];

/// Environment variable naming an explicit config file
const CONFIG_ENV: &str = "ROLEKEEPER_CONFIG";

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                info!(?path, "Loading configuration from file");
                AppConfig::from_file(&path)?
            }
            None => {
                info!("No configuration file found, using defaults");
                AppConfig::default()
            }
        };

        apply_overrides(&mut config, |key| env::var(key).ok());
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file does not exist, searching defaults");
        }

        if let Ok(path) = env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `ROLEKEEPER_*` overrides read through `lookup`.
///
/// Values that fail to parse leave the current setting in place.
pub(crate) fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(port) = lookup("ROLEKEEPER_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }
    if let Some(val) = lookup("ROLEKEEPER_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("ROLEKEEPER_CORS_ORIGINS") {
        config.http.cors_origins = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // MongoDB
    if let Some(val) = lookup("ROLEKEEPER_MONGODB_URI") {
        config.mongodb.uri = val;
    }
    if let Some(val) = lookup("ROLEKEEPER_MONGODB_DATABASE") {
        config.mongodb.database = val;
    }
    if let Some(val) = lookup("ROLEKEEPER_MONGODB_COLLECTION") {
        config.mongodb.collection = val;
    }

    // Roles
    if let Some(val) = lookup("ROLEKEEPER_ROLES_UNIQUENESS") {
        config.roles.uniqueness = val.trim().to_lowercase();
    }
    if let Some(flag) = lookup("ROLEKEEPER_ROLES_CASCADE_DELETE").and_then(|v| parse_bool(&v)) {
        config.roles.cascade_delete = flag;
    }
    if let Some(flag) = lookup("ROLEKEEPER_ROLES_REJECT_CYCLES").and_then(|v| parse_bool(&v)) {
        config.roles.reject_cycles = flag;
    }

    if let Some(val) = lookup("ROLEKEEPER_STORE") {
        config.store = val.trim().to_lowercase();
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
