//! Rolekeeper Configuration System
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Accepted values for `roles.uniqueness`.
pub const UNIQUENESS_MODES: &[&str] = &["precheck", "store"];

/// Accepted values for `store`.
pub const STORE_KINDS: &[&str] = &["mongodb", "memory"];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub roles: RolesConfig,

    /// Backing store: "mongodb" or "memory"
    pub store: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            mongodb: MongoConfig::default(),
            roles: RolesConfig::default(),
            store: "mongodb".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "rolekeeper".to_string(),
            collection: "roles".to_string(),
        }
    }
}

/// Role management rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// "precheck": query for an existing name/label before writing (409).
    /// "store": rely on the unique indexes and surface their error as-is.
    pub uniqueness: String,

    /// Pull a deleted role's id out of every other role's subRoles.
    pub cascade_delete: bool,

    /// Refuse sub-role links that would close a cycle.
    pub reject_cycles: bool,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            uniqueness: "precheck".to_string(),
            cascade_delete: false,
            reject_cycles: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Check values that would otherwise fail late at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::ValidationError(
                "http.port must be greater than 0".to_string(),
            ));
        }
        if self.mongodb.database.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "mongodb.database must not be empty".to_string(),
            ));
        }
        if self.mongodb.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "mongodb.collection must not be empty".to_string(),
            ));
        }
        if !UNIQUENESS_MODES.contains(&self.roles.uniqueness.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "roles.uniqueness must be one of {:?}, got '{}'",
                UNIQUENESS_MODES, self.roles.uniqueness
            )));
        }
        if !STORE_KINDS.contains(&self.store.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "store must be one of {:?}, got '{}'",
                STORE_KINDS, self.store
            )));
        }
        Ok(())
    }

    /// Whether the in-memory store is selected
    pub fn uses_memory_store(&self) -> bool {
        self.store == "memory"
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Rolekeeper Configuration
# Environment variables (ROLEKEEPER_*) override these settings

# mongodb or memory
store = "mongodb"

[http]
port = 8080
host = "0.0.0.0"
cors_origins = []

[mongodb]
uri = "mongodb://localhost:27017"
database = "rolekeeper"
collection = "roles"

[roles]
uniqueness = "precheck"  # precheck or store
cascade_delete = false
reject_cycles = false
"#
        .to_string()
    }
}
