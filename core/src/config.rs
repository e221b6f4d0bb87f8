use crate::errors::{ShelfError, ShelfResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Seven days, the lifetime of an issued session cookie
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// Top-level configuration for the shelf daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Path the resource routes are mounted under
    pub route_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3333".to_string(),
            route_prefix: "/resources".to_string(),
        }
    }
}

/// Which backend holds the records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Memory,
    Sqlite {
        /// sqlx connection url, e.g. `sqlite://shelf.db` or `sqlite::memory:`
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    4
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

/// How the session identity is persisted on the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub cookie_name: String,
    pub cookie_path: String,
    pub max_age_secs: u64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sessionId".to_string(),
            cookie_path: "/".to_string(),
            max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            http_only: true,
            secure: false,
            same_site: "Lax".to_string(),
        }
    }
}

/// User-facing texts returned in response bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub updated: String,
    pub deleted: String,
    pub not_found: String,
    pub unauthorized: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            updated: "O livro foi atualizado".to_string(),
            deleted: "Livro excluido".to_string(),
            not_found: "livro não foi encontrado".to_string(),
            unauthorized: "Unauthorized.".to_string(),
        }
    }
}

impl ShelfConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ShelfResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ShelfError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ShelfError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> ShelfResult<()> {
        let content = toml::to_string(self)
            .map_err(|e| ShelfError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ShelfError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .map_err(|e| ShelfError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> ShelfResult<()> {
        let prefix = self.server.route_prefix.trim_end_matches('/');
        if !prefix.starts_with('/') {
            return Err(ShelfError::Config(format!(
                "route_prefix must start with '/' and name a path: {}",
                self.server.route_prefix
            )));
        }
        if self.identity.cookie_name.is_empty() {
            return Err(ShelfError::Config("cookie_name must not be empty".to_string()));
        }
        if !matches!(self.identity.same_site.as_str(), "Strict" | "Lax" | "None") {
            return Err(ShelfError::Config(format!(
                "same_site must be Strict, Lax or None: {}",
                self.identity.same_site
            )));
        }
        Ok(())
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> ShelfResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        ShelfError::Config("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> ShelfResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
