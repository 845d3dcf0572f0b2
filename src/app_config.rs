//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with MARQUEE__, sections split by `__`)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! `DATABASE_URL`, when set, overrides `database.url` so the usual `.env`
//! workflow keeps working.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Marquee".to_string(),
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind: String,
    /// Worker threads. Zero uses the actix default (one per core).
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            workers: 0,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `postgres://...` or `sqlite://marquee.db?mode=rwc`
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://marquee.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

/// Identity configuration.
///
/// Authentication happens in the reverse proxy in front of the service. The
/// proxy forwards the authenticated user name in `user_header`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Request header carrying the authenticated user name
    pub user_header: String,
    /// Create a user row the first time a name is seen
    pub auto_provision: bool,
    /// User names granted admin rights regardless of their stored flag
    pub admin_users: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_header: "X-Remote-User".to_string(),
            auto_provision: true,
            admin_users: Vec::new(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file (optional) - use from_file for full path support
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // e.g., MARQUEE__SERVER__BIND, MARQUEE__AUTH__USER_HEADER
            .add_source(
                Environment::with_prefix("MARQUEE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.admin_users")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }

        Ok(config)
    }

    /// Whether `name` is listed in `auth.admin_users`.
    pub fn is_configured_admin(&self, name: &str) -> bool {
        self.auth.admin_users.iter().any(|admin| admin == name)
    }
}

/// Initialize application configuration
///
/// This triggers the lazy loading of the config file and logs the result.
/// Should be called early in application startup.
pub fn init() {
    let config = get_config();
    log::info!(
        "Configuration loaded: site.name = {}, site.base_url = {}",
        config.site.name,
        config.site.base_url
    );
}

// Convenience functions for accessing global config

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

/// Get server configuration
pub fn server() -> ServerConfig {
    get_config().server
}

/// Get database configuration
pub fn database() -> DatabaseConfig {
    get_config().database
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.site.name, "Marquee");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.auth.user_header, "X-Remote-User");
        assert!(config.auth.auto_provision);
        assert!(config.auth.admin_users.is_empty());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[site]
name = "Test Cinema"

[server]
bind = "127.0.0.1:9000"
workers = 2

[auth]
user_header = "X-Forwarded-User"
admin_users = ["alice", "bob"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.site.name, "Test Cinema");
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.server.workers, 2);
        assert_eq!(config.auth.user_header, "X-Forwarded-User");
        assert!(config.is_configured_admin("alice"));
        assert!(config.is_configured_admin("bob"));
        assert!(!config.is_configured_admin("carol"));
        // Defaults should still apply for unspecified values
        assert!(config.auth.auto_provision);
        assert_eq!(config.site.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = AppConfig::load_from_path("/nonexistent/config.toml").unwrap();
        assert_eq!(config.site.name, "Marquee");
        assert_eq!(config.database.max_connections, 10);
    }
}
