//! Configuration management
//!
//! Configuration is loaded from `config.yml` and then overridden by
//! `SHOPFRONT_*` environment variables. Missing optional values are filled
//! with defaults.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins, comma separated, or `*`
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/shopfront.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Authentication configuration
///
/// An empty `token_secret` makes the server generate a random secret at
/// startup, so issued tokens stop validating after a restart.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key used to sign bearer tokens
    #[serde(default)]
    pub token_secret: String,
    /// Token lifetime in days
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
    /// Display name for the bootstrap admin account
    #[serde(default)]
    pub admin_name: Option<String>,
    /// Email of the bootstrap admin account
    #[serde(default)]
    pub admin_email: Option<String>,
    /// Password of the bootstrap admin account
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_days: default_token_ttl_days(),
            admin_name: None,
            admin_email: None,
            admin_password: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &redact(&self.token_secret))
            .field("token_ttl_days", &self.token_ttl_days)
            .field("admin_name", &self.admin_name)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &self.admin_password.as_deref().map(redact))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

fn default_token_ttl_days() -> i64 {
    7
}

impl AuthConfig {
    /// Bootstrap admin credentials, if both email and password are configured
    pub fn bootstrap_admin(&self) -> Option<(String, String, String)> {
        let email = self.admin_email.as_deref()?.trim();
        let password = self.admin_password.as_deref()?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        let name = self
            .admin_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Administrator");
        Some((name.to_string(), email.to_string(), password.to_string()))
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is an error
    /// carrying the line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - SHOPFRONT_SERVER_HOST, SHOPFRONT_SERVER_PORT, SHOPFRONT_SERVER_CORS_ORIGIN
    /// - SHOPFRONT_DATABASE_DRIVER, SHOPFRONT_DATABASE_URL, SHOPFRONT_DATABASE_MAX_CONNECTIONS
    /// - SHOPFRONT_AUTH_TOKEN_SECRET, SHOPFRONT_AUTH_TOKEN_TTL_DAYS
    /// - SHOPFRONT_AUTH_ADMIN_NAME, SHOPFRONT_AUTH_ADMIN_EMAIL, SHOPFRONT_AUTH_ADMIN_PASSWORD
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("SHOPFRONT_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SHOPFRONT_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("SHOPFRONT_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(driver) = std::env::var("SHOPFRONT_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SHOPFRONT_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(max) = std::env::var("SHOPFRONT_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                if max > 0 {
                    self.database.max_connections = max;
                }
            }
        }

        // Auth configuration
        if let Ok(secret) = std::env::var("SHOPFRONT_AUTH_TOKEN_SECRET") {
            self.auth.token_secret = secret;
        }
        if let Ok(ttl) = std::env::var("SHOPFRONT_AUTH_TOKEN_TTL_DAYS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                if ttl > 0 {
                    self.auth.token_ttl_days = ttl;
                }
            }
        }
        if let Ok(name) = std::env::var("SHOPFRONT_AUTH_ADMIN_NAME") {
            self.auth.admin_name = Some(name);
        }
        if let Ok(email) = std::env::var("SHOPFRONT_AUTH_ADMIN_EMAIL") {
            self.auth.admin_email = Some(email);
        }
        if let Ok(password) = std::env::var("SHOPFRONT_AUTH_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Config tests touching the process environment share this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_shopfront_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/shopfront.db");
        assert_eq!(config.auth.token_ttl_days, 7);
        assert!(config.auth.token_secret.is_empty());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let file = write_config("   \n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 20);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let file = write_config("server:\n  port: 9000\nauth:\n  token_secret: s3cret\n");
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.token_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.database.url, "data/shopfront.db");
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
server:
  host: 127.0.0.1
  port: 4000
  cors_origin: "https://shop.example.com"
database:
  driver: mysql
  url: mysql://shop:pw@localhost/shop
  max_connections: 5
auth:
  token_secret: abc
  token_ttl_days: 1
  admin_email: admin@example.com
  admin_password: hunter22
"#,
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.address(), "127.0.0.1:4000");
        assert_eq!(config.server.cors_origin, "https://shop.example.com");
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.auth.token_ttl_days, 1);
        assert_eq!(
            config.auth.bootstrap_admin(),
            Some((
                "Administrator".to_string(),
                "admin@example.com".to_string(),
                "hunter22".to_string()
            ))
        );
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let file = write_config("server:\n  port: not_a_number\n");
        let err = Config::load(file.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failed to parse config file"), "{}", message);
        assert!(message.contains("line"), "{}", message);
    }

    #[test]
    fn test_bootstrap_admin_requires_email_and_password() {
        let mut auth = AuthConfig::default();
        assert!(auth.bootstrap_admin().is_none());

        auth.admin_email = Some("admin@example.com".to_string());
        assert!(auth.bootstrap_admin().is_none());

        auth.admin_password = Some(String::new());
        assert!(auth.bootstrap_admin().is_none());

        auth.admin_password = Some("pw".to_string());
        auth.admin_name = Some("  Root  ".to_string());
        let (name, _, _) = auth.bootstrap_admin().unwrap();
        assert_eq!(name, "Root");
    }

    #[test]
    fn test_auth_config_debug_redacts_secrets() {
        let auth = AuthConfig {
            token_secret: "top-secret".to_string(),
            admin_password: Some("hunter22".to_string()),
            ..AuthConfig::default()
        };
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_env_override_server_and_auth() {
        let _guard = lock_env();
        std::env::set_var("SHOPFRONT_SERVER_PORT", "9191");
        std::env::set_var("SHOPFRONT_AUTH_TOKEN_SECRET", "from-env");
        std::env::set_var("SHOPFRONT_DATABASE_DRIVER", "MySQL");

        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_shopfront_config.yml"))
                .unwrap();

        std::env::remove_var("SHOPFRONT_SERVER_PORT");
        std::env::remove_var("SHOPFRONT_AUTH_TOKEN_SECRET");
        std::env::remove_var("SHOPFRONT_DATABASE_DRIVER");

        assert_eq!(config.server.port, 9191);
        assert_eq!(config.auth.token_secret, "from-env");
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        std::env::set_var("SHOPFRONT_SERVER_PORT", "not-a-port");
        std::env::set_var("SHOPFRONT_DATABASE_DRIVER", "oracle");
        std::env::set_var("SHOPFRONT_AUTH_TOKEN_TTL_DAYS", "-3");

        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_shopfront_config.yml"))
                .unwrap();

        std::env::remove_var("SHOPFRONT_SERVER_PORT");
        std::env::remove_var("SHOPFRONT_DATABASE_DRIVER");
        std::env::remove_var("SHOPFRONT_AUTH_TOKEN_TTL_DAYS");

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.auth.token_ttl_days, 7);
    }
}
