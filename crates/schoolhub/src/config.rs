//! Configuration loading

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Shortest session secret accepted in production (bytes)
pub const MIN_SECRET_LENGTH: usize = 32;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            environment: Environment::default(),
        }
    }
}

/// User store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    /// Process-local store, emptied on restart
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            path: default_db_path(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for session tokens
    #[serde(default)]
    pub session_secret: Option<String>,
}

/// First super admin, created only when the store has no users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_super_admin_email")]
    pub super_admin_email: String,
    #[serde(default)]
    pub super_admin_password: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            super_admin_email: default_super_admin_email(),
            super_admin_password: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "./data/schoolhub.db".to_string()
}

fn default_super_admin_email() -> String {
    "root@schoolhub.local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }

    /// Session secret to sign tokens with.
    ///
    /// Production refuses to start without a secret of at least
    /// `MIN_SECRET_LENGTH` bytes. Development substitutes a per-process
    /// random secret, so sessions do not survive a restart.
    pub fn session_secret(&self) -> Result<String> {
        let configured = self
            .auth
            .session_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (configured, self.is_production()) {
            (Some(secret), true) if secret.len() < MIN_SECRET_LENGTH => bail!(
                "Session secret must be at least {} bytes in production",
                MIN_SECRET_LENGTH
            ),
            (Some(secret), false) if secret.len() < MIN_SECRET_LENGTH => {
                warn!(
                    "Session secret is shorter than {} bytes; acceptable for development only",
                    MIN_SECRET_LENGTH
                );
                Ok(secret.to_string())
            }
            (Some(secret), _) => Ok(secret.to_string()),
            (None, true) => bail!(
                "No session secret configured. Set [auth] session_secret or SCHOOLHUB_SESSION_SECRET"
            ),
            (None, false) => {
                warn!(
                    "No session secret configured; using a random one. Sessions will not survive a restart"
                );
                Ok(random_secret())
            }
        }
    }
}

fn random_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/schoolhub.toml").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.database.backend, DatabaseBackend::Sqlite);
        assert_eq!(config.database.path, "./data/schoolhub.db");
        assert_eq!(config.bootstrap.super_admin_email, "root@schoolhub.local");
        assert!(config.bootstrap.super_admin_password.is_none());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
[server]
bind_address = "127.0.0.1"
port = 8080
environment = "production"

[database]
backend = "memory"

[auth]
session_secret = "0123456789abcdef0123456789abcdef"

[bootstrap]
super_admin_email = "ops@school.test"
super_admin_password = "change-me-now"

[logging]
level = "debug"
format = "json"

[metrics]
enabled = false
"#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.is_production());
        assert_eq!(config.database.backend, DatabaseBackend::Memory);
        assert_eq!(config.database.path, "./data/schoolhub.db");
        assert_eq!(config.bootstrap.super_admin_email, "ops@school.test");
        assert_eq!(
            config.bootstrap.super_admin_password.as_deref(),
            Some("change-me-now")
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[server]\nport = 4000\n");
        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let file = write_config("[server]\nenvironment = \"staging\"\n");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    fn with_secret(environment: Environment, secret: Option<&str>) -> Config {
        let mut config = Config::default();
        config.server.environment = environment;
        config.auth.session_secret = secret.map(str::to_string);
        config
    }

    #[test]
    fn test_production_secret_policy() {
        assert!(with_secret(Environment::Production, None).session_secret().is_err());
        assert!(with_secret(Environment::Production, Some("   ")).session_secret().is_err());
        assert!(with_secret(Environment::Production, Some("too-short")).session_secret().is_err());

        let long = "x".repeat(MIN_SECRET_LENGTH);
        assert_eq!(
            with_secret(Environment::Production, Some(&long)).session_secret().unwrap(),
            long
        );
    }

    #[test]
    fn test_development_secret_policy() {
        assert_eq!(
            with_secret(Environment::Development, Some("dev"))
                .session_secret()
                .unwrap(),
            "dev"
        );

        let config = with_secret(Environment::Development, None);
        let first = config.session_secret().unwrap();
        let second = config.session_secret().unwrap();
        assert!(first.len() >= MIN_SECRET_LENGTH);
        assert_ne!(first, second);
    }
}
