//! Configuration management for pgelastic
//!
//! Default config location: ./pgelastic.toml

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::fs;
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (default: 100MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9200
}

fn default_max_body_size() -> usize {
    100 * 1024 * 1024 // 100MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection parameters for the PostgreSQL backend
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PostgresConfig {
    /// `host:port` of the server
    #[serde(default = "default_pg_address")]
    pub address: String,
    #[serde(default = "default_pg_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_pg_database")]
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_pg_address() -> String {
    "localhost:5432".to_string()
}

fn default_pg_user() -> String {
    "postgres".to_string()
}

fn default_pg_database() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            address: default_pg_address(),
            user: default_pg_user(),
            password: String::new(),
            database: default_pg_database(),
            max_connections: default_max_connections(),
        }
    }
}

impl PostgresConfig {
    /// Build sqlx connect options from the configured address and credentials
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let (host, port) = match self.address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|e| anyhow!("Invalid postgres port in '{}': {}", self.address, e))?;
                (host, port)
            }
            None => (self.address.as_str(), 5432),
        };

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(port)
            .username(&self.user)
            .database(&self.database);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        Ok(options)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_level")]
    pub level: String,

    /// Log output format: "pretty" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info,pgelastic=debug".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct MetricsConfig {
    /// Expose Prometheus metrics at GET /_metrics
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    /// Load config from file path, falling back to defaults when the file is absent
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            tracing::info!(
                "Config file {} not found, using defaults",
                config_path.display()
            );
            Ok(Config::default())
        }
    }

    /// Load config from an existing TOML file
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Invalid config {}: {}", config_path.display(), e))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:9200");
        assert_eq!(config.postgres.address, "localhost:5432");
        assert_eq!(config.postgres.database, "postgres");
        assert_eq!(config.logging.format, "pretty");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9300

            [postgres]
            user = "elastic"
            password = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9300);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.postgres.user, "elastic");
        assert_eq!(config.postgres.password, "secret");
        assert_eq!(config.postgres.max_connections, 10);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/pgelastic.toml");
        let mut config = Config::default();
        config.postgres.database = "elastic".to_string();
        config.metrics.enabled = true;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_connect_options_rejects_bad_port() {
        let pg = PostgresConfig {
            address: "db:notaport".to_string(),
            ..Default::default()
        };
        assert!(pg.connect_options().is_err());

        let pg = PostgresConfig {
            address: "db".to_string(),
            ..Default::default()
        };
        assert!(pg.connect_options().is_ok());
    }
}
