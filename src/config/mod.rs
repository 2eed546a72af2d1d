//! Configuration loading and management
//!
//! Resolution order: built-in defaults, then an optional YAML file named by
//! `RELATE_CONFIG`, then the `PORT` environment variable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable selecting the listening port
pub const PORT_ENV: &str = "PORT";

/// Environment variable naming a YAML configuration file
pub const CONFIG_FILE_ENV: &str = "RELATE_CONFIG";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Allow cross-origin requests from any origin
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_filter: "info".to_string(),
            cors: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        Self::from_yaml_str(&content).with_context(|| format!("failed to parse config file '{path}'"))
    }

    /// Load configuration from a YAML string
    ///
    /// Keys that are left out keep their default value.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Resolve the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration with an arbitrary variable lookup
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        config.with_env_overrides(lookup)
    }

    /// Apply environment overrides on top of this configuration
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid {PORT_ENV} value '{port}'"))?;
        }
        Ok(self)
    }

    /// Socket address to bind, as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::resolve(env(&[])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert!(!config.cors);
    }

    #[test]
    fn test_port_from_env() {
        let config = ServerConfig::resolve(env(&[("PORT", "8081")])).unwrap();
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = ServerConfig::resolve(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ServerConfig::from_yaml_str("port: 7000\ncors: true\n").unwrap();
        assert_eq!(config.port, 7000);
        assert!(config.cors);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_env_overrides_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"host: 127.0.0.1\nport: 7000\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config =
            ServerConfig::resolve(env(&[("RELATE_CONFIG", &path), ("PORT", "9000")])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let err = ServerConfig::resolve(env(&[("RELATE_CONFIG", "/nonexistent/relate.yaml")]))
            .unwrap_err();
        assert!(err.to_string().contains("relate.yaml"));
    }
}
