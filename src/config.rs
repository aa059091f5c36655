//! Dashboard configuration: built-in defaults, an optional TOML file, then
//! environment overrides.

use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "dashboard.toml";
pub const ENV_HOST: &str = "SAFARI_HOST";
pub const ENV_PORT: &str = "SAFARI_PORT";
pub const ENV_DATA_DIR: &str = "SAFARI_DATA_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Initial N for the top-N charts.
    pub default_top_n: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8050,
            data_dir: PathBuf::from("datasets/processed"),
            default_top_n: 15,
        }
    }
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    default_top_n: Option<usize>,
}

impl DashboardConfig {
    /// Defaults, then `dashboard.toml` in the working directory, then env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults merged with `path` when it exists.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if !path.exists() {
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let partial: PartialConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(host) = partial.host {
            config.host = host;
        }
        if let Some(port) = partial.port {
            config.port = port;
        }
        if let Some(dir) = partial.data_dir {
            config.data_dir = dir;
        }
        if let Some(n) = partial.default_top_n {
            config.default_top_n = n;
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides; `lookup` returns a variable's value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_PORT.to_string(),
                    value: port.clone(),
                })?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_top_n == 0 {
            return Err(ConfigError::InvalidValue {
                key: "default_top_n".to_string(),
                value: "0".to_string(),
            });
        }
        self.socket_addr().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "host".to_string(),
                value: self.host.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.port, 8050);
        assert_eq!(config.data_dir, PathBuf::from("datasets/processed"));
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8050");
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let config = DashboardConfig::from_file(Path::new("no/such/dashboard.toml")).unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_file_layer() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = 9000\ndata_dir = \"data\"\ndefault_top_n = 5").unwrap();

        let config = DashboardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.default_top_n, 5);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_bad_file_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"eighty\"").unwrap();
        assert!(matches!(
            DashboardConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_PORT, "8123"), (ENV_DATA_DIR, "/tmp/safari")]
            .into_iter()
            .collect();
        let mut config = DashboardConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.port, 8123);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/safari"));
    }

    #[test]
    fn test_invalid_overrides() {
        let mut config = DashboardConfig::default();
        let result = config.apply_overrides(|key| (key == ENV_PORT).then(|| "http".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let mut config = DashboardConfig::default();
        let result =
            config.apply_overrides(|key| (key == ENV_HOST).then(|| "not a host".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
