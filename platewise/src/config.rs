use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {0} not set")]
    MissingVariable(String),
}

/// Contents of `platewise.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatewiseConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub redis: RedisSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_max_age")]
    pub cors_max_age_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_max_age_secs: default_cors_max_age(),
        }
    }
}

impl ServerSettings {
    pub fn cors_max_age(&self) -> Duration {
        Duration::from_secs(self.cors_max_age_secs)
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_cors_max_age() -> u64 {
    60 * 60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_key_prefix() -> String {
    "platewise".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

impl RedisSettings {
    /// The URL with a whole-value `${VAR}` reference expanded.
    pub fn resolved_url(&self) -> Result<String, ConfigError> {
        let url = self.url.trim();
        match url.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            Some(var_name) => std::env::var(var_name).map_err(|_| ConfigError::MissingVariable(var_name.to_string())),
            None => Ok(url.to_string()),
        }
    }
}

impl PlatewiseConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path: display, source })
    }

    /// Loads `path` when given, otherwise `platewise.toml` if present, otherwise defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let local = Path::new("platewise.toml");
                if local.exists() {
                    Self::load(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_missing_sections() {
        let config: PlatewiseConfig = toml::from_str("[store]\nbackend = \"memory\"\n").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.key_prefix, "platewise");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.redis.url, "${REDIS_URL}");
    }

    #[test]
    fn loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nbind = \"127.0.0.1:9000\"\ncors_max_age_secs = 60\n\n[redis]\nurl = \"redis://cache:6379\""
        )
        .unwrap();
        let config = PlatewiseConfig::load(file.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.server.cors_max_age(), Duration::from_secs(60));
        assert_eq!(config.redis.resolved_url().unwrap(), "redis://cache:6379");
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbind = 1").unwrap();
        let err = PlatewiseConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unset_variable_is_an_error() {
        let settings = RedisSettings {
            url: "${PLATEWISE_TEST_UNSET_VARIABLE}".into(),
        };
        assert!(matches!(settings.resolved_url(), Err(ConfigError::MissingVariable(_))));
    }
}
