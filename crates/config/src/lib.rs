mod api;
mod args;
mod decode;
mod error;
mod log;

pub use api::ApiConfig;
pub use args::{Args, Command, TableArgs};
pub use decode::{DecodeConfig, OnErrorMode};
pub use error::ConfigError;
pub use log::LogConfig;

use serde::Deserialize;
use std::path::Path;

/// Environment prefix shared by every setting
pub const ENV_PREFIX: &str = "TZSTATS_";

/// Flat view of the `TZSTATS_*` environment, as envy sees it.
#[derive(Debug, Deserialize)]
struct EnvConfig {
    #[serde(default = "api::default_url")]
    api_url: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "api::default_timeout_secs")]
    api_timeout_secs: u64,
    #[serde(default = "log::default_level")]
    log_level: String,
    #[serde(default)]
    log_json: bool,
    #[serde(default)]
    log_strip_ansi: bool,
    #[serde(default)]
    decode_prim: bool,
    #[serde(default)]
    decode_meta: bool,
    #[serde(default)]
    decode_on_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExplorerConfig {
    pub api: ApiConfig,
    pub log: LogConfig,
    pub decode: DecodeConfig,
}

impl ExplorerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load variables from an env file (if it exists) before reading the environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            dotenv::from_path(path).map_err(|source| ConfigError::EnvFileError {
                path: path.display().to_string(),
                source,
            })?;
        }
        Self::from_env()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env = envy::prefixed(ENV_PREFIX).from_iter::<_, EnvConfig>(vars)?;
        let on_error = match env.decode_on_error.as_deref() {
            Some(mode) => OnErrorMode::parse(mode)?,
            None => OnErrorMode::default(),
        };
        let config = Self {
            api: ApiConfig {
                url: env.api_url,
                api_key: env.api_key.filter(|k| !k.is_empty()),
                timeout_secs: env.api_timeout_secs,
            },
            log: LogConfig {
                level: env.log_level,
                json: env.log_json,
                strip_ansi: env.log_strip_ansi,
            },
            decode: DecodeConfig {
                prim: env.decode_prim,
                meta: env.decode_meta,
                on_error,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = ExplorerConfig::default();
        assert_eq!(config.api.url, "https://api.tzstats.com");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.decode.on_error, OnErrorMode::Prim);
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = ExplorerConfig::from_vars(vars(&[("UNRELATED", "1")])).unwrap();
        assert_eq!(config.api.url, "https://api.tzstats.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert!(!config.decode.prim);
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = ExplorerConfig::from_vars(vars(&[
            ("TZSTATS_API_URL", "http://localhost:8000"),
            ("TZSTATS_API_KEY", "secret"),
            ("TZSTATS_API_TIMEOUT_SECS", "5"),
            ("TZSTATS_LOG_LEVEL", "debug"),
            ("TZSTATS_LOG_JSON", "true"),
            ("TZSTATS_DECODE_PRIM", "true"),
            ("TZSTATS_DECODE_META", "true"),
            ("TZSTATS_DECODE_ON_ERROR", "fail"),
        ]))
        .unwrap();
        assert_eq!(config.api.url, "http://localhost:8000");
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
        assert!(config.decode.prim);
        assert!(config.decode.meta);
        assert_eq!(config.decode.on_error, OnErrorMode::Fail);
    }

    #[test]
    fn test_from_vars_empty_api_key_is_none() {
        let config = ExplorerConfig::from_vars(vars(&[("TZSTATS_API_KEY", "")])).unwrap();
        assert!(config.api.api_key.is_none());
    }

    #[test]
    fn test_from_vars_rejects_invalid_values() {
        assert!(ExplorerConfig::from_vars(vars(&[("TZSTATS_LOG_LEVEL", "loud")])).is_err());
        assert!(ExplorerConfig::from_vars(vars(&[("TZSTATS_DECODE_ON_ERROR", "x")])).is_err());
        assert!(ExplorerConfig::from_vars(vars(&[("TZSTATS_API_TIMEOUT_SECS", "abc")])).is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env.test");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "TZSTATS_API_URL=http://127.0.0.1:9999").unwrap();
        writeln!(file, "TZSTATS_DECODE_META=true").unwrap();
        drop(file);

        let config = ExplorerConfig::from_env_file(&path).unwrap();
        assert_eq!(config.api.url, "http://127.0.0.1:9999");
        assert!(config.decode.meta);

        unsafe {
            std::env::remove_var("TZSTATS_API_URL");
            std::env::remove_var("TZSTATS_DECODE_META");
        }
    }
}
