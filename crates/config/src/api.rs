use crate::ConfigError;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the explorer API
    ///
    /// Env: TZSTATS_API_URL
    /// Valid schemes: http://, https://
    /// Default: https://api.tzstats.com
    pub url: String,

    /// Optional API key sent as `X-Api-Key` header
    ///
    /// Env: TZSTATS_API_KEY
    /// Default: none
    pub api_key: Option<String>,

    /// Request timeout in seconds
    ///
    /// Env: TZSTATS_API_TIMEOUT_SECS
    /// Default: 30
    pub timeout_secs: u64,
}

pub(crate) fn default_url() -> String {
    "https://api.tzstats.com".to_string()
}

pub(crate) fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::ValidateError(
                "API URL cannot be empty".to_string(),
            ));
        }

        let parsed = url::Url::parse(&self.url).map_err(|e| {
            ConfigError::ValidateError(format!("Invalid API URL '{}': {}", self.url, e))
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::ValidateError(format!(
                    "Invalid URL scheme '{}'. Must be http:// or https://",
                    scheme
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidateError(
                "API timeout cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_config() {
        let config = ApiConfig::default();
        assert_eq!(config.url, "https://api.tzstats.com");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_url() {
        let config = ApiConfig {
            url: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_scheme() {
        let config = ApiConfig {
            url: "ws://localhost:8000".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_timeout_zero() {
        let config = ApiConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_local_http_url() {
        let config = ApiConfig {
            url: "http://127.0.0.1:8000".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
