use crate::ConfigError;

/// How contract value projection reacts to a value that does not match its type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnErrorMode {
    /// Render the offending subtree as its raw primitive, annotated with the error.
    #[default]
    Prim,
    /// Abort the row with a projection error.
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct DecodeConfig {
    /// Keep decoded primitive trees next to projected values
    ///
    /// Env: TZSTATS_DECODE_PRIM
    /// Default: false
    pub prim: bool,

    /// Attach provenance metadata to big-map updates
    ///
    /// Env: TZSTATS_DECODE_META
    /// Default: false
    pub meta: bool,

    /// Projection error mode
    ///
    /// Env: TZSTATS_DECODE_ON_ERROR
    /// Valid values: prim, fail
    /// Default: prim
    pub on_error: OnErrorMode,
}

impl OnErrorMode {
    pub(crate) fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "prim" => Ok(OnErrorMode::Prim),
            "fail" => Ok(OnErrorMode::Fail),
            other => Err(ConfigError::ValidateError(format!(
                "Invalid decode error mode '{}'. Must be one of: prim, fail",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_decode_config() {
        let config = DecodeConfig::default();
        assert!(!config.prim);
        assert!(!config.meta);
        assert_eq!(config.on_error, OnErrorMode::Prim);
    }

    #[test]
    fn test_parse_on_error_mode() {
        assert_eq!(OnErrorMode::parse("prim").unwrap(), OnErrorMode::Prim);
        assert_eq!(OnErrorMode::parse("fail").unwrap(), OnErrorMode::Fail);
        assert!(OnErrorMode::parse("panic").is_err());
    }
}
