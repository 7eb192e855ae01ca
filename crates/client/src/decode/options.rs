use crate::micheline::OnError;
use tzstats_config::{DecodeConfig, OnErrorMode};

/// Switches applied to every row of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Keep primitive trees next to projected values.
    pub prim: bool,
    /// Attach provenance to big-map updates.
    pub meta: bool,
    pub on_error: OnError,
}

impl DecodeOptions {
    pub fn with_prim(mut self, prim: bool) -> Self {
        self.prim = prim;
        self
    }

    pub fn with_meta(mut self, meta: bool) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }
}

impl From<&DecodeConfig> for DecodeOptions {
    fn from(config: &DecodeConfig) -> Self {
        Self {
            prim: config.prim,
            meta: config.meta,
            on_error: match config.on_error {
                OnErrorMode::Prim => OnError::Prim,
                OnErrorMode::Fail => OnError::Fail,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = DecodeConfig {
            prim: true,
            meta: false,
            on_error: OnErrorMode::Fail,
        };
        let options = DecodeOptions::from(&config);
        assert!(options.prim);
        assert!(!options.meta);
        assert_eq!(options.on_error, OnError::Fail);
        assert_eq!(DecodeOptions::default().on_error, OnError::Prim);
    }
}
