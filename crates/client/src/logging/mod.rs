pub mod logger;
pub use logger::{LoggingConfig, LoggingError, init, init_with_config};
