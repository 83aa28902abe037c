//! `memscan.toml` handling
//!
//! Three sections: `[scanner]` seeds [`crate::ScanOptions`], `[connection]`
//! bounds reads against the target, `[logging]` drives the subscriber the
//! binary installs.

mod defaults;
mod loader;
mod validator;

pub use defaults::{default_config, ConfigDefaults};
pub use loader::{load_config, ConfigLoader, CONFIG_FILE};
pub use validator::{validate_config, ConfigValidator, MAX_ALIGNMENT, MIN_CHUNK_SIZE};

pub use loader::{Config, ConnectionConfig, LoggingConfig, ScannerConfig};

pub use loader::ConfigError;

pub type ConfigResult<T> = Result<T, ConfigError>;
