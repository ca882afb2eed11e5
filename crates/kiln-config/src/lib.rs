//! Configuration for the kiln dev server's module graph and HMR channel.
//!
//! Sources are layered with figment, lowest priority first: built-in
//! defaults, `kiln.toml` in the project root, `KILN_` environment variables
//! (`__` separates nested keys, e.g. `KILN_HMR__PORT=24680`), then explicit
//! overrides from the caller.

pub mod dev;
pub mod error;
pub mod loading;
pub mod mode;

pub use dev::{DevConfig, HmrConfig, WatchConfig, DEFAULT_HMR_PORT, DEFAULT_HMR_PROTOCOL};
pub use error::{ConfigError, Result};
pub use loading::{ConfigLoader, CONFIG_FILE_NAME, ENV_PREFIX};
pub use mode::validate_mode;
