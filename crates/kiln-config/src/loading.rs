//! Layered configuration loading.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format as _, Serialized, Toml},
    Figment,
};
use serde::Serialize;

use crate::dev::DevConfig;
use crate::error::Result;

/// Config file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "KILN_";

/// Loads [`DevConfig`] from defaults, `kiln.toml`, env vars and overrides.
///
/// # Example
///
/// ```no_run
/// use kiln_config::ConfigLoader;
///
/// let config = ConfigLoader::new(".").load().unwrap();
/// println!("HMR on port {}", config.hmr.port);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    config_file: Option<PathBuf>,
    use_env: bool,
}

impl ConfigLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config_file: None,
            use_env: true,
        }
    }

    /// Use an explicit config file instead of `<root>/kiln.toml`.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Ignore `KILN_` environment variables.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Config file that will be read, if it exists.
    pub fn find(&self) -> Option<PathBuf> {
        let path = self
            .config_file
            .clone()
            .unwrap_or_else(|| self.root.join(CONFIG_FILE_NAME));
        path.exists().then_some(path)
    }

    /// Layered sources without caller overrides.
    pub fn figment(&self) -> Figment {
        let defaults = DevConfig {
            root: self.root.clone(),
            ..DevConfig::default()
        };
        let mut figment = Figment::from(Serialized::defaults(defaults));

        if let Some(path) = self.find() {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Toml::file(path));
        }

        if self.use_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        figment
    }

    /// Load and validate the configuration.
    pub fn load(&self) -> Result<DevConfig> {
        self.finish(self.figment())
    }

    /// Load with `overrides` (for example parsed CLI flags) on top of every
    /// other source. Only the keys present in `overrides` take effect.
    pub fn load_with_overrides<T: Serialize>(&self, overrides: T) -> Result<DevConfig> {
        self.finish(self.figment().merge(Serialized::defaults(overrides)))
    }

    fn finish(&self, figment: Figment) -> Result<DevConfig> {
        let mut config: DevConfig = figment.extract()?;
        if config.root.is_relative() && config.root != self.root {
            config.root = self.root.join(&config.root);
        }
        config.validate()?;
        Ok(config)
    }
}
