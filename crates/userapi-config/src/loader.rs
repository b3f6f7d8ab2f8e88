//! Configuration loader with layered sources.

use crate::{to_configuration_error, AppConfig, ConfigValidator};
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use userapi_core::{UserApiError, UserApiResult};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "USERAPI";

/// Layered configuration loader.
///
/// Sources, lowest precedence first:
/// 1. Built-in defaults
/// 2. `{config_dir}/default.toml`
/// 3. `{config_dir}/{environment}.toml`
/// 4. `{config_dir}/local.toml` (not committed to version control)
/// 5. Environment variables with the `USERAPI_` prefix (`__` nests keys)
/// 6. Explicit overrides, typically parsed command-line flags
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    environment: String,
    overrides: Vec<(String, String)>,
}

impl ConfigLoader {
    /// Creates a loader reading from `config_dir`.
    ///
    /// The environment profile comes from `USERAPI_ENVIRONMENT`, defaulting
    /// to `dev`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var(format!("{ENV_PREFIX}_ENVIRONMENT"))
            .unwrap_or_else(|_| "dev".to_string());

        Self {
            config_dir: config_dir.into(),
            environment,
            overrides: Vec::new(),
        }
    }

    /// Creates a loader reading from `./config`.
    #[must_use]
    pub fn from_default_location() -> Self {
        Self::new("./config")
    }

    /// Selects the environment profile file.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Adds an override that beats every other source.
    ///
    /// `key` uses dotted paths, e.g. `database.port`.
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Returns the selected environment profile.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Loads, merges and validates the configuration.
    pub fn load(&self) -> UserApiResult<AppConfig> {
        info!(
            "Loading configuration for environment: {} from {}",
            self.environment,
            self.config_dir.display()
        );

        let mut builder = self.file_sources(Config::builder());

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder = builder
            .set_override("app.environment", self.environment.clone())
            .map_err(config_error_to_user_api_error)?;
        for (key, value) in &self.overrides {
            builder = builder
                .set_override(key.as_str(), value.clone())
                .map_err(config_error_to_user_api_error)?;
        }

        let app_config: AppConfig = builder
            .build()
            .map_err(config_error_to_user_api_error)?
            .try_deserialize()
            .map_err(config_error_to_user_api_error)?;

        ConfigValidator::validate(&app_config).map_err(|errors| to_configuration_error(&errors))?;

        Ok(app_config)
    }

    fn file_sources(
        &self,
        mut builder: ConfigBuilder<DefaultState>,
    ) -> ConfigBuilder<DefaultState> {
        let environment_file = format!("{}.toml", self.environment);
        for name in ["default.toml", environment_file.as_str(), "local.toml"] {
            let path = self.config_dir.join(name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }
        builder
    }
}

fn config_error_to_user_api_error(err: ConfigError) -> UserApiError {
    UserApiError::Configuration(err.to_string())
}
