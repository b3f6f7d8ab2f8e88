//! Command-line flags.
//!
//! Every flag is optional and also readable from a `USERAPI_*` variable.
//! Flags that are set become loader overrides, so they beat config files
//! and nested `USERAPI_DATABASE__*` variables.

use clap::Parser;
use std::path::PathBuf;
use userapi_config::ConfigLoader;

#[derive(Debug, Clone, Parser)]
#[command(name = "userapi", version, about = "User data service")]
pub struct Cli {
    /// Environment profile; selects `<config-dir>/<profile>.toml`.
    #[arg(short = 'c', long = "app-config", env = "USERAPI_ENVIRONMENT")]
    pub app_config: Option<String>,

    /// Directory holding the TOML config files.
    #[arg(long, env = "USERAPI_CONFIG_DIR", default_value = "./config")]
    pub config_dir: PathBuf,

    /// Backend kind: postgres, mysql or mongo.
    #[arg(long, env = "USERAPI_DB_KIND")]
    pub db_kind: Option<String>,

    #[arg(long, env = "USERAPI_DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "USERAPI_DB_PORT")]
    pub db_port: Option<u16>,

    #[arg(short = 'u', long, env = "USERAPI_DB_USERNAME")]
    pub db_username: Option<String>,

    #[arg(short = 'p', long, env = "USERAPI_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(short = 'n', long, env = "USERAPI_DB_NAME")]
    pub db_name: Option<String>,
}

impl Cli {
    /// Returns `(config key, value)` pairs for the flags that were set.
    #[must_use]
    pub fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        let mut push = |key, value: Option<String>| {
            if let Some(value) = value {
                overrides.push((key, value));
            }
        };

        push("database.kind", self.db_kind.clone());
        push("database.host", self.db_host.clone());
        push("database.port", self.db_port.map(|p| p.to_string()));
        push("database.user", self.db_username.clone());
        push("database.password", self.db_password.clone());
        push("database.name", self.db_name.clone());
        overrides
    }

    /// Builds the configuration loader these flags describe.
    #[must_use]
    pub fn loader(&self) -> ConfigLoader {
        let mut loader = ConfigLoader::new(&self.config_dir);
        if let Some(profile) = &self.app_config {
            loader = loader.with_environment(profile);
        }
        self.overrides()
            .into_iter()
            .fold(loader, |loader, (key, value)| loader.with_override(key, value))
    }
}
