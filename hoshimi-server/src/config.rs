//! Layered server configuration: an optional TOML file overridden by
//! `HOSHIMI_`-prefixed environment variables.

use std::path::Path;

use config::{Config, Environment, File};
use hoshimi_core::EngineSettings;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Data-quality compensations; see [`EngineSettings`].
    #[serde(default)]
    pub engine: EngineSettings,
    /// Require the cron marker header on the task endpoint. Disable only
    /// for local development.
    #[serde(default = "default_true")]
    pub require_cron_header: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            database: DatabaseConfig::default(),
            engine: EngineSettings::default(),
            require_cron_header: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path` (or `hoshimi.toml` when present) and
    /// the environment. `HOSHIMI_DATABASE__URL` maps to `database.url`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("hoshimi").required(false)),
        };

        let config = builder
            .add_source(Environment::with_prefix("HOSHIMI").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_a_config_file() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert!(config.database.url.is_none());
        assert!(config.require_cron_header);
        assert!(config.engine.pinned_actor_id.is_none());
    }
}
