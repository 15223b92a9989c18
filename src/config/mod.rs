// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Legacy variable names, applied on top of everything else.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("BASE_URL", "upstream.base_url"),
    ("API_SECRET", "upstream.api_secret"),
];

/// Load configuration from an optional file (YAML, JSON or TOML) layered
/// under the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    build_config(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] but reads the legacy variables through `env`.
pub fn build_config<F>(path: Option<&Path>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = config::Config::builder()
        .set_default("server.host", default_host())?
        .set_default("server.port", i64::from(default_port()))?
        .set_default("metrics.enabled", false)?
        .set_default("metrics.port", i64::from(default_metrics_port()))?
        .set_default("metrics.path", default_metrics_path())?;

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TMDB_PROXY")
            .prefix_separator("__")
            .separator("__"),
    );

    for (var, key) in ENV_OVERRIDES {
        builder = builder.set_override_option(*key, env(*var))?;
    }

    let config: Config = builder
        .build()
        .context("Failed to assemble configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    config.validate()?;
    Ok(config)
}
