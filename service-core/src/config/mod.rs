use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Settings shared by every service binary: where to listen.
///
/// Read from an optional `configuration` file and `APP__*` environment
/// variables, e.g. `APP__PORT=9090`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Read a required environment variable, mapping absence to a configuration error.
pub fn require_env(key: &str) -> Result<String, AppError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::ConfigError(anyhow::anyhow!("{key} is required"))),
    }
}

/// Read an optional environment variable and parse it, falling back to `default`
/// when it is unset or blank. A value that does not parse is a configuration error.
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{key} has an invalid value '{raw}'"))
        }),
        _ => Ok(default),
    }
}

/// [`env_or`], clamped to `min..=max`.
pub fn env_clamped<T: std::str::FromStr + Ord>(
    key: &str,
    default: T,
    min: T,
    max: T,
) -> Result<T, AppError> {
    Ok(env_or(key, default)?.clamp(min, max))
}
