//! Startup configuration.
//!
//! Required settings come from the environment and are validated before anything
//! else happens: a missing or malformed value is fatal. Provider settings (clients,
//! claims) come from an optional HOCON file.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

mod provider;

pub use provider::*;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_ISSUER: &str = "http://localoidc";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_KEYSTORE_PATH: &str = "keystore.json";
pub const DEFAULT_PROVIDER_CONFIG: &str = "provider.conf";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} missing")]
    Missing(&'static str),
    #[error("{name} format invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("failed to read environment: {0}")]
    Source(#[from] config::ConfigError),
    #[error("failed to load provider settings from {path}: {reason}")]
    ProviderSettings { path: String, reason: String },
}

/// Raw view of the environment; every field optional so validation can name what is missing.
#[derive(Debug, Default, Deserialize)]
struct RawEnv {
    heroku_app_name: Option<String>,
    x_heroku_remote: Option<String>,
    port: Option<String>,
    secure_key: Option<String>,
    /// `BIND_HOST`; a generic `HOST` is often exported by the shell and is ignored.
    bind_host: Option<String>,
    issuer: Option<String>,
    redis_url: Option<String>,
    keystore_path: Option<String>,
    provider_config: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub server: ServerConfig,
    pub issuer: String,
    pub secure_keys: SecureKeys,
    pub redis: RedisConfig,
    pub keystore_path: PathBuf,
    pub provider_config_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedisConfig {
    pub url: String,
}

/// Cookie signing keys: the one in use and the one it replaced.
#[derive(Clone, PartialEq)]
pub struct SecureKeys {
    pub current: String,
    pub previous: String,
}

impl fmt::Debug for SecureKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureKeys")
            .field("current", &"***MASKED***")
            .field("previous", &"***MASKED***")
            .finish()
    }
}

impl SecureKeys {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [current, previous] if !current.is_empty() && !previous.is_empty() => Ok(Self {
                current: current.to_string(),
                previous: previous.to_string(),
            }),
            [_, _] => Err(ConfigError::Invalid {
                name: "SECURE_KEY",
                reason: "keys must not be empty".to_string(),
            }),
            _ => Err(ConfigError::Invalid {
                name: "SECURE_KEY",
                reason: format!("expected exactly 2 comma-separated keys, got {}", parts.len()),
            }),
        }
    }
}

/// Extract the app name from a git remote such as `https://git.heroku.com/my-app.git`.
pub fn app_name_from_remote(remote: &str) -> Option<String> {
    let marker = ".com/";
    let start = remote.find(marker)? + marker.len();
    let rest = &remote[start..];
    let end = rest.rfind(".git")?;
    let name = &rest[..end];
    (!name.is_empty()).then(|| name.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Load from an explicit variable map instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_source(Some(map))
    }

    fn from_source(source: Option<config::Map<String, String>>) -> Result<Self, ConfigError> {
        let raw: RawEnv = config::Config::builder()
            .add_source(config::Environment::default().source(source))
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEnv) -> Result<Self, ConfigError> {
        let app_name = non_empty(raw.heroku_app_name)
            .or_else(|| non_empty(raw.x_heroku_remote).and_then(|r| app_name_from_remote(&r)))
            .ok_or(ConfigError::Missing("HEROKU_APP_NAME"))?;

        let port = non_empty(raw.port).ok_or(ConfigError::Missing("PORT"))?;
        let port: u16 = port.parse().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            reason: format!("not a TCP port: {port}"),
        })?;

        let secure_keys = non_empty(raw.secure_key)
            .ok_or(ConfigError::Missing("SECURE_KEY"))
            .and_then(|raw| SecureKeys::parse(&raw))?;

        Ok(Self {
            app_name,
            server: ServerConfig {
                host: non_empty(raw.bind_host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
            issuer: non_empty(raw.issuer).unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            secure_keys,
            redis: RedisConfig {
                url: non_empty(raw.redis_url).unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            },
            keystore_path: PathBuf::from(
                non_empty(raw.keystore_path).unwrap_or_else(|| DEFAULT_KEYSTORE_PATH.to_string()),
            ),
            provider_config_path: PathBuf::from(
                non_empty(raw.provider_config)
                    .unwrap_or_else(|| DEFAULT_PROVIDER_CONFIG.to_string()),
            ),
        })
    }

    /// Provider settings from the configured HOCON file, or the built-in defaults
    /// when the file does not exist.
    pub fn provider_settings(&self) -> Result<ProviderSettings, ConfigError> {
        load_provider_settings(&self.provider_config_path)
    }
}

fn load_provider_settings(path: &Path) -> Result<ProviderSettings, ConfigError> {
    if !path.exists() {
        tracing::info!(
            path = %path.display(),
            "provider settings file not found, using built-in defaults"
        );
        return Ok(ProviderSettings::default());
    }
    ProviderSettings::from_hocon_path(path)
}
