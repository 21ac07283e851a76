//! Settings resolution: command-line flag, then environment, then config
//! file, then built-in default.

use anyhow::{Context, Result};
use pts_server::SecurityConfig;
use pts_telemetry::LogFormat;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_ALLOWED_ORIGINS: &str = "POINTSCALE_ALLOWED_ORIGINS";
pub const ENV_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Contents of the TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub otlp_endpoint: Option<String>,
    pub log_format: Option<LogFormat>,
    pub security: FileSecurity,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSecurity {
    pub allowed_origins: Option<Vec<String>>,
    pub max_body_size: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub expose_error_details: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub otlp_endpoint: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// `None` selects in-memory storage.
    pub database_url: Option<String>,
    pub otlp_endpoint: Option<String>,
    pub log_format: LogFormat,
    pub security: SecurityConfig,
}

impl Settings {
    /// Resolves settings from the process environment and an optional file.
    pub fn load(overrides: Overrides, file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(overrides, |name| std::env::var(name).ok(), file))
    }

    pub fn resolve(
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
        file: FileConfig,
    ) -> Self {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let defaults = SecurityConfig::default();

        let allowed_origins = env(ENV_ALLOWED_ORIGINS)
            .map(|raw| {
                raw.split(',').map(str::trim).filter(|o| !o.is_empty()).map(String::from).collect()
            })
            .or(file.security.allowed_origins)
            .unwrap_or(defaults.allowed_origins);

        let security = SecurityConfig {
            allowed_origins,
            max_body_size: file.security.max_body_size.unwrap_or(defaults.max_body_size),
            request_timeout: file
                .security
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            expose_error_details: file
                .security
                .expose_error_details
                .unwrap_or(defaults.expose_error_details),
        };

        Self {
            host: overrides.host.or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            database_url: overrides
                .database_url
                .or_else(|| env(ENV_DATABASE_URL))
                .or(file.database_url),
            otlp_endpoint: overrides
                .otlp_endpoint
                .or_else(|| env(ENV_OTLP_ENDPOINT))
                .or(file.otlp_endpoint),
            log_format: overrides.log_format.or(file.log_format).unwrap_or_default(),
            security,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
