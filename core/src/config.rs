//! Client configuration.
//!
//! # Design
//! Host, port and base path are fixed when the client is built and shared
//! immutably by every call. `from_env` mirrors the mock server's `PORT`
//! handling so the session binary can point at any deployment.

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BASE_PATH: &str = "/data-api";
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Where the Data API lives and how far redirects are followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Prefix of every endpoint path, e.g. `/data-api`. No trailing slash.
    pub base_path: String,
    /// Maximum number of 303 hops followed for a single call.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_path: DEFAULT_BASE_PATH.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, base_path: &str) -> Self {
        Self {
            host: host.into(),
            port,
            base_path: normalize_base_path(base_path),
            ..Self::default()
        }
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Read `DATAAPI_HOST`, `DATAAPI_PORT`, `DATAAPI_BASE_PATH` and
    /// `DATAAPI_MAX_REDIRECTS`, falling back to the defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(host) = lookup("DATAAPI_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DATAAPI_PORT") {
            config.port = parse_value("DATAAPI_PORT", port)?;
        }
        if let Some(path) = lookup("DATAAPI_BASE_PATH") {
            config.base_path = normalize_base_path(&path);
        }
        if let Some(max) = lookup("DATAAPI_MAX_REDIRECTS") {
            config.max_redirects = parse_value("DATAAPI_MAX_REDIRECTS", max)?;
        }
        Ok(config)
    }

    /// Scheme, host and port; the executor appends request paths to this.
    pub fn origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn parse_value<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::InvalidValue {
        key,
        reason: e.to_string(),
        value,
    })
}

fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
