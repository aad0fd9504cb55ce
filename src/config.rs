//! Environment-driven configuration for the relay server and its client.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_UPSTREAM_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub host: String,
    pub port: u16,
    pub text_model: String,
    pub image_model: String,
    pub upstream_url: String,
    pub timeout: Duration,
    pub body_limit_mb: usize,
}

impl RelayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            timeout: Duration::from_secs(120),
            body_limit_mb: 50,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. `API_KEY` is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration(
                    "API_KEY is missing; set API_KEY=<your key> in the environment",
                )
            })?;

        let mut cfg = Self::new(api_key);
        if let Some(host) = lookup("BACH_HOST") {
            cfg.host = host;
        }
        if let Some(port) = lookup("PORT") {
            cfg.port = port
                .parse()
                .map_err(|_| Error::configuration(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(model) = lookup("BACH_TEXT_MODEL") {
            cfg.text_model = model;
        }
        if let Some(model) = lookup("BACH_IMAGE_MODEL") {
            cfg.image_model = model;
        }
        if let Some(url) = lookup("BACH_UPSTREAM_URL") {
            url::Url::parse(&url).map_err(|e| {
                Error::configuration(format!("BACH_UPSTREAM_URL is not a valid URL: {e}"))
            })?;
            cfg.upstream_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("BACH_HTTP_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            cfg.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(mb) = lookup("BACH_BODY_LIMIT_MB").and_then(|s| s.parse::<usize>().ok()) {
            cfg.body_limit_mb = mb.max(1);
        }
        Ok(cfg)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay API root, e.g. `http://localhost:5000/api`.
    pub api_url: String,
    /// Whole-request timeout. Streams are long-lived, so none by default.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let mut cfg = env::var("BACH_API_URL")
            .map(Self::new)
            .unwrap_or_default();
        cfg.timeout = env::var("BACH_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        cfg
    }
}
