//! Connection settings for a local Ollama server.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use pbackend::OllamaConfig;
//!
//! let config = OllamaConfig::from_lookup(|key| match key {
//!     "OLLAMA_HOST" => Some("10.0.0.5:11434".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.host, "http://10.0.0.5:11434");
//! assert_eq!(config.timeout, Duration::from_secs(120));
//! ```

use std::time::Duration;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";
pub const OLLAMA_KEEP_ALIVE_ENV: &str = "OLLAMA_KEEP_ALIVE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub host: String,
    pub timeout: Duration,
    pub keep_alive: Option<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
            keep_alive: None,
        }
    }
}

impl OllamaConfig {
    pub fn new(host: impl AsRef<str>) -> Self {
        Self {
            host: normalize_host(host.as_ref()),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(OLLAMA_HOST_ENV)
            && !host.trim().is_empty()
        {
            config.host = normalize_host(&host);
        }

        if let Some(keep_alive) = lookup(OLLAMA_KEEP_ALIVE_ENV)
            && !keep_alive.trim().is_empty()
        {
            config.keep_alive = Some(keep_alive.trim().to_string());
        }

        config
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.host, path.trim_start_matches('/'))
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
