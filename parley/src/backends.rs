//! Stable backend construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "backend-ollama")]
use reqwest::Client;

use crate::{BackendError, ChatBackend, DEFAULT_TIMEOUT, OllamaConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendBuildConfig {
    pub host: Option<String>,
    pub timeout: Duration,
    pub keep_alive: Option<String>,
}

impl Default for BackendBuildConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout: DEFAULT_TIMEOUT,
            keep_alive: None,
        }
    }
}

impl BackendBuildConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
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

    /// Resolves the connection settings, falling back to the environment
    /// for anything left unset.
    pub fn to_ollama_config(&self) -> OllamaConfig {
        let mut config = match &self.host {
            Some(host) if !host.trim().is_empty() => OllamaConfig::new(host),
            _ => OllamaConfig::from_env(),
        };
        config.timeout = self.timeout;
        if let Some(keep_alive) = &self.keep_alive {
            config.keep_alive = Some(keep_alive.clone());
        }
        config
    }
}

pub fn build_ollama_backend(
    config: BackendBuildConfig,
) -> Result<Arc<dyn ChatBackend>, BackendError> {
    let config = config.to_ollama_config();
    if config.timeout.is_zero() {
        return Err(BackendError::invalid_request(
            "backend timeout must be greater than zero",
        ));
    }

    ollama_backend(config)
}

/// Builds the default backend from `OLLAMA_HOST` and `OLLAMA_KEEP_ALIVE`.
pub fn build_backend_from_env() -> Result<Arc<dyn ChatBackend>, BackendError> {
    build_ollama_backend(BackendBuildConfig::default())
}

/// Model names installed on the server described by `config`.
pub async fn list_models(config: BackendBuildConfig) -> Result<Vec<String>, BackendError> {
    list_ollama_models(config.to_ollama_config()).await
}

#[cfg(feature = "backend-ollama")]
fn ollama_backend(config: OllamaConfig) -> Result<Arc<dyn ChatBackend>, BackendError> {
    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| BackendError::transport(err.to_string()))?;

    Ok(Arc::new(pbackend::adapters::ollama::OllamaBackend::with_client(
        http, config,
    )))
}

#[cfg(not(feature = "backend-ollama"))]
fn ollama_backend(_config: OllamaConfig) -> Result<Arc<dyn ChatBackend>, BackendError> {
    Err(BackendError::invalid_request(
        "backend-ollama feature is not enabled on parley",
    ))
}

#[cfg(feature = "backend-ollama")]
async fn list_ollama_models(config: OllamaConfig) -> Result<Vec<String>, BackendError> {
    pbackend::adapters::ollama::OllamaBackend::new(config)?
        .list_models()
        .await
}

#[cfg(not(feature = "backend-ollama"))]
async fn list_ollama_models(_config: OllamaConfig) -> Result<Vec<String>, BackendError> {
    Err(BackendError::invalid_request(
        "backend-ollama feature is not enabled on parley",
    ))
}
