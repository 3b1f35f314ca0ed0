//! Shared backend error kinds and error value helpers.
//!
//! ```rust
//! use pbackend::{BackendError, BackendErrorKind};
//!
//! let unavailable = BackendError::unavailable("model is loading");
//! assert!(unavailable.retryable);
//!
//! let rejected = BackendError::invalid_request("registry.ollama.ai/library/gemma does not support tools")
//!     .with_status(400);
//! assert_eq!(rejected.kind, BackendErrorKind::InvalidRequest);
//! assert!(rejected.unsupported_features().tools);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::UnsupportedFeatures;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    InvalidRequest,
    NotFound,
    Timeout,
    Transport,
    Unavailable,
    Decode,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status: Option<u16>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidRequest, message, false)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message, true)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Decode, message, false)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Other, message, false)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Features the backend reported it cannot honor for the requested model.
    ///
    /// Detection is textual: the message must carry a "not support" or
    /// "unsupported" marker next to the feature name.
    pub fn unsupported_features(&self) -> UnsupportedFeatures {
        let message = self.message.to_ascii_lowercase();
        let rejected = message.contains("not support") || message.contains("unsupported");
        if !rejected {
            return UnsupportedFeatures::default();
        }

        UnsupportedFeatures {
            tools: message.contains("tool"),
            think: message.contains("think"),
        }
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} (http {status}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_builders_assign_expected_retryability() {
        assert!(BackendError::timeout("slow").retryable);
        assert!(BackendError::transport("reset").retryable);
        assert!(!BackendError::invalid_request("bad").retryable);
        assert!(!BackendError::not_found("missing model").retryable);
        assert_eq!(BackendError::decode("junk").kind, BackendErrorKind::Decode);
    }

    #[test]
    fn unsupported_features_reads_backend_rejection_text() {
        let tools = BackendError::invalid_request("llama2 does not support tools");
        assert_eq!(
            tools.unsupported_features(),
            UnsupportedFeatures {
                tools: true,
                think: false
            }
        );

        let think = BackendError::invalid_request("\"deepseek\" does not support thinking");
        assert_eq!(
            think.unsupported_features(),
            UnsupportedFeatures {
                tools: false,
                think: true
            }
        );

        let both = BackendError::other("Unsupported: tool calling and think mode");
        assert!(both.unsupported_features().tools);
        assert!(both.unsupported_features().think);
    }

    #[test]
    fn unrelated_errors_report_no_unsupported_features() {
        let error = BackendError::transport("tool server connection refused");
        assert!(error.unsupported_features().is_empty());

        let error = BackendError::not_found("model 'qwen' not found");
        assert!(error.unsupported_features().is_empty());
    }

    #[test]
    fn display_includes_status_when_known() {
        let error = BackendError::unavailable("busy").with_status(503);
        assert_eq!(error.to_string(), "Unavailable (http 503): busy");
        assert_eq!(BackendError::other("x").to_string(), "Other: x");
    }
}
