//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use pbackend::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Backend,
    Store,
    Tooling,
}

/// Orchestration step an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorPhase {
    Request,
    Streaming,
    Tooling,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub phase: Option<ChatErrorPhase>,
    pub backend: Option<BackendError>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            phase: None,
            backend: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message).with_phase(ChatErrorPhase::Request)
    }

    pub fn backend(error: BackendError) -> Self {
        Self {
            kind: ChatErrorKind::Backend,
            message: error.to_string(),
            phase: None,
            backend: Some(error),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message).with_phase(ChatErrorPhase::Storage)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message).with_phase(ChatErrorPhase::Tooling)
    }

    pub fn with_phase(mut self, phase: ChatErrorPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn is_backend_error(&self) -> bool {
        self.kind == ChatErrorKind::Backend
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.phase {
            Some(phase) => write!(f, "{:?} during {:?}: {}", self.kind, phase, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ChatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.backend.as_ref().map(|error| error as &(dyn Error + 'static))
    }
}

impl From<BackendError> for ChatError {
    fn from(value: BackendError) -> Self {
        ChatError::backend(value)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use pbackend::BackendErrorKind;

    use super::*;

    #[test]
    fn backend_errors_are_preserved_as_source() {
        let error = ChatError::from(BackendError::transport("connection reset"))
            .with_phase(ChatErrorPhase::Streaming);

        assert_eq!(error.kind, ChatErrorKind::Backend);
        assert_eq!(
            error.backend.as_ref().map(|backend| backend.kind),
            Some(BackendErrorKind::Transport)
        );
        assert!(error.source().is_some());
        assert_eq!(
            error.to_string(),
            "Backend during Streaming: Transport: connection reset"
        );
    }

    #[test]
    fn helpers_assign_default_phases() {
        assert_eq!(
            ChatError::store("disk full").phase,
            Some(ChatErrorPhase::Storage)
        );
        assert_eq!(
            ChatError::invalid_request("empty").phase,
            Some(ChatErrorPhase::Request)
        );
        assert!(ChatError::tooling("x").source().is_none());
    }
}
