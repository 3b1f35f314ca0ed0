//! Persistence errors for conversation stores.

use std::error::Error;
use std::fmt::{Display, Formatter};

use pchat::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryErrorKind {
    Storage,
    Serialization,
    NotFound,
    InvalidRequest,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryError {
    pub kind: MemoryErrorKind,
    pub message: String,
}

impl MemoryError {
    pub fn new(kind: MemoryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::Storage, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::Serialization, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::NotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::InvalidRequest, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::Other, message)
    }
}

impl Display for MemoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for MemoryError {}

impl From<MemoryError> for ChatError {
    fn from(error: MemoryError) -> Self {
        ChatError::store(error.to_string())
    }
}

impl From<rusqlite::Error> for MemoryError {
    fn from(error: rusqlite::Error) -> Self {
        MemoryError::storage(format!("sqlite: {error}"))
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(error: serde_json::Error) -> Self {
        MemoryError::serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pchat::{ChatErrorKind, ChatErrorPhase};

    use super::*;

    #[test]
    fn memory_errors_become_storage_phase_chat_errors() {
        let error = ChatError::from(MemoryError::not_found("conversation 42"));

        assert_eq!(error.kind, ChatErrorKind::Store);
        assert_eq!(error.phase, Some(ChatErrorPhase::Storage));
        assert_eq!(error.message, "NotFound: conversation 42");
    }
}
