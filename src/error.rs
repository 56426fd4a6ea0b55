use std::io;

use thiserror::Error;

use crate::session::SessionState;

/// Failures decoding or encoding the PCM container
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Why a stored session could not be reconstructed
#[derive(Debug, Error)]
pub enum CorruptReason {
    #[error("audio container: {0}")]
    Audio(#[from] CodecError),

    #[error("event document: {0}")]
    Events(#[from] serde_json::Error),
}

/// Errors surfaced by the session controller and session store
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No capture device available")]
    DeviceUnavailable,

    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Session {id} is corrupt: {source}")]
    CorruptSession {
        id: String,
        #[source]
        source: CorruptReason,
    },

    #[error("Failed to write session {id}: {source}")]
    StorageWriteFailure {
        id: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read session {id}: {source}")]
    StorageReadFailure {
        id: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },
}

impl SessionError {
    pub fn corrupt(id: impl Into<String>, reason: impl Into<CorruptReason>) -> Self {
        Self::CorruptSession {
            id: id.into(),
            source: reason.into(),
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
