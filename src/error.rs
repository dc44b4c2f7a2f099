//! Error Types
//!
//! Crate-wide error enum wrapping the per-module errors, plus stable error
//! codes used in logs and in the status messages shown to the user.

use crate::speech::SpeechError;
use crate::store::StoreError;
use thiserror::Error;

/// Stable, machine-friendly code for each error family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Config,
    Validation,
    Remote,
    Transport,
    Storage,
    Audio,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Config => "E_CONFIG",
            ErrorCode::Validation => "E_VALIDATION",
            ErrorCode::Remote => "E_REMOTE",
            ErrorCode::Transport => "E_TRANSPORT",
            ErrorCode::Storage => "E_STORAGE",
            ErrorCode::Audio => "E_AUDIO",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum VoiceBatchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceBatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            VoiceBatchError::Config(_) => ErrorCode::Config,
            VoiceBatchError::Speech(e) => e.code(),
            VoiceBatchError::Store(_) | VoiceBatchError::Io(_) => ErrorCode::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, VoiceBatchError>;
