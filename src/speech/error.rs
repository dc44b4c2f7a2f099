//! Speech client error types

use crate::error::ErrorCode;
use crate::utils::RetryableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("audio sample not found: {0}")]
    SampleMissing(String),

    #[error("audio sample {path} is {size} bytes, limit is {limit} bytes")]
    SampleTooLarge { path: String, size: u64, limit: u64 },

    #[error("text must not be empty")]
    EmptyText,

    #[error("voice id must not be empty")]
    EmptyVoiceId,

    #[error("rate {0}% is outside the allowed range [-50, 50]")]
    InvalidRate(i32),

    #[error("unknown emotion: {0}")]
    UnknownEmotion(String),

    #[error("no API key configured")]
    MissingApiKey,

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("unreadable response: {0}")]
    InvalidResponse(String),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid audio payload: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpeechError {
    /// Classify a transport error as DNS, connect, timeout or other.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let detail = error_chain(&err);
        if err.is_timeout() {
            SpeechError::Timeout(detail)
        } else if err.is_connect() {
            if looks_like_dns_failure(&detail) {
                SpeechError::Dns(detail)
            } else {
                SpeechError::Connect(detail)
            }
        } else {
            SpeechError::Transport(detail)
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SpeechError::SampleMissing(_)
            | SpeechError::SampleTooLarge { .. }
            | SpeechError::EmptyText
            | SpeechError::EmptyVoiceId
            | SpeechError::InvalidRate(_)
            | SpeechError::UnknownEmotion(_) => ErrorCode::Validation,
            SpeechError::MissingApiKey => ErrorCode::Config,
            SpeechError::Api { .. }
            | SpeechError::MissingField(_)
            | SpeechError::InvalidResponse(_) => ErrorCode::Remote,
            SpeechError::Dns(_)
            | SpeechError::Connect(_)
            | SpeechError::Timeout(_)
            | SpeechError::Transport(_) => ErrorCode::Transport,
            SpeechError::Decode(_) => ErrorCode::Audio,
            SpeechError::Io(_) => ErrorCode::Storage,
        }
    }

    /// Operator hint logged next to transport failures.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SpeechError::Dns(_) => {
                Some("check the network connection and the configured base URL")
            }
            SpeechError::Connect(_) => {
                Some("network outage, firewall, or the API server is down; try again later")
            }
            SpeechError::Timeout(_) => {
                Some("check the API server status or raise the timeout")
            }
            _ => None,
        }
    }
}

impl RetryableError for SpeechError {
    fn status_code(&self) -> Option<u16> {
        match self {
            SpeechError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_connection_error(&self) -> bool {
        matches!(self, SpeechError::Dns(_) | SpeechError::Connect(_))
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

fn looks_like_dns_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
}
