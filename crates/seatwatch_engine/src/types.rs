use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    SessionNotReady,
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    MalformedPayload,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::SessionNotReady => write!(f, "session_not_ready"),
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::MalformedPayload => write!(f, "malformed payload"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Custom data attached to every alarm message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertData {
    pub event_code: String,
    pub seats: u32,
}

/// One message in the push service's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub priority: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AlertData>,
}

impl PushMessage {
    pub fn alarm(to: &str, title: String, body: String, data: Option<AlertData>) -> Self {
        Self {
            to: to.to_string(),
            sound: "default".to_string(),
            title,
            body,
            priority: "high".to_string(),
            channel_id: "alarm".to_string(),
            data,
        }
    }
}

/// Per-message receipt returned by the push service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PushTicket {
    Ok {
        id: String,
    },
    Error {
        message: String,
    },
}

impl PushTicket {
    pub fn is_ok(&self) -> bool {
        matches!(self, PushTicket::Ok { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("push service returned http status {0}")]
    HttpStatus(u16),
    #[error("push service rejected the request: {0}")]
    Rejected(String),
    #[error("push service response could not be decoded: {0}")]
    Decode(String),
    #[error("network error: {0}")]
    Network(String),
}
