//! Error types and platform result codes for resenc.

use thiserror::Error;

use crate::value::ValueKind;

/// Result codes reported by the platform stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackResult {
    /// The call succeeded.
    Ok,
    /// The remote host stopped advertising presence.
    PresenceStopped,
    /// No presence beacon arrived within the platform's window.
    PresenceTimeout,
    /// A parameter was rejected by the platform.
    InvalidParam,
    /// The host or resource URI could not be parsed.
    InvalidUri,
    /// The handle does not refer to a live subscription.
    NoResource,
    /// The platform could not reach the remote host.
    CommunicationError,
    /// Unspecified platform failure.
    Error,
}

impl StackResult {
    /// Numeric code as carried on the platform boundary.
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::PresenceStopped => 128,
            Self::PresenceTimeout => 129,
            Self::InvalidParam => 26,
            Self::InvalidUri => 20,
            Self::NoResource => 33,
            Self::CommunicationError => 40,
            Self::Error => 255,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for StackResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::PresenceStopped => write!(f, "presence_stopped"),
            Self::PresenceTimeout => write!(f, "presence_timeout"),
            Self::InvalidParam => write!(f, "invalid_param"),
            Self::InvalidUri => write!(f, "invalid_uri"),
            Self::NoResource => write!(f, "no_resource"),
            Self::CommunicationError => write!(f, "communication_error"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// resenc errors.
#[derive(Debug, Error)]
pub enum ResencError {
    /// Lookup of an attribute that the store does not hold.
    #[error("no attribute named '{key}'")]
    KeyNotFound { key: String },

    /// A value was read as a kind it does not have.
    #[error("kind mismatch: expected {expected}, found {actual}")]
    KindMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The platform rejected a presence subscribe/unsubscribe call.
    #[error("presence subscription failed: {code} ({reason})")]
    PlatformSubscription { code: StackResult, reason: String },

    /// Malformed input caught at an API boundary.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Protocol-level error (unexpected frame, invalid state transition).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport error (connection, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResencError {
    /// Build a subscription error from a platform result code.
    pub fn platform(code: StackResult, reason: impl Into<String>) -> Self {
        Self::PlatformSubscription {
            code,
            reason: reason.into(),
        }
    }
}

/// Result type alias for resenc operations.
pub type ResencResult<T> = Result<T, ResencError>;
