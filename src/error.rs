//! WolfConsensus Error Types

use thiserror::Error;

use crate::election::ElectionState;
use crate::session::SessionState;

/// Result type alias for WolfConsensus operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfConsensus error types
#[derive(Error, Debug)]
pub enum Error {
    // Election errors
    #[error("Illegal election state transition: {from} -> {to}")]
    IllegalStateTransition { from: ElectionState, to: ElectionState },

    #[error("Election is closed")]
    AlreadyClosed,

    #[error("Election retries exhausted after {attempts} attempts")]
    ElectionRetriesExhausted { attempts: u32 },

    #[error("Clock went backwards: last transition at {last_ms}ms, now {now_ms}ms")]
    ClockRegression { last_ms: i64, now_ms: i64 },

    #[error("No leader elected yet (election state {state})")]
    NoLeaderElected { state: ElectionState },

    // Leadership term errors
    #[error("Invalid term transition: {0}")]
    InvalidTermTransition(String),

    #[error("Stale leadership term {proposed}: current term is {current}")]
    StaleLeadershipTerm { current: i64, proposed: i64 },

    // Session errors
    #[error("Encoded principal too large: {length} > {max} bytes")]
    PrincipalTooLarge { length: usize, max: usize },

    #[error("Delivery failed to session {session_id}")]
    DeliveryFailed { session_id: i64 },

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("Session already exists: {0}")]
    DuplicateSession(i64),

    #[error("Session {session_id} is {state}")]
    InvalidSessionState { session_id: i64, state: SessionState },

    // Encoding errors
    #[error("Buffer too small: need {required} bytes, have {capacity}")]
    BufferTooSmall { required: usize, capacity: usize },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error is retryable on a later duty cycle
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DeliveryFailed { .. })
    }

    /// Check if this error is a protocol violation by the caller.
    ///
    /// These abort the current operation and leave state unchanged; they are
    /// never retried automatically.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Error::IllegalStateTransition { .. }
                | Error::AlreadyClosed
                | Error::InvalidTermTransition(_)
                | Error::PrincipalTooLarge { .. }
                | Error::ElectionRetriesExhausted { .. }
                | Error::ClockRegression { .. }
                | Error::StaleLeadershipTerm { .. }
                | Error::InvalidSessionState { .. }
        )
    }
}
