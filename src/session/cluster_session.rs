//! Cluster Session
//!
//! Admission state of one client connected to the cluster.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest encoded principal a session may carry
pub const MAX_ENCODED_PRINCIPAL_LENGTH: usize = 4 * 1024;

/// Detail sent with every authentication rejection
pub const SESSION_REJECTED_MSG: &str = "session failed authentication";

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Init,
    Connected,
    Challenged,
    Authenticated,
    Rejected,
    Closed,
}

impl SessionState {
    /// Waiting on the authenticator
    pub fn is_pending_authentication(&self) -> bool {
        matches!(self, SessionState::Connected | SessionState::Challenged)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Init => write!(f, "INIT"),
            SessionState::Connected => write!(f, "CONNECTED"),
            SessionState::Challenged => write!(f, "CHALLENGED"),
            SessionState::Authenticated => write!(f, "AUTHENTICATED"),
            SessionState::Rejected => write!(f, "REJECTED"),
            SessionState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Session event codes sent on egress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum EventCode {
    Ok = 0,
    Error = 1,
    Redirect = 2,
    AuthenticationRejected = 3,
    Closed = 4,
}

impl std::fmt::Display for EventCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCode::Ok => write!(f, "OK"),
            EventCode::Error => write!(f, "ERROR"),
            EventCode::Redirect => write!(f, "REDIRECT"),
            EventCode::AuthenticationRejected => write!(f, "AUTHENTICATION_REJECTED"),
            EventCode::Closed => write!(f, "CLOSED"),
        }
    }
}

/// One client's admission state.
///
/// Owned by the session table; state changes that involve the client go
/// through a `SessionProxy`.
#[derive(Debug, Clone)]
pub struct ClusterSession {
    id: i64,
    state: SessionState,
    is_backup: bool,
    response_channel: String,
    encoded_principal: Bytes,
    /// Event to report when the session is rejected
    event_code: Option<EventCode>,
    response_detail: String,
    /// Whether the rejection event reached the client
    rejection_delivered: bool,
    opened_at_ms: i64,
}

impl ClusterSession {
    /// Create a session in INIT
    pub fn new(id: i64, response_channel: impl Into<String>, is_backup: bool, now_ms: i64) -> Self {
        Self {
            id,
            state: SessionState::Init,
            is_backup,
            response_channel: response_channel.into(),
            encoded_principal: Bytes::new(),
            event_code: None,
            response_detail: String::new(),
            rejection_delivered: false,
            opened_at_ms: now_ms,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Backup/replay sessions have no live client expecting acknowledgement
    pub fn is_backup_session(&self) -> bool {
        self.is_backup
    }

    pub fn response_channel(&self) -> &str {
        &self.response_channel
    }

    /// Principal recorded at authentication (empty before)
    pub fn encoded_principal(&self) -> &Bytes {
        &self.encoded_principal
    }

    pub fn event_code(&self) -> Option<EventCode> {
        self.event_code
    }

    pub fn response_detail(&self) -> &str {
        &self.response_detail
    }

    pub fn opened_at_ms(&self) -> i64 {
        self.opened_at_ms
    }

    pub fn rejection_delivered(&self) -> bool {
        self.rejection_delivered
    }

    /// Fail if `encoded_principal` exceeds `max` bytes
    pub fn check_encoded_principal_length(encoded_principal: &[u8], max: usize) -> Result<()> {
        if encoded_principal.len() > max {
            return Err(Error::PrincipalTooLarge {
                length: encoded_principal.len(),
                max,
            });
        }
        Ok(())
    }

    /// INIT -> CONNECTED once the response publication is available
    pub fn connect(&mut self) -> Result<()> {
        if self.state != SessionState::Init {
            return Err(self.invalid_state());
        }
        self.state = SessionState::Connected;
        Ok(())
    }

    pub(crate) fn challenged(&mut self) {
        self.state = SessionState::Challenged;
    }

    pub(crate) fn authenticate(&mut self, encoded_principal: &[u8]) {
        self.encoded_principal = Bytes::copy_from_slice(encoded_principal);
        self.state = SessionState::Authenticated;
    }

    pub(crate) fn reject(&mut self, code: EventCode, detail: &str) {
        self.event_code = Some(code);
        self.response_detail = detail.to_string();
        self.rejection_delivered = false;
        self.state = SessionState::Rejected;
    }

    pub(crate) fn set_rejection_delivered(&mut self, delivered: bool) {
        self.rejection_delivered = delivered;
    }

    pub(crate) fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub(crate) fn invalid_state(&self) -> Error {
        Error::InvalidSessionState {
            session_id: self.id,
            state: self.state,
        }
    }
}
