//! Leadership Term Record
//!
//! The immutable handoff value produced when an election confirms a leader.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Completed leadership handoff.
///
/// Fields are private so a record can only exist once both invariants hold:
/// `leadership_term_id > log_leadership_term_id` and
/// `max_log_position >= log_position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadershipTerm {
    log_leadership_term_id: i64,
    log_position: i64,
    leadership_term_id: i64,
    max_log_position: i64,
    leader_member_id: i32,
    log_session_id: i32,
}

impl LeadershipTerm {
    /// Validate and build the record for a concluded election
    pub fn finalize(
        log_leadership_term_id: i64,
        log_position: i64,
        leadership_term_id: i64,
        max_log_position: i64,
        leader_member_id: i32,
        log_session_id: i32,
    ) -> Result<Self> {
        if leadership_term_id <= log_leadership_term_id {
            return Err(Error::InvalidTermTransition(format!(
                "leadership term {} does not advance log term {}",
                leadership_term_id, log_leadership_term_id
            )));
        }

        if max_log_position < log_position {
            return Err(Error::InvalidTermTransition(format!(
                "max log position {} is behind log position {}",
                max_log_position, log_position
            )));
        }

        Ok(Self {
            log_leadership_term_id,
            log_position,
            leadership_term_id,
            max_log_position,
            leader_member_id,
            log_session_id,
        })
    }

    /// Term the log being continued belongs to
    pub fn log_leadership_term_id(&self) -> i64 {
        self.log_leadership_term_id
    }

    /// Log position at handoff
    pub fn log_position(&self) -> i64 {
        self.log_position
    }

    /// New authoritative term
    pub fn leadership_term_id(&self) -> i64 {
        self.leadership_term_id
    }

    /// Highest position durable for the prior term
    pub fn max_log_position(&self) -> i64 {
        self.max_log_position
    }

    pub fn leader_member_id(&self) -> i32 {
        self.leader_member_id
    }

    pub fn log_session_id(&self) -> i32 {
        self.log_session_id
    }
}

impl std::fmt::Display for LeadershipTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "term {} (from {}) leader={} logPosition={} maxLogPosition={} logSessionId={}",
            self.leadership_term_id,
            self.log_leadership_term_id,
            self.leader_member_id,
            self.log_position,
            self.max_log_position,
            self.log_session_id
        )
    }
}
