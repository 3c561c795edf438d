//! Egress Publisher
//!
//! Seam to the transport that delivers session-facing messages to clients.

use super::{ClusterSession, EventCode};

/// Delivers protocol messages to a session's client.
///
/// Both calls return `false` on ordinary delivery failure (back pressure,
/// publication not connected). Callers retry on a later duty cycle.
pub trait EgressPublisher: Send {
    /// Send an authentication challenge
    fn send_challenge(&mut self, session: &ClusterSession, encoded_challenge: &[u8]) -> bool;

    /// Send a session event tagged with the current leader
    fn send_event(
        &mut self,
        session: &ClusterSession,
        leadership_term_id: i64,
        leader_member_id: i32,
        code: EventCode,
        detail: &str,
    ) -> bool;
}

/// Publisher that logs every message and reports success.
///
/// Useful for dry runs where no client transport exists.
#[derive(Debug, Default)]
pub struct TracingEgress {
    sent: u64,
}

impl TracingEgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl EgressPublisher for TracingEgress {
    fn send_challenge(&mut self, session: &ClusterSession, encoded_challenge: &[u8]) -> bool {
        self.sent += 1;
        tracing::info!(
            "Egress challenge to session {} on {} ({} bytes)",
            session.id(),
            session.response_channel(),
            encoded_challenge.len()
        );
        true
    }

    fn send_event(
        &mut self,
        session: &ClusterSession,
        leadership_term_id: i64,
        leader_member_id: i32,
        code: EventCode,
        detail: &str,
    ) -> bool {
        self.sent += 1;
        tracing::info!(
            "Egress event {} to session {} (term {}, leader {}): {:?}",
            code,
            session.id(),
            leadership_term_id,
            leader_member_id,
            detail
        );
        true
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use super::*;

    /// Message captured by [`RecordingEgress`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Challenge {
            session_id: i64,
            challenge: Vec<u8>,
        },
        Event {
            session_id: i64,
            leadership_term_id: i64,
            leader_member_id: i32,
            code: EventCode,
            detail: String,
        },
    }

    /// Records every call; outcomes are scripted, defaulting to success
    #[derive(Debug, Default)]
    pub struct RecordingEgress {
        pub calls: Vec<Sent>,
        outcomes: VecDeque<bool>,
    }

    impl RecordingEgress {
        pub fn new() -> Self {
            Self::default()
        }

        /// Publisher whose next calls return `outcomes` in order
        pub fn scripted(outcomes: &[bool]) -> Self {
            Self {
                calls: Vec::new(),
                outcomes: outcomes.iter().copied().collect(),
            }
        }

        pub fn failing() -> Self {
            Self::scripted(&[false; 16])
        }

        fn next_outcome(&mut self) -> bool {
            self.outcomes.pop_front().unwrap_or(true)
        }
    }

    impl EgressPublisher for RecordingEgress {
        fn send_challenge(&mut self, session: &ClusterSession, encoded_challenge: &[u8]) -> bool {
            self.calls.push(Sent::Challenge {
                session_id: session.id(),
                challenge: encoded_challenge.to_vec(),
            });
            self.next_outcome()
        }

        fn send_event(
            &mut self,
            session: &ClusterSession,
            leadership_term_id: i64,
            leader_member_id: i32,
            code: EventCode,
            detail: &str,
        ) -> bool {
            self.calls.push(Sent::Event {
                session_id: session.id(),
                leadership_term_id,
                leader_member_id,
                code,
                detail: detail.to_string(),
            });
            self.next_outcome()
        }
    }
}
