//! Session Proxy
//!
//! Short-lived handle through which an authenticator drives one session's
//! challenge/response handshake.

use crate::error::{Error, Result};
use crate::term::LeadershipTerm;
use super::{ClusterSession, EgressPublisher, EventCode, SessionState, SESSION_REJECTED_MSG};

/// Leader identity used to tag session events.
///
/// Only obtainable from a finalized [`LeadershipTerm`], so no event can be
/// tagged with a term that has not been published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderContext {
    leadership_term_id: i64,
    leader_member_id: i32,
}

impl LeaderContext {
    pub fn leadership_term_id(&self) -> i64 {
        self.leadership_term_id
    }

    pub fn leader_member_id(&self) -> i32 {
        self.leader_member_id
    }
}

impl From<&LeadershipTerm> for LeaderContext {
    fn from(term: &LeadershipTerm) -> Self {
        Self {
            leadership_term_id: term.leadership_term_id(),
            leader_member_id: term.leader_member_id(),
        }
    }
}

/// Mediates authentication for exactly one borrowed session
pub struct SessionProxy<'a> {
    session: &'a mut ClusterSession,
    egress: &'a mut dyn EgressPublisher,
    leader: LeaderContext,
    max_principal_length: usize,
}

impl<'a> SessionProxy<'a> {
    pub fn new(
        session: &'a mut ClusterSession,
        egress: &'a mut dyn EgressPublisher,
        leader: LeaderContext,
        max_principal_length: usize,
    ) -> Self {
        Self {
            session,
            egress,
            leader,
            max_principal_length,
        }
    }

    pub fn session_id(&self) -> i64 {
        self.session.id()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn leader(&self) -> LeaderContext {
        self.leader
    }

    /// Send a challenge; CONNECTED becomes CHALLENGED once it is delivered.
    ///
    /// Repeating the call while CHALLENGED resends without changing state.
    pub fn challenge(&mut self, encoded_challenge: &[u8]) -> Result<()> {
        if !self.session.state().is_pending_authentication() {
            return Err(self.session.invalid_state());
        }

        if !self.egress.send_challenge(self.session, encoded_challenge) {
            tracing::debug!("Challenge to session {} not delivered", self.session.id());
            return Err(Error::DeliveryFailed {
                session_id: self.session.id(),
            });
        }

        self.session.challenged();
        Ok(())
    }

    /// Accept the session with `encoded_principal`.
    ///
    /// Ordinary sessions are only marked AUTHENTICATED after the OK event
    /// has been delivered. Backup sessions are accepted locally.
    pub fn authenticate(&mut self, encoded_principal: &[u8]) -> Result<()> {
        ClusterSession::check_encoded_principal_length(encoded_principal, self.max_principal_length)?;

        if !self.session.state().is_pending_authentication() {
            return Err(self.session.invalid_state());
        }

        if !self.session.is_backup_session()
            && !self.egress.send_event(
                self.session,
                self.leader.leadership_term_id,
                self.leader.leader_member_id,
                EventCode::Ok,
                "",
            )
        {
            tracing::debug!("Authentication ack to session {} not delivered", self.session.id());
            return Err(Error::DeliveryFailed {
                session_id: self.session.id(),
            });
        }

        self.session.authenticate(encoded_principal);
        tracing::info!(
            "Session {} authenticated (backup: {}, term {})",
            self.session.id(),
            self.session.is_backup_session(),
            self.leader.leadership_term_id
        );
        Ok(())
    }

    /// Reject the session and send the rejection event once.
    ///
    /// The session is REJECTED even if delivery fails; the session table
    /// retries undelivered rejections before closing.
    pub fn reject(&mut self) -> Result<()> {
        if matches!(self.session.state(), SessionState::Rejected | SessionState::Closed) {
            return Err(self.session.invalid_state());
        }

        self.session.reject(EventCode::AuthenticationRejected, SESSION_REJECTED_MSG);
        tracing::info!("Session {} rejected", self.session.id());

        send_rejection(self.session, self.egress, self.leader)
    }
}

/// Deliver the stored rejection event for a REJECTED session
pub(crate) fn send_rejection(
    session: &mut ClusterSession,
    egress: &mut dyn EgressPublisher,
    leader: LeaderContext,
) -> Result<()> {
    let code = session.event_code().unwrap_or(EventCode::AuthenticationRejected);
    let delivered = egress.send_event(
        session,
        leader.leadership_term_id,
        leader.leader_member_id,
        code,
        session.response_detail(),
    );
    session.set_rejection_delivered(delivered);

    if delivered {
        Ok(())
    } else {
        Err(Error::DeliveryFailed {
            session_id: session.id(),
        })
    }
}
