//! Session Table
//!
//! Arena of cluster sessions keyed by session id. Proxies are handed out
//! per session, so only one writer can touch a session at a time.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use super::proxy::send_rejection;
use super::{Authenticator, ClusterSession, EgressPublisher, LeaderContext, SessionProxy, SessionState};

/// Sessions owned by the consensus module
pub struct SessionTable {
    sessions: BTreeMap<i64, ClusterSession>,
    next_session_id: i64,
    max_principal_length: usize,
}

impl SessionTable {
    pub fn new(max_principal_length: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_session_id: 1,
            max_principal_length,
        }
    }

    /// Open a new session in INIT, returning its id
    pub fn open(&mut self, response_channel: impl Into<String>, is_backup: bool, now_ms: i64) -> Result<i64> {
        let id = self.next_session_id;
        if self.sessions.contains_key(&id) {
            return Err(Error::DuplicateSession(id));
        }

        self.next_session_id = next_id_after(id)?;
        self.sessions
            .insert(id, ClusterSession::new(id, response_channel, is_backup, now_ms));
        tracing::debug!("Opened session {} (backup: {})", id, is_backup);
        Ok(id)
    }

    /// Re-insert a session carried over from a snapshot or log replay
    pub fn restore(&mut self, session: ClusterSession) -> Result<()> {
        let id = session.id();
        if self.sessions.contains_key(&id) {
            return Err(Error::DuplicateSession(id));
        }
        self.next_session_id = self.next_session_id.max(next_id_after(id)?);
        self.sessions.insert(id, session);
        Ok(())
    }

    /// Mark a session CONNECTED
    pub fn connect(&mut self, id: i64) -> Result<()> {
        self.sessions
            .get_mut(&id)
            .ok_or(Error::SessionNotFound(id))?
            .connect()
    }

    pub fn get(&self, id: i64) -> Option<&ClusterSession> {
        self.sessions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterSession> {
        self.sessions.values()
    }

    pub fn max_principal_length(&self) -> usize {
        self.max_principal_length
    }

    /// Borrow one session through a proxy
    pub fn proxy<'a>(
        &'a mut self,
        id: i64,
        egress: &'a mut dyn EgressPublisher,
        leader: LeaderContext,
    ) -> Result<SessionProxy<'a>> {
        let max = self.max_principal_length;
        let session = self.sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))?;
        Ok(SessionProxy::new(session, egress, leader, max))
    }

    /// Close and drop a session
    pub fn remove(&mut self, id: i64) -> Result<ClusterSession> {
        let mut session = self.sessions.remove(&id).ok_or(Error::SessionNotFound(id))?;
        session.close();
        Ok(session)
    }

    /// Let the authenticator act on every CONNECTED or CHALLENGED session.
    ///
    /// Returns the number of sessions whose state changed.
    pub fn poll_authentication(
        &mut self,
        authenticator: &mut dyn Authenticator,
        egress: &mut dyn EgressPublisher,
        leader: LeaderContext,
        now_ms: i64,
    ) -> usize {
        let max = self.max_principal_length;
        let mut work = 0;

        for session in self.sessions.values_mut() {
            let before = session.state();
            if !before.is_pending_authentication() {
                continue;
            }

            let result = {
                let mut proxy = SessionProxy::new(&mut *session, &mut *egress, leader, max);
                match before {
                    SessionState::Connected => authenticator.on_connected_session(&mut proxy, now_ms),
                    _ => authenticator.on_challenged_session(&mut proxy, now_ms),
                }
            };

            if let Err(e) = result {
                if e.is_retryable() {
                    tracing::debug!("Session {} will retry: {}", session.id(), e);
                } else {
                    tracing::warn!("Authenticator failed on session {}: {}", session.id(), e);
                }
            }

            if session.state() != before {
                work += 1;
            }
        }

        work
    }

    /// Finish REJECTED sessions: resend undelivered rejections, then close
    /// and drop every session whose rejection reached the client.
    ///
    /// Returns the ids of the sessions closed.
    pub fn sweep_rejected(&mut self, egress: &mut dyn EgressPublisher, leader: LeaderContext) -> Vec<i64> {
        let mut closed = Vec::new();

        for session in self.sessions.values_mut() {
            if session.state() != SessionState::Rejected {
                continue;
            }

            if !session.rejection_delivered() {
                if let Err(e) = send_rejection(session, &mut *egress, leader) {
                    tracing::debug!("Rejection for session {} still pending: {}", session.id(), e);
                    continue;
                }
            }

            session.close();
            closed.push(session.id());
        }

        for id in &closed {
            self.sessions.remove(id);
            tracing::info!("Closed rejected session {}", id);
        }

        closed
    }
}

/// Id to allocate after `id`
fn next_id_after(id: i64) -> Result<i64> {
    id.checked_add(1)
        .ok_or_else(|| Error::Internal(format!("session id space exhausted after {}", id)))
}
