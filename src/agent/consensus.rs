//! Consensus Module Agent
//!
//! Owns a node's election, its view of the current leadership term and the
//! session table. Sessions are only admitted while this node is the
//! elected, ready leader.

use std::sync::Arc;

use crate::config::ConsensusConfig;
use crate::election::{ElectionObserver, ElectionState, ElectionStateMachine};
use crate::error::{Error, Result};
use crate::session::{Authenticator, EgressPublisher, LeaderContext, SessionState, SessionTable};
use crate::term::{CurrentLeadership, LeadershipTerm};
use super::Agent;

/// Duty-cycle agent for one cluster member
pub struct ConsensusAgent<E: EgressPublisher> {
    election: ElectionStateMachine,
    leadership: Arc<CurrentLeadership>,
    sessions: SessionTable,
    authenticator: Box<dyn Authenticator>,
    egress: E,
}

impl<E: EgressPublisher> ConsensusAgent<E> {
    pub fn new(config: &ConsensusConfig, authenticator: Box<dyn Authenticator>, egress: E) -> Self {
        let leadership = Arc::new(CurrentLeadership::new());
        let election = ElectionStateMachine::new(
            config.node.member_id,
            config.election_config(),
            Arc::clone(&leadership),
        );

        Self {
            election,
            leadership,
            sessions: SessionTable::new(config.session.max_encoded_principal_length),
            authenticator,
            egress,
        }
    }

    pub fn member_id(&self) -> i32 {
        self.election.member_id()
    }

    pub fn election(&self) -> &ElectionStateMachine {
        &self.election
    }

    pub fn leadership(&self) -> &Arc<CurrentLeadership> {
        &self.leadership
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn egress(&self) -> &E {
        &self.egress
    }

    pub fn add_observer(&mut self, observer: Box<dyn ElectionObserver>) {
        self.election.add_observer(observer);
    }

    pub fn transition(&mut self, new_state: ElectionState, now_ms: i64) -> Result<()> {
        self.election.transition(new_state, now_ms)
    }

    pub fn on_new_leadership_term(&mut self, term: LeadershipTerm) -> Result<Arc<LeadershipTerm>> {
        self.election.on_new_leadership_term(term)
    }

    /// Elect this node as the only member of a cluster.
    ///
    /// Skips canvassing and replays straight into leadership. Every step is
    /// stamped with the single `now_ms` so a stepping wall clock cannot
    /// interrupt the sequence.
    pub fn bootstrap_sole_leader(&mut self, now_ms: i64) -> Result<Arc<LeadershipTerm>> {
        let log_leadership_term_id = self.leadership.leadership_term_id().unwrap_or(-1);
        let term = LeadershipTerm::finalize(
            log_leadership_term_id,
            0,
            log_leadership_term_id + 1,
            0,
            self.member_id(),
            1,
        )?;

        self.transition(ElectionState::LeaderReplay, now_ms)?;
        let published = self.on_new_leadership_term(term)?;
        self.transition(ElectionState::LeaderTransition, now_ms)?;
        self.transition(ElectionState::LeaderReady, now_ms)?;
        Ok(published)
    }

    /// Leader context when this node is the ready leader
    pub fn admitting_leader(&self) -> Option<LeaderContext> {
        if self.election.state() != ElectionState::LeaderReady {
            return None;
        }

        self.leadership
            .leader_context()
            .filter(|leader| leader.leader_member_id() == self.member_id())
    }

    /// Open and connect a session for a client connect request
    pub fn on_session_connect(
        &mut self,
        response_channel: impl Into<String>,
        is_backup: bool,
        encoded_credentials: &[u8],
        now_ms: i64,
    ) -> Result<i64> {
        let id = self.sessions.open(response_channel, is_backup, now_ms)?;
        self.sessions.connect(id)?;
        self.authenticator.on_connect_request(id, encoded_credentials, now_ms);
        Ok(id)
    }

    /// Hand a challenge response to the authenticator
    pub fn on_challenge_response(&mut self, session_id: i64, encoded_credentials: &[u8], now_ms: i64) -> Result<()> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or(Error::SessionNotFound(session_id))?;

        if session.state() != SessionState::Challenged {
            return Err(Error::InvalidSessionState {
                session_id,
                state: session.state(),
            });
        }

        self.authenticator
            .on_challenge_response(session_id, encoded_credentials, now_ms);
        Ok(())
    }
}

impl<E: EgressPublisher> Agent for ConsensusAgent<E> {
    fn role_name(&self) -> &str {
        "consensus-module"
    }

    fn do_work(&mut self, now_ms: i64) -> Result<usize> {
        let Some(leader) = self.admitting_leader() else {
            return Ok(0);
        };

        let mut work = self.sessions.poll_authentication(
            self.authenticator.as_mut(),
            &mut self.egress,
            leader,
            now_ms,
        );
        work += self.sessions.sweep_rejected(&mut self.egress, leader).len();

        Ok(work)
    }

    fn on_close(&mut self, now_ms: i64) -> Result<()> {
        if !self.election.is_closed() {
            self.election.close(now_ms)?;
        }
        Ok(())
    }
}
