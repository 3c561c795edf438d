//! Election State Machine
//!
//! Holds the single current election state for a node, records every
//! transition with its timestamp, and notifies observers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::term::{CurrentLeadership, LeadershipTerm};
use super::ElectionState;

/// One recorded transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// State entered
    pub state: ElectionState,
    /// Wall-clock time of the transition in milliseconds
    pub timestamp_ms: i64,
}

/// Receives election notifications (audit log, cluster bookkeeping)
pub trait ElectionObserver: Send {
    /// Called once per successful transition, after the state has changed
    fn on_state_change(&mut self, change: &StateChange);

    /// Called when a new leadership term has been published
    fn on_new_leadership_term(&mut self, _term: &LeadershipTerm) {}
}

/// Election configuration
#[derive(Debug, Clone)]
pub struct ElectionConfig {
    /// How many times the election may fall back to CANVASS
    pub max_canvass_retries: u32,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            max_canvass_retries: 10,
        }
    }
}

/// Per-node election state machine
pub struct ElectionStateMachine {
    /// This node's member ID
    member_id: i32,
    /// Current state
    state: ElectionState,
    /// Every successful transition, in order
    trail: Vec<StateChange>,
    /// Retries taken back to CANVASS
    retries: u32,
    /// Election configuration
    config: ElectionConfig,
    /// Registered observers
    observers: Vec<Box<dyn ElectionObserver>>,
    /// Shared holder for the latest leadership term
    leadership: Arc<CurrentLeadership>,
}

impl ElectionStateMachine {
    /// Create a state machine in INIT
    pub fn new(member_id: i32, config: ElectionConfig, leadership: Arc<CurrentLeadership>) -> Self {
        tracing::debug!("Election for member {} entering {}", member_id, ElectionState::Init);

        Self {
            member_id,
            state: ElectionState::Init,
            trail: Vec::new(),
            retries: 0,
            config,
            observers: Vec::new(),
            leadership,
        }
    }

    /// Register an observer
    pub fn add_observer(&mut self, observer: Box<dyn ElectionObserver>) {
        self.observers.push(observer);
    }

    pub fn member_id(&self) -> i32 {
        self.member_id
    }

    /// Current state
    pub fn state(&self) -> ElectionState {
        self.state
    }

    /// Recorded transitions
    pub fn trail(&self) -> &[StateChange] {
        &self.trail
    }

    /// Retries taken so far
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_closed(&self) -> bool {
        self.state == ElectionState::Closed
    }

    /// Shared leadership holder this election publishes to
    pub fn leadership(&self) -> &Arc<CurrentLeadership> {
        &self.leadership
    }

    /// Move to `new_state` at `now_ms`.
    ///
    /// On any error the state, trail and retry count are unchanged and no
    /// observer is notified.
    pub fn transition(&mut self, new_state: ElectionState, now_ms: i64) -> Result<()> {
        let from = self.state;

        if from == ElectionState::Closed {
            return Err(Error::AlreadyClosed);
        }

        if !from.can_transition_to(new_state) {
            return Err(Error::IllegalStateTransition { from, to: new_state });
        }

        if let Some(last) = self.trail.last() {
            if now_ms < last.timestamp_ms {
                return Err(Error::ClockRegression {
                    last_ms: last.timestamp_ms,
                    now_ms,
                });
            }
        }

        let is_retry = from.is_retry(new_state);
        if is_retry && self.retries >= self.config.max_canvass_retries {
            return Err(Error::ElectionRetriesExhausted {
                attempts: self.retries + 1,
            });
        }

        if is_retry {
            self.retries += 1;
            tracing::debug!(
                "Election for member {} retrying from {} (attempt {})",
                self.member_id,
                from,
                self.retries + 1
            );
        }

        self.state = new_state;
        let change = StateChange {
            state: new_state,
            timestamp_ms: now_ms,
        };
        self.trail.push(change);

        tracing::info!(
            "Election state change for member {}: {} -> {} at {}",
            self.member_id,
            from,
            new_state,
            now_ms
        );

        for observer in self.observers.iter_mut() {
            observer.on_state_change(&change);
        }

        Ok(())
    }

    /// Close the election from whatever state it is in
    pub fn close(&mut self, now_ms: i64) -> Result<()> {
        self.transition(ElectionState::Closed, now_ms)
    }

    /// Publish the record for a concluded election.
    ///
    /// Only valid once a leader has been decided. The record is made
    /// visible through [`CurrentLeadership`] before observers are told.
    pub fn on_new_leadership_term(&mut self, term: LeadershipTerm) -> Result<Arc<LeadershipTerm>> {
        if self.state == ElectionState::Closed {
            return Err(Error::AlreadyClosed);
        }

        if !self.state.is_post_ballot() {
            return Err(Error::NoLeaderElected { state: self.state });
        }

        let published = self.leadership.publish(term)?;

        tracing::info!(
            "New leadership term for member {} in {}: {}",
            self.member_id,
            self.state,
            published
        );

        for observer in self.observers.iter_mut() {
            observer.on_new_leadership_term(&published);
        }

        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::election::state::EXPECTED_TRANSITIONS;
    use std::sync::Mutex;
    use ElectionState::*;

    #[derive(Default)]
    struct Recorded {
        changes: Vec<StateChange>,
        terms: Vec<LeadershipTerm>,
    }

    struct RecordingObserver(Arc<Mutex<Recorded>>);

    impl ElectionObserver for RecordingObserver {
        fn on_state_change(&mut self, change: &StateChange) {
            self.0.lock().unwrap().changes.push(*change);
        }

        fn on_new_leadership_term(&mut self, term: &LeadershipTerm) {
            self.0.lock().unwrap().terms.push(*term);
        }
    }

    fn machine() -> (ElectionStateMachine, Arc<Mutex<Recorded>>) {
        let mut election = ElectionStateMachine::new(
            1,
            ElectionConfig { max_canvass_retries: 2 },
            Arc::new(CurrentLeadership::new()),
        );
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        election.add_observer(Box::new(RecordingObserver(Arc::clone(&recorded))));
        (election, recorded)
    }

    /// Shortest legal path from INIT to `state`
    fn path_to(state: ElectionState) -> &'static [ElectionState] {
        match state {
            Init => &[],
            Canvass => &[Canvass],
            Nominate => &[Canvass, Nominate],
            CandidateBallot => &[Canvass, Nominate, CandidateBallot],
            FollowerBallot => &[Canvass, Nominate, FollowerBallot],
            LeaderReplay => &[LeaderReplay],
            LeaderTransition => &[LeaderReplay, LeaderTransition],
            LeaderReady => &[LeaderReplay, LeaderTransition, LeaderReady],
            FollowerReplay => &[Canvass, FollowerReplay],
            FollowerCatchup => &[Canvass, FollowerReplay, FollowerCatchup],
            FollowerTransition => &[Canvass, FollowerReplay, FollowerTransition],
            FollowerReady => &[Canvass, FollowerReplay, FollowerTransition, FollowerReady],
            Closed => &[Closed],
        }
    }

    #[test]
    fn test_every_pair_through_machine() {
        for &(from, legal) in EXPECTED_TRANSITIONS {
            for to in ElectionState::ALL {
                let (mut election, recorded) = machine();
                for (i, state) in path_to(from).iter().enumerate() {
                    election.transition(*state, i as i64).unwrap();
                }
                assert_eq!(election.state(), from);

                let trail_before = election.trail().to_vec();
                let notified_before = recorded.lock().unwrap().changes.len();
                let result = election.transition(to, 100);

                if legal.contains(&to) {
                    assert!(result.is_ok(), "{} -> {} rejected: {:?}", from, to, result);
                    assert_eq!(election.state(), to);
                    assert_eq!(election.trail().last(), Some(&StateChange { state: to, timestamp_ms: 100 }));
                    assert_eq!(recorded.lock().unwrap().changes.len(), notified_before + 1);
                    continue;
                }

                match result {
                    Err(Error::AlreadyClosed) => assert_eq!(from, Closed),
                    Err(Error::IllegalStateTransition { from: f, to: t }) => {
                        assert_eq!((f, t), (from, to));
                        assert_ne!(from, Closed);
                    }
                    other => panic!("{} -> {} gave {:?}", from, to, other),
                }
                assert_eq!(election.state(), from);
                assert_eq!(election.trail(), trail_before.as_slice());
                assert_eq!(recorded.lock().unwrap().changes.len(), notified_before);
            }
        }
    }

    #[test]
    fn test_starts_in_init() {
        let (election, _) = machine();
        assert_eq!(election.state(), Init);
        assert!(election.trail().is_empty());
    }

    #[test]
    fn test_leader_path_records_trail() {
        let (mut election, recorded) = machine();
        let path = [Canvass, Nominate, CandidateBallot, LeaderReplay, LeaderTransition, LeaderReady];

        for (i, state) in path.iter().enumerate() {
            election.transition(*state, 100 + i as i64).unwrap();
        }

        assert_eq!(election.state(), LeaderReady);
        let states: Vec<_> = election.trail().iter().map(|c| c.state).collect();
        assert_eq!(states, path);
        assert_eq!(recorded.lock().unwrap().changes, election.trail());
    }

    #[test]
    fn test_illegal_transition_leaves_state_unchanged() {
        let (mut election, recorded) = machine();
        election.transition(Canvass, 10).unwrap();

        let result = election.transition(LeaderReady, 11);
        assert!(matches!(
            result,
            Err(Error::IllegalStateTransition { from: Canvass, to: LeaderReady })
        ));
        assert_eq!(election.state(), Canvass);
        assert_eq!(election.trail().len(), 1);
        assert_eq!(recorded.lock().unwrap().changes.len(), 1);
    }

    #[test]
    fn test_closed_is_terminal_and_idempotent() {
        let (mut election, _) = machine();
        election.transition(Canvass, 10).unwrap();
        election.close(20).unwrap();
        let trail = election.trail().to_vec();

        for state in ElectionState::ALL {
            assert!(matches!(election.transition(state, 30), Err(Error::AlreadyClosed)));
        }
        assert!(matches!(election.close(40), Err(Error::AlreadyClosed)));
        assert_eq!(election.trail(), trail.as_slice());
    }

    #[test]
    fn test_clock_regression_rejected() {
        let (mut election, _) = machine();
        election.transition(Canvass, 100).unwrap();

        let result = election.transition(Nominate, 99);
        assert!(matches!(
            result,
            Err(Error::ClockRegression { last_ms: 100, now_ms: 99 })
        ));
        assert_eq!(election.state(), Canvass);

        // Same millisecond is fine
        election.transition(Nominate, 100).unwrap();
        let stamps: Vec<_> = election.trail().iter().map(|c| c.timestamp_ms).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_retry_is_bounded() {
        let (mut election, _) = machine();
        election.transition(Canvass, 1).unwrap();

        for attempt in 0..2 {
            election.transition(Nominate, 2 + attempt).unwrap();
            election.transition(Canvass, 2 + attempt).unwrap();
        }
        assert_eq!(election.retries(), 2);

        election.transition(Nominate, 10).unwrap();
        let result = election.transition(Canvass, 11);
        assert!(matches!(result, Err(Error::ElectionRetriesExhausted { attempts: 3 })));
        assert_eq!(election.state(), Nominate);

        // Giving up is still possible
        election.close(12).unwrap();
    }

    #[test]
    fn test_new_leadership_term_requires_decided_leader() {
        let (mut election, recorded) = machine();
        let term = LeadershipTerm::finalize(5, 1000, 6, 1200, 1, 42).unwrap();

        election.transition(Canvass, 1).unwrap();
        assert!(matches!(
            election.on_new_leadership_term(term),
            Err(Error::NoLeaderElected { state: Canvass })
        ));
        assert!(election.leadership().latest().is_none());

        election.transition(Nominate, 2).unwrap();
        election.transition(CandidateBallot, 3).unwrap();
        election.transition(LeaderReplay, 4).unwrap();

        let published = election.on_new_leadership_term(term).unwrap();
        assert_eq!(*published, term);
        assert_eq!(election.leadership().leadership_term_id(), Some(6));
        assert_eq!(recorded.lock().unwrap().terms, vec![term]);
    }

    #[test]
    fn test_new_leadership_term_after_close() {
        let (mut election, _) = machine();
        election.close(1).unwrap();
        let term = LeadershipTerm::finalize(0, 0, 1, 0, 1, 1).unwrap();
        assert!(matches!(election.on_new_leadership_term(term), Err(Error::AlreadyClosed)));
    }
}
