//! Election States
//!
//! The closed set of election phases and the adjacency table that decides
//! which transitions are legal.

use serde::{Deserialize, Serialize};

/// Election phase of a single node.
///
/// Variants are declared in protocol order; `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElectionState {
    /// Consensus module just started
    Init,
    /// Gathering log positions from other members
    Canvass,
    /// Waiting out the nomination timeout before standing
    Nominate,
    /// Standing as candidate, collecting votes
    CandidateBallot,
    /// Voted for another candidate, waiting for the outcome
    FollowerBallot,
    /// Won the ballot, replaying local log
    LeaderReplay,
    /// Opening the new log for the term
    LeaderTransition,
    /// Leading the term
    LeaderReady,
    /// Following, replaying local log
    FollowerReplay,
    /// Following, catching up from the leader's log
    FollowerCatchup,
    /// Following, joining the live log
    FollowerTransition,
    /// Following the term
    FollowerReady,
    /// Election finished or aborted
    Closed,
}

use ElectionState::*;

impl ElectionState {
    /// Every state, in protocol order
    pub const ALL: [ElectionState; 13] = [
        Init,
        Canvass,
        Nominate,
        CandidateBallot,
        FollowerBallot,
        LeaderReplay,
        LeaderTransition,
        LeaderReady,
        FollowerReplay,
        FollowerCatchup,
        FollowerTransition,
        FollowerReady,
        Closed,
    ];

    /// Wire name of the state (ASCII, upper snake case)
    pub fn name(&self) -> &'static str {
        match self {
            Init => "INIT",
            Canvass => "CANVASS",
            Nominate => "NOMINATE",
            CandidateBallot => "CANDIDATE_BALLOT",
            FollowerBallot => "FOLLOWER_BALLOT",
            LeaderReplay => "LEADER_REPLAY",
            LeaderTransition => "LEADER_TRANSITION",
            LeaderReady => "LEADER_READY",
            FollowerReplay => "FOLLOWER_REPLAY",
            FollowerCatchup => "FOLLOWER_CATCHUP",
            FollowerTransition => "FOLLOWER_TRANSITION",
            FollowerReady => "FOLLOWER_READY",
            Closed => "CLOSED",
        }
    }

    /// Look a state up by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// States reachable in one step from this one
    pub fn successors(&self) -> &'static [ElectionState] {
        match self {
            Init => &[Canvass, LeaderReplay, Closed],
            Canvass => &[Nominate, FollowerReplay, Closed],
            Nominate => &[CandidateBallot, FollowerBallot, Canvass, Closed],
            CandidateBallot => &[LeaderReplay, FollowerBallot, Canvass, Closed],
            FollowerBallot => &[FollowerReplay, Canvass, Closed],
            LeaderReplay => &[LeaderTransition, Canvass, Closed],
            LeaderTransition => &[LeaderReady, Canvass, Closed],
            LeaderReady => &[Closed],
            FollowerReplay => &[FollowerCatchup, FollowerTransition, Canvass, Closed],
            FollowerCatchup => &[FollowerTransition, Canvass, Closed],
            FollowerTransition => &[FollowerReady, Canvass, Closed],
            FollowerReady => &[Closed],
            Closed => &[],
        }
    }

    /// Check the adjacency table for `self -> to`
    pub fn can_transition_to(&self, to: ElectionState) -> bool {
        self.successors().contains(&to)
    }

    /// Whether moving to `to` is the retry path that starts a new attempt
    pub fn is_retry(&self, to: ElectionState) -> bool {
        to == Canvass && *self > Canvass
    }

    /// Whether a leader has been decided by the time a node is in this state
    pub fn is_post_ballot(&self) -> bool {
        matches!(
            self,
            LeaderReplay
                | LeaderTransition
                | LeaderReady
                | FollowerReplay
                | FollowerCatchup
                | FollowerTransition
                | FollowerReady
        )
    }

    /// Whether this is a leader-side state
    pub fn is_leader(&self) -> bool {
        matches!(self, LeaderReplay | LeaderTransition | LeaderReady)
    }
}

impl std::fmt::Display for ElectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Legal transitions written out independently of `successors`
#[cfg(test)]
pub(crate) const EXPECTED_TRANSITIONS: &[(ElectionState, &[ElectionState])] = &[
    (Init, &[Canvass, LeaderReplay, Closed]),
    (Canvass, &[Nominate, FollowerReplay, Closed]),
    (Nominate, &[CandidateBallot, FollowerBallot, Canvass, Closed]),
    (CandidateBallot, &[LeaderReplay, FollowerBallot, Canvass, Closed]),
    (FollowerBallot, &[FollowerReplay, Canvass, Closed]),
    (LeaderReplay, &[LeaderTransition, Canvass, Closed]),
    (LeaderTransition, &[LeaderReady, Canvass, Closed]),
    (LeaderReady, &[Closed]),
    (FollowerReplay, &[FollowerCatchup, FollowerTransition, Canvass, Closed]),
    (FollowerCatchup, &[FollowerTransition, Canvass, Closed]),
    (FollowerTransition, &[FollowerReady, Canvass, Closed]),
    (FollowerReady, &[Closed]),
    (Closed, &[]),
];
