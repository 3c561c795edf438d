//! WolfConsensus - Cluster Consensus Core
//!
//! The election and session admission core of a Raft-style replicated
//! cluster. A node runs one election at a time, publishes an immutable
//! record when a leader is decided, and admits client sessions through a
//! challenge/response handshake once it is the ready leader.
//!
//! # Architecture
//!
//! An [`election::ElectionStateMachine`] walks a fixed transition table and
//! records every state it enters. Concluded elections publish a
//! [`term::LeadershipTerm`] through [`term::CurrentLeadership`], which is
//! the only source of the leader identity attached to session events.
//! Client sessions live in a [`session::SessionTable`] and are driven by a
//! pluggable [`session::Authenticator`].
//!
//! # Features
//!
//! - Validated election transitions with a timestamped trail
//! - Bounded retries back to canvassing
//! - Binary audit trail of election events with CRC-checked frames
//! - Challenge/response session authentication with retried egress
//! - Interval-driven agent runner with graceful shutdown

pub mod config;
pub mod error;
pub mod election;
pub mod term;
pub mod audit;
pub mod session;
pub mod agent;

pub use config::ConsensusConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ConsensusConfig;
    pub use crate::error::{Error, Result};
    pub use crate::election::{ElectionObserver, ElectionState, ElectionStateMachine, StateChange};
    pub use crate::term::{CurrentLeadership, LeadershipTerm};
    pub use crate::audit::{AuditLog, AuditReader};
    pub use crate::session::{Authenticator, EgressPublisher, LeaderContext, SessionProxy, SessionTable};
    pub use crate::agent::{Agent, AgentRunner, ConsensusAgent};
}
