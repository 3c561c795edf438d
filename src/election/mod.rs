//! Leader Election
//!
//! Tracks a node's progress through the election phases. Vote counting and
//! timeouts are driven by the caller; this module owns the observable state.

mod state;
mod machine;

pub use state::ElectionState;
pub use machine::{ElectionConfig, ElectionObserver, ElectionStateMachine, StateChange};
