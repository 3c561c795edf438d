//! Leadership Terms
//!
//! The handoff record produced by a successful election and the shared
//! holder that readers consult for the current leader.

mod record;
mod current;

pub use record::LeadershipTerm;
pub use current::CurrentLeadership;
