//! Consensus Audit Trail
//!
//! Binary encoding of election state changes and leadership term changes,
//! and a checksummed log of those events for replay and inspection.

pub mod encoder;
mod trail;

pub use encoder::{
    decode_election_state_change, decode_leadership_term_change, encode_election_state_change,
    encode_leadership_term, encode_leadership_term_change, ElectionStateChangeEvent,
    LeadershipTermChangeEvent, LEADERSHIP_TERM_CHANGE_LENGTH,
};
pub use trail::{AuditEvent, AuditFrameHeader, AuditLog, AuditReader, ClusterEventCode, FORMAT_VERSION};
