//! Current Leadership
//!
//! Process-wide holder of the most recently published leadership term.

use std::sync::Arc;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::session::LeaderContext;
use super::LeadershipTerm;

/// Latest leadership term, shared between the election and its readers.
///
/// Publishing swaps one `Arc` so readers see either the previous record or
/// the new one, never a mix.
#[derive(Debug, Default)]
pub struct CurrentLeadership {
    term: RwLock<Option<Arc<LeadershipTerm>>>,
}

impl CurrentLeadership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede the current record.
    ///
    /// The new record must carry a strictly higher leadership term id.
    pub fn publish(&self, term: LeadershipTerm) -> Result<Arc<LeadershipTerm>> {
        let mut slot = self.term.write();

        if let Some(current) = slot.as_ref() {
            if term.leadership_term_id() <= current.leadership_term_id() {
                return Err(Error::StaleLeadershipTerm {
                    current: current.leadership_term_id(),
                    proposed: term.leadership_term_id(),
                });
            }
        }

        let term = Arc::new(term);
        *slot = Some(Arc::clone(&term));
        Ok(term)
    }

    /// Latest published record, if any
    pub fn latest(&self) -> Option<Arc<LeadershipTerm>> {
        self.term.read().clone()
    }

    /// Current term id, if a leader has been published
    pub fn leadership_term_id(&self) -> Option<i64> {
        self.term.read().as_ref().map(|t| t.leadership_term_id())
    }

    /// Context for tagging session events with the current leader
    pub fn leader_context(&self) -> Option<LeaderContext> {
        self.term.read().as_deref().map(LeaderContext::from)
    }
}
