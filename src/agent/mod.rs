//! Consensus Agent
//!
//! Duty-cycle driven agents and the runner that schedules them.

mod runner;
mod consensus;

pub use runner::AgentRunner;
pub use consensus::ConsensusAgent;

use crate::error::Result;

/// A unit of work polled on every duty cycle
pub trait Agent: Send {
    /// Name used in logs
    fn role_name(&self) -> &str;

    /// Run one duty cycle, returning the amount of work done
    fn do_work(&mut self, now_ms: i64) -> Result<usize>;

    /// Called once when the runner stops
    fn on_close(&mut self, _now_ms: i64) -> Result<()> {
        Ok(())
    }
}

/// Wall-clock time in milliseconds since the Unix epoch
pub fn epoch_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
