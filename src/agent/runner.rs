//! Agent Runner
//!
//! Drives an agent's duty cycle on a fixed interval until shutdown.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::Result;
use super::{epoch_clock_ms, Agent};

/// Runs one agent on the current task
pub struct AgentRunner {
    /// Time between duty cycles
    interval: Duration,
    /// Wall clock in milliseconds
    clock: fn() -> i64,
}

impl AgentRunner {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            clock: epoch_clock_ms,
        }
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Run duty cycles until `shutdown` flips to true or its sender is dropped,
    /// then close the agent. Returns the number of duty cycles run.
    ///
    /// Errors from a duty cycle are logged and the next cycle runs as usual;
    /// only an error from closing the agent is returned.
    pub async fn run<A: Agent>(&self, agent: &mut A, mut shutdown: watch::Receiver<bool>) -> Result<u64> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = 0u64;

        tracing::info!("Agent {} started", agent.role_name());

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    cycles += 1;
                    match agent.do_work((self.clock)()) {
                        Ok(work) if work > 0 => {
                            tracing::trace!("Agent {} did {} units of work", agent.role_name(), work);
                        }
                        Ok(_) => {}
                        Err(e) if e.is_retryable() => {
                            tracing::debug!("Agent {} duty cycle will retry: {}", agent.role_name(), e);
                        }
                        Err(e) => {
                            tracing::warn!("Agent {} duty cycle failed: {}", agent.role_name(), e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        agent.on_close((self.clock)())?;
        tracing::info!("Agent {} stopped after {} cycles", agent.role_name(), cycles);
        Ok(cycles)
    }
}
