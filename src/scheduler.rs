//! Runs the poll cycle forever on a fixed interval.
//!
//! Each cycle runs on tokio's blocking pool, so a panic inside it surfaces
//! as a [`JoinError`](tokio::task::JoinError) instead of unwinding through
//! the loop.  Errors and panics are both logged and followed by the
//! cooldown sleep; only the shutdown future ends the loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::poll::{CycleReport, PollCycle};

/// A unit of periodic work.
pub trait Cycle: Send + Sync + 'static {
    fn run(&self) -> Result<CycleReport>;
}

impl Cycle for PollCycle {
    fn run(&self) -> Result<CycleReport> {
        self.run_once()
    }
}

pub struct Scheduler<C> {
    cycle: Arc<C>,
    interval: Duration,
    cooldown: Duration,
}

impl<C: Cycle> Scheduler<C> {
    pub fn new(cycle: C, interval: Duration, cooldown: Duration) -> Self {
        Self {
            cycle: Arc::new(cycle),
            interval,
            cooldown,
        }
    }

    pub fn from_config(cycle: C, config: &Config) -> Self {
        Self::new(cycle, config.poll_interval(), config.cooldown())
    }

    /// Loop until `shutdown` resolves.
    ///
    /// Shutdown is honoured immediately, including while a cycle is still
    /// running; that cycle is abandoned and its additions are not saved.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let cycle = Arc::clone(&self.cycle);
            let task = tokio::task::spawn_blocking(move || cycle.run());

            let pause = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("interrupted during cycle, stopping");
                    return;
                }
                joined = task => match joined {
                    Ok(Ok(report)) => {
                        tracing::debug!(?report, "cycle finished");
                        self.interval
                    }
                    Ok(Err(e)) => {
                        tracing::error!(error = %format!("{e:#}"), "unexpected error during cycle");
                        self.cooldown
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "cycle panicked");
                        self.cooldown
                    }
                },
            };

            match next_check(pause) {
                Some(next) => tracing::info!(
                    sleep_secs = pause.as_secs(),
                    next_check = %next,
                    "sleeping until next check"
                ),
                None => tracing::info!(sleep_secs = pause.as_secs(), "sleeping until next check"),
            }

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("stopped by interrupt");
                    return;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

/// Wall-clock time after `pause`, or `None` if it is past chrono's range.
fn next_check(pause: Duration) -> Option<String> {
    let pause = chrono::Duration::from_std(pause).ok()?;
    let next = chrono::Local::now().checked_add_signed(pause)?;
    Some(next.format("%H:%M:%S").to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
