//! Countdown timer.
//!
//! A [`Countdown`] is a cancellable periodic task that sends one [`Tick`] per
//! period into the engine's channel. Stopping is idempotent and also happens
//! on drop, so a countdown never outlives the `InProgress` stretch that
//! armed it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// One elapsed period, tagged with the generation of the countdown that
/// produced it so stale ticks from a stopped countdown can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// A running periodic tick task.
#[derive(Debug)]
pub struct Countdown {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    /// Start ticking every `period`. The first tick arrives one full period
    /// after the start.
    pub fn start(generation: u64, period: Duration, ticks: mpsc::Sender<Tick>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(Tick { generation }).await.is_err() {
                    break;
                }
            }
        });
        tracing::debug!(generation, period_ms = period.as_millis() as u64, "countdown started");
        Self {
            generation,
            handle: Some(handle),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(generation = self.generation, "countdown stopped");
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}
