//! Periodic eviction of expired entries.
//!
//! Lazy eviction on `submit` only touches the key being submitted; keys that
//! are never submitted again would otherwise stay in the table forever. The
//! sweeper bounds that growth with one background task per guard.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::clock::Clock;
use crate::guard::SingleFlight;

/// Default period between full-table sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running sweep task.
///
/// The task holds a weak reference, so it exits on its own once the guard is
/// dropped. Dropping the handle aborts the task.
pub struct Sweeper {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawns the sweep loop on the current tokio runtime.
    pub fn spawn<C>(guard: &Arc<SingleFlight<C>>, every: Duration) -> Self
    where
        C: Clock + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(
            Arc::downgrade(guard),
            every.max(MIN_SWEEP_INTERVAL),
            stop_rx,
        ));
        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Signals the loop to exit and waits for it.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run<C: Clock>(
    guard: Weak<SingleFlight<C>>,
    every: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut tick = tokio::time::interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    tick.tick().await;

    loop {
        tokio::select! {
            _ = &mut stop => {
                debug!("Guard sweeper stopped");
                break;
            }
            _ = tick.tick() => {
                let Some(guard) = guard.upgrade() else {
                    debug!("Guard dropped, sweeper exiting");
                    break;
                };
                let evicted = guard.sweep();
                if evicted > 0 {
                    debug!(evicted, remaining = guard.len(), "Swept expired guard entries");
                }
            }
        }
    }
}
