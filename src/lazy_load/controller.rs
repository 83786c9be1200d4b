//! Repeating trigger loop
//!
//! Runs [`SyntheticActivityTrigger::fire`] on a fixed cadence, optionally for
//! a bounded number of steps. `Idle` and `Stopped` are the same state.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::trigger::SyntheticActivityTrigger;

struct RunningLoop {
    token: CancellationToken,
    task: JoinHandle<()>,
}

pub struct TriggerLoopController {
    trigger: Arc<SyntheticActivityTrigger>,
    active: Arc<AtomicBool>,
    steps: Arc<AtomicU64>,
    running: Mutex<Option<RunningLoop>>,
}

impl TriggerLoopController {
    pub fn new(trigger: Arc<SyntheticActivityTrigger>) -> Self {
        Self {
            trigger,
            active: Arc::new(AtomicBool::new(false)),
            steps: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    pub fn trigger(&self) -> &Arc<SyntheticActivityTrigger> {
        &self.trigger
    }

    /// Start firing on the configured interval. No-op while running.
    pub fn start(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.trigger.config().clone();
        let interval = config.interval();
        match config.max_steps() {
            Some(max) => info!(
                "Starting lazy-load trigger every {}ms, up to {} times",
                interval.as_millis(),
                max
            ),
            None => info!(
                "Starting lazy-load trigger every {}ms until stopped",
                interval.as_millis()
            ),
        }

        self.steps.store(0, Ordering::SeqCst);
        let token = CancellationToken::new();
        let trigger = self.trigger.clone();
        let active = self.active.clone();
        let steps = self.steps.clone();
        let loop_token = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let step = steps.fetch_add(1, Ordering::SeqCst) + 1;
                match config.max_steps() {
                    Some(max) => debug!("Trigger cycle {}/{}", step, max),
                    None => debug!("Trigger cycle {}", step),
                }
                trigger.fire().await;

                if config.max_steps().is_some_and(|max| step >= max) {
                    info!("Lazy-load trigger reached {} cycles, stopping", step);
                    break;
                }
            }

            if !loop_token.is_cancelled() {
                active.store(false, Ordering::SeqCst);
            }
        });

        let mut running = self.running.lock();
        if let Some(previous) = running.replace(RunningLoop { token, task }) {
            previous.token.cancel();
        }
    }

    /// Stop the loop and clear the step counter. Idempotent. A cycle already
    /// in progress finishes, including its pending scroll restore.
    pub fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.token.cancel();
            drop(running.task);
            info!("Lazy-load trigger stopped");
        }
        self.steps.store(0, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Cycles fired since the last start
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }
}

impl Drop for TriggerLoopController {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.token.cancel();
        }
    }
}
