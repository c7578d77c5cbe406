//! Watcher lifecycle: start, stop and status over the poll loop.

use crate::interval::IntervalResolver;
use crate::poll_loop::{PollLoop, WatchContext};
use crate::types::{Schedule, WatcherStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Lifecycle misuse reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WatcherError {
    #[error("Watcher is already running")]
    AlreadyRunning,

    #[error("Watcher is not running")]
    NotRunning,
}

/// Handles for the current worker task
struct Worker {
    cancel: CancellationToken,
    schedule: watch::Receiver<Option<Schedule>>,
    task: JoinHandle<()>,
}

/// Controls a single background poll loop
///
/// `stop()` returns immediately; the worker exits at its next checkpoint,
/// which is at most one in-flight fetch away. A `start()` issued before that
/// queues the new run behind the old worker, so at most one poll loop is ever
/// fetching. Price history belongs to the worker, so a restart begins with an
/// empty history.
pub struct PriceWatcher {
    context: WatchContext,
    running: AtomicBool,
    worker: Mutex<Option<Worker>>,
    resolver_seed: Option<u64>,
}

impl PriceWatcher {
    /// Create a stopped watcher
    pub fn new(context: WatchContext) -> Self {
        Self {
            context,
            running: AtomicBool::new(false),
            worker: Mutex::new(None),
            resolver_seed: None,
        }
    }

    /// Seed the interval randomness of every run
    pub fn with_resolver_seed(mut self, seed: u64) -> Self {
        self.resolver_seed = Some(seed);
        self
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the poll loop. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), WatcherError> {
        let mut worker = self.lock_worker();
        if self.running.load(Ordering::Acquire) {
            return Err(WatcherError::AlreadyRunning);
        }

        let resolver = match self.resolver_seed {
            Some(seed) => IntervalResolver::seeded(seed),
            None => IntervalResolver::new(),
        };
        let cancel = CancellationToken::new();
        let (schedule_tx, schedule_rx) = watch::channel(None);
        let poll = PollLoop::new(self.context.clone(), resolver, cancel.clone(), schedule_tx);

        // A stopped worker may still be inside a fetch; the new run begins once it has exited.
        let previous = worker.take().map(|w| {
            w.cancel.cancel();
            w.task
        });
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    warn!(error = %e, "Previous watcher task ended abnormally");
                }
            }
            poll.run().await;
        });

        *worker = Some(Worker {
            cancel,
            schedule: schedule_rx,
            task,
        });
        self.running.store(true, Ordering::Release);

        info!("Watcher started");
        Ok(())
    }

    /// Signal the poll loop to exit
    pub fn stop(&self) -> Result<(), WatcherError> {
        let worker = self.lock_worker();
        if !self.running.load(Ordering::Acquire) {
            return Err(WatcherError::NotRunning);
        }

        if let Some(ref w) = *worker {
            w.cancel.cancel();
        }
        self.running.store(false, Ordering::Release);

        info!("Watcher stopped");
        Ok(())
    }

    /// Whether the watcher is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current phase and, once a cycle has scheduled one, the next check
    pub fn status(&self) -> WatcherStatus {
        if !self.is_running() {
            return WatcherStatus::stopped();
        }

        let schedule = self
            .lock_worker()
            .as_ref()
            .and_then(|w| *w.schedule.borrow());
        WatcherStatus::running(schedule)
    }

    /// Stop if running and wait for the worker task to finish
    pub async fn shutdown(&self) {
        let task = {
            let mut worker = self.lock_worker();
            self.running.store(false, Ordering::Release);
            worker.take().map(|w| {
                w.cancel.cancel();
                w.task
            })
        };

        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Watcher task ended abnormally");
            }
        }
    }
}

impl Drop for PriceWatcher {
    fn drop(&mut self) {
        if let Some(ref w) = *self.lock_worker() {
            w.cancel.cancel();
        }
    }
}
