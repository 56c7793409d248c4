//! Tokio-backed ticking debouncer
//!
//! Same contract as [`Debouncer`](crate::Debouncer), but the loop is a task
//! on the ambient tokio runtime and `stop` is awaited instead of blocking a
//! thread.

use crate::config::check_interval;
use crate::state::{FlagState, Shared, TriggerHandle};
use crate::{DebounceError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Ticking debouncer driven by a tokio task
///
/// The callback runs inline on the loop task, so it should not block for
/// long. Triggers are synchronous and can come from any thread or task.
pub struct AsyncDebouncer {
    /// Tick interval
    interval: Duration,

    shared: Arc<Shared>,

    running: Mutex<Option<AsyncRunning>>,
}

struct AsyncRunning {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl AsyncDebouncer {
    /// Create a dormant debouncer
    pub fn new<F>(interval: Duration, callback: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        check_interval(interval)?;

        Ok(Self {
            interval,
            shared: Arc::new(Shared::new(Arc::new(callback))),
            running: Mutex::new(None),
        })
    }

    /// Spawn the loop on the current tokio runtime
    ///
    /// Must be called from within a runtime, otherwise
    /// [`DebounceError::NoRuntime`] is returned.
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(DebounceError::AlreadyStarted);
        }

        let runtime = Handle::try_current().map_err(|_| DebounceError::NoRuntime)?;
        let (stop_tx, stop_rx) = oneshot::channel();
        let first_tick = Instant::now() + self.interval;
        let handle = runtime.spawn(run_loop(
            self.shared.clone(),
            first_tick,
            self.interval,
            stop_rx,
        ));

        debug!("Started async debouncer (interval: {:?})", self.interval);

        *running = Some(AsyncRunning { stop_tx, handle });
        Ok(())
    }

    /// Request a callback invocation at the next tick
    #[inline]
    pub fn trigger(&self) {
        self.shared.trigger();
    }

    /// Stop the loop and wait for the task to finish
    pub async fn stop(&self) -> Result<()> {
        let running = self.running.lock().take().ok_or(DebounceError::NotStarted)?;

        // Fails only if the task already finished
        let _ = running.stop_tx.send(());

        match running.handle.await {
            Ok(()) => {
                debug!("Stopped async debouncer");
                Ok(())
            }
            Err(e) if e.is_panic() => {
                warn!("Async debouncer loop terminated by a panicking callback");
                Err(DebounceError::CallbackPanicked)
            }
            Err(_) => Err(DebounceError::LoopAborted),
        }
    }

    /// Whether the loop task is alive
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Number of callback invocations started so far
    pub fn invocations(&self) -> u64 {
        self.shared.invocations()
    }

    /// Current value of the trigger flag
    pub fn state(&self) -> FlagState {
        self.shared.flag_state()
    }

    /// Handle that can trigger this debouncer from anywhere
    pub fn trigger_handle(&self) -> TriggerHandle {
        TriggerHandle::new(self.shared.clone())
    }

    /// Configured tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for AsyncDebouncer {
    fn drop(&mut self) {
        // Dropping the sender resolves the loop's stop receiver
        if let Some(running) = self.running.get_mut().take() {
            drop(running.stop_tx);
        }
    }
}

impl std::fmt::Debug for AsyncDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDebouncer")
            .field("interval", &self.interval)
            .field("shared", &self.shared)
            .field("running", &self.running.lock().is_some())
            .finish()
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    first_tick: Instant,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                if shared.on_tick() {
                    trace!("Debounced callback fired");
                }
            }
        }
    }
}
