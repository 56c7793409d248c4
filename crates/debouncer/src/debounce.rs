//! Thread-backed ticking debouncer
//!
//! The background loop runs on its own OS thread and multiplexes two
//! crossbeam channels: a ticker and a zero-capacity stop channel. Sending on
//! the stop channel is a rendezvous with the loop, so `stop` cannot return
//! before the loop has taken the signal.

use crate::config::{check_interval, DebounceConfig};
use crate::state::{Callback, FlagState, Shared, TriggerHandle};
use crate::{DebounceError, Result};
use crossbeam_channel::{select_biased, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Ticking debouncer
///
/// Every call to [`trigger`](Self::trigger) between two ticks collapses into
/// a single callback invocation on the following tick. Ticks without a
/// pending trigger do nothing.
///
/// All methods take `&self`, so the controller can be shared behind an
/// `Arc`, or producers can be given a [`TriggerHandle`] instead.
pub struct Debouncer {
    /// Tick interval
    interval: Duration,

    /// Name given to the loop thread
    thread_name: String,

    /// Flag, counters and callback shared with the loop
    shared: Arc<Shared>,

    /// Loop started by `start`, if any
    running: Mutex<Option<Running>>,
}

/// A started background loop
struct Running {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Running {
    fn on_loop_thread(&self) -> bool {
        thread::current().id() == self.handle.thread().id()
    }
}

impl Debouncer {
    /// Create a dormant debouncer
    ///
    /// Nothing runs until [`start`](Self::start). A zero interval is
    /// rejected with [`DebounceError::InvalidArgument`].
    pub fn new<F>(interval: Duration, callback: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let config = DebounceConfig::default();
        Self::build(interval, config.thread_name, Arc::new(callback))
    }

    /// Create a dormant debouncer from configuration
    pub fn from_config<F>(config: &DebounceConfig, callback: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        config.validate()?;
        Self::build(config.interval(), config.thread_name.clone(), Arc::new(callback))
    }

    fn build(interval: Duration, thread_name: String, callback: Callback) -> Result<Self> {
        check_interval(interval)?;

        Ok(Self {
            interval,
            thread_name,
            shared: Arc::new(Shared::new(callback)),
            running: Mutex::new(None),
        })
    }

    /// Start ticking and spawn the background loop
    ///
    /// The first tick happens one full interval after this call. Returns
    /// [`DebounceError::AlreadyStarted`] if a previous loop has not been
    /// stopped, even if that loop has since died from a panicking callback.
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(DebounceError::AlreadyStarted);
        }

        let ticker = crossbeam_channel::tick(self.interval);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);
        let shared = self.shared.clone();

        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run_loop(&shared, &ticker, &stop_rx))?;

        debug!(
            "Started debouncer '{}' (interval: {:?})",
            self.thread_name, self.interval
        );

        *running = Some(Running { stop_tx, handle });
        Ok(())
    }

    /// Request a callback invocation at the next tick
    ///
    /// Never blocks. Safe before `start` and after `stop`, where it only
    /// sets the flag.
    #[inline]
    pub fn trigger(&self) {
        self.shared.trigger();
    }

    /// Stop the background loop and wait for it to exit
    ///
    /// A callback already running is allowed to finish first. Once this
    /// returns no further invocations happen. Returns
    /// [`DebounceError::NotStarted`] if there is no loop to stop and
    /// [`DebounceError::CallbackPanicked`] if the loop died from a panic;
    /// either way the debouncer is dormant afterwards and may be restarted.
    ///
    /// Called from inside the callback, the stop channel is disconnected
    /// instead and the loop exits as soon as the callback returns.
    ///
    /// Only one of several racing `stop` calls takes the loop. The others
    /// return [`DebounceError::NotStarted`] immediately, possibly while the
    /// winner is still waiting for an in-flight callback to finish.
    pub fn stop(&self) -> Result<()> {
        let running = self.running.lock().take().ok_or(DebounceError::NotStarted)?;

        if running.on_loop_thread() {
            debug!("Debouncer '{}' stopped from its callback", self.thread_name);
            drop(running.stop_tx);
            return Ok(());
        }

        // Only fails if the loop is already gone
        if running.stop_tx.send(()).is_err() {
            trace!("Debouncer '{}' loop exited before stop", self.thread_name);
        }

        match running.handle.join() {
            Ok(()) => {
                debug!("Stopped debouncer '{}'", self.thread_name);
                Ok(())
            }
            Err(_) => {
                warn!(
                    "Debouncer '{}' loop terminated by a panicking callback",
                    self.thread_name
                );
                Err(DebounceError::CallbackPanicked)
            }
        }
    }

    /// Whether a background loop is alive
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

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            // Disconnecting the stop channel ends the loop
            let on_loop_thread = running.on_loop_thread();
            drop(running.stop_tx);
            if !on_loop_thread && running.handle.join().is_err() {
                warn!("Debouncer '{}' loop had panicked", self.thread_name);
            }
        }
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("interval", &self.interval)
            .field("thread_name", &self.thread_name)
            .field("shared", &self.shared)
            .field("running", &self.running.lock().is_some())
            .finish()
    }
}

/// Background loop: one event per iteration, tick or stop
///
/// Stop is polled first, so a stop issued while the callback ran wins over
/// a tick that came due in the meantime.
fn run_loop(shared: &Shared, ticker: &Receiver<Instant>, stop_rx: &Receiver<()>) {
    loop {
        select_biased! {
            // A message or a disconnected sender both mean stop
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                if shared.on_tick() {
                    trace!("Debounced callback fired");
                }
            }
        }
    }
}
