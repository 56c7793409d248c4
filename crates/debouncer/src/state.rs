//! Lock-free trigger state shared between callers and the background loop
//!
//! The flag is the only state both sides mutate. Callers store `Triggered`;
//! the loop claims it back to `Idle` with a compare-and-swap and, only when
//! that succeeds, runs the callback.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Callback invoked by the background loop
pub(crate) type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

const IDLE: u8 = 0;
const TRIGGERED: u8 = 1;

/// Observable value of the trigger flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagState {
    /// No trigger since the last fired tick
    Idle,
    /// At least one trigger is waiting for the next tick
    Triggered,
}

/// Atomic two-valued flag
#[derive(Debug)]
pub(crate) struct TriggerFlag(AtomicU8);

impl TriggerFlag {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// Mark the flag triggered. Idempotent.
    #[inline]
    pub(crate) fn set(&self) {
        self.0.store(TRIGGERED, Ordering::Release);
    }

    /// Try to move `Triggered -> Idle`.
    ///
    /// Returns true if this call cleared a pending trigger. The acquire half
    /// makes every write before the cleared triggers visible to the caller.
    #[inline]
    pub(crate) fn claim(&self) -> bool {
        self.0
            .compare_exchange(TRIGGERED, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn state(&self) -> FlagState {
        match self.0.load(Ordering::Acquire) {
            TRIGGERED => FlagState::Triggered,
            _ => FlagState::Idle,
        }
    }
}

/// State shared by a controller, its trigger handles and its loop
pub(crate) struct Shared {
    flag: TriggerFlag,
    invocations: AtomicU64,
    callback: Callback,
}

impl Shared {
    pub(crate) fn new(callback: Callback) -> Self {
        Self {
            flag: TriggerFlag::new(),
            invocations: AtomicU64::new(0),
            callback,
        }
    }

    #[inline]
    pub(crate) fn trigger(&self) {
        self.flag.set();
    }

    pub(crate) fn flag_state(&self) -> FlagState {
        self.flag.state()
    }

    pub(crate) fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Acquire)
    }

    /// Tick handler run by the background loop.
    ///
    /// Returns true if the callback was invoked. A panicking callback
    /// unwinds through here and ends the loop.
    pub(crate) fn on_tick(&self) -> bool {
        if !self.flag.claim() {
            return false;
        }

        self.invocations.fetch_add(1, Ordering::AcqRel);
        (self.callback)();
        true
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("flag", &self.flag.state())
            .field("invocations", &self.invocations())
            .finish_non_exhaustive()
    }
}

/// Cloneable handle that can only trigger its debouncer
///
/// Hand these to producer threads or tasks instead of sharing the
/// controller itself. Triggering through a handle after the controller has
/// been stopped or dropped is a no-op.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    shared: Arc<Shared>,
}

impl TriggerHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Request a callback invocation at the next tick
    #[inline]
    pub fn trigger(&self) {
        self.shared.trigger();
    }

    /// Current value of the trigger flag
    pub fn state(&self) -> FlagState {
        self.shared.flag_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn counting() -> (Arc<AtomicUsize>, Shared) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let shared = Shared::new(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        (calls, shared)
    }

    #[test]
    fn test_flag_starts_idle() {
        let flag = TriggerFlag::new();
        assert_eq!(flag.state(), FlagState::Idle);
        assert!(!flag.claim());
    }

    #[test]
    fn test_claim_clears_exactly_once() {
        let flag = TriggerFlag::new();
        flag.set();
        flag.set();
        flag.set();
        assert_eq!(flag.state(), FlagState::Triggered);

        assert!(flag.claim());
        assert!(!flag.claim());
        assert_eq!(flag.state(), FlagState::Idle);
    }

    #[test]
    fn test_tick_without_trigger_is_noop() {
        let (calls, shared) = counting();
        assert!(!shared.on_tick());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(shared.invocations(), 0);
    }

    #[test]
    fn test_many_triggers_one_invocation() {
        let (calls, shared) = counting();
        for _ in 0..100 {
            shared.trigger();
        }

        assert!(shared.on_tick());
        assert!(!shared.on_tick());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(shared.invocations(), 1);
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let (calls, shared) = counting();
        let shared = Arc::new(shared);
        shared.trigger();

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.on_tick())
            })
            .collect();

        let winners = workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .filter(|&fired| fired)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_triggers_shared_flag() {
        let (_calls, shared) = counting();
        let handle = TriggerHandle::new(Arc::new(shared));
        let other = handle.clone();

        assert_eq!(handle.state(), FlagState::Idle);
        other.trigger();
        assert_eq!(handle.state(), FlagState::Triggered);
    }
}
