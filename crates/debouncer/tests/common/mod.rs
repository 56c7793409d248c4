//! Common utilities for integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Install a test-friendly subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Shared invocation counter handed to debounced callbacks
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn callback(&self) -> impl Fn() + Send + Sync + 'static {
        let inner = self.0.clone();
        move || {
            inner.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
