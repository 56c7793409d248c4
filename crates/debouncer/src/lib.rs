//! Ticking debouncer
//!
//! This crate coalesces bursts of trigger calls into at most one callback
//! invocation per fixed interval:
//! - Lock-free trigger flag (atomic store / compare-and-swap)
//! - Background loop on a dedicated thread, or on a tokio runtime
//! - Explicit lifecycle errors instead of leaked or deadlocked loops
//! - TOML-configurable interval and loop thread name
//!
//! Unlike a trailing-edge debounce, triggers never push the deadline back:
//! the callback fires on the first tick boundary after a trigger.

pub mod async_debounce;
pub mod config;
pub mod debounce;
pub mod error;
pub mod state;

// Re-exports
pub use async_debounce::AsyncDebouncer;
pub use config::DebounceConfig;
pub use debounce::Debouncer;
pub use error::DebounceError;
pub use state::{FlagState, TriggerHandle};

/// Result type for debouncer operations
pub type Result<T> = std::result::Result<T, DebounceError>;
