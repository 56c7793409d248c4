//! Error types for debouncer lifecycle operations

use thiserror::Error;

/// Errors returned by [`Debouncer`](crate::Debouncer) and
/// [`AsyncDebouncer`](crate::AsyncDebouncer)
#[derive(Debug, Error)]
pub enum DebounceError {
    /// Construction argument out of range (e.g. a zero interval)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `start` called while a loop from a previous `start` is still owned
    #[error("debouncer already started")]
    AlreadyStarted,

    /// `stop` called without a running loop
    #[error("debouncer not started")]
    NotStarted,

    /// The callback panicked and took the background loop down with it
    #[error("debounce callback panicked; background loop terminated")]
    CallbackPanicked,

    /// The background loop was cancelled by its runtime before `stop`
    #[error("background loop aborted before stop")]
    LoopAborted,

    /// `AsyncDebouncer::start` called outside a tokio runtime
    #[error("no tokio runtime available to spawn the background loop")]
    NoRuntime,

    /// Spawning the loop thread failed
    #[error("failed to spawn debounce thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Malformed TOML configuration
    #[error("invalid debouncer config: {0}")]
    Config(#[from] toml::de::Error),
}
