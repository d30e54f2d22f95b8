//! Error types for key capture sessions.
//!
//! Only lifecycle and configuration operations return these. Queue reads
//! report `Empty`/`Overflow` as values, never as errors.

use thiserror::Error;

/// Result type alias for keyqueue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or driving a capture session.
#[derive(Debug, Error)]
pub enum Error {
    /// The event source already has a subscriber.
    #[error("event source is already subscribed")]
    AlreadyRunning,

    /// The event source has no subscriber to remove.
    #[error("event source is not subscribed")]
    NotRunning,

    /// A blocking wait was requested with nothing buffered and capture stopped.
    #[error("capture is not registered and no events are buffered")]
    NotRegistered,

    /// The capture configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The event source refused the subscription.
    #[error("failed to subscribe to event source: {0}")]
    SubscribeFailed(String),

    /// The event source failed to drop the subscription.
    #[error("failed to unsubscribe from event source: {0}")]
    UnsubscribeFailed(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),
}
