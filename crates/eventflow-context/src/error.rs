//! Context error types.

use thiserror::Error;

/// Errors raised when resolving a broker from a [`Scope`](crate::Scope).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No ancestor scope provides a broker for the requested event map.
    #[error("useEventBroker must be used within an EventBrokerProvider")]
    MissingProvider {
        /// Type name of the event map that was requested.
        map: &'static str,
    },
}

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;
