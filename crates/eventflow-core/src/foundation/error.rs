//! Error types for EventFlow.
//!
//! Dispatch failures are classified by where they happened ([`ErrorKind`]) and
//! carried as a [`DispatchError`]. Misuse at the string boundary (policy names,
//! error-type tags) is reported through [`EventFlowError`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A type-erased error returned by listeners and middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Error Kind
// =============================================================================

/// The stage of dispatch an error originated from.
///
/// Each kind maps to one slot of the [`ErrorPolicy`](super::policy::ErrorPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Returned by a listener callback.
    Listener,
    /// Escaped every inner guard of an emission.
    Emit,
    /// Returned by a middleware layer.
    Middleware,
}

impl ErrorKind {
    /// Returns the tag used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listener => "listener",
            Self::Emit => "emit",
            Self::Middleware => "middleware",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = EventFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listener" => Ok(Self::Listener),
            "emit" => Ok(Self::Emit),
            "middleware" => Ok(Self::Middleware),
            other => Err(EventFlowError::InvalidErrorType(other.to_string())),
        }
    }
}

// =============================================================================
// Dispatch Error
// =============================================================================

/// A failure raised while dispatching one event.
#[derive(Debug, Error)]
#[error("{kind} error in event '{event}': {source}")]
pub struct DispatchError {
    kind: ErrorKind,
    event: &'static str,
    source: BoxError,
}

impl DispatchError {
    /// Creates a dispatch error for `event`.
    pub fn new(kind: ErrorKind, event: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            event,
            source: source.into(),
        }
    }

    /// Returns the stage the error originated from.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the name of the event being dispatched.
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Returns the underlying error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.source
    }

    /// Consumes the error, returning the underlying error.
    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

// =============================================================================
// EventFlow Error
// =============================================================================

/// Errors raised by EventFlow itself rather than by user callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventFlowError {
    /// An error-type tag outside `listener`, `emit` and `middleware`.
    #[error("invalid error type: '{0}'")]
    InvalidErrorType(String),

    /// A policy name outside `continue` and `stop`.
    #[error("invalid error policy '{0}': expected 'continue' or 'stop'")]
    InvalidPolicy(String),

    /// The payload in flight is not the type the listener expects.
    ///
    /// Happens when a middleware replaces the payload with another type.
    #[error("payload type mismatch in event '{event}': expected '{expected}'")]
    PayloadMismatch {
        /// The event being dispatched.
        event: &'static str,
        /// The payload type the listener was registered for.
        expected: &'static str,
    },
}

/// Result type for dispatch operations.
pub type DispatchResult<T = ()> = Result<T, DispatchError>;
