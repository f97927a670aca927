//! Listener handles for EventFlow.
//!
//! A [`Listener<E>`] is a cheaply cloneable handle around a callback for event
//! `E`. Its identity is the identity of the shared allocation: two clones of
//! the same handle are the same listener, two handles built from the same
//! closure code are not. The broker uses this identity for duplicate
//! suppression and for `off`.
//!
//! # Listener Return Values
//!
//! Callbacks may return `()` or `Result<(), E>` for any `E: Into<BoxError>`.
//! A returned `Err` is routed to the listener slot of the error policy.
//!
//! ```rust,ignore
//! broker.on(UserLogin, |user: &User| println!("hello {}", user.name));
//!
//! broker.on(UserLogin, |user: &User| -> Result<(), BoxError> {
//!     audit_log(user)?;
//!     Ok(())
//! });
//! ```

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::foundation::{BoxError, Event, EventEnvelope, EventFlowError};

// ============================================================================
// ListenerOutcome
// ============================================================================

/// Types a listener callback may return.
pub trait ListenerOutcome {
    /// Converts the return value into a dispatch result.
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl ListenerOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> ListenerOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Listener
// ============================================================================

type Callback<P> = dyn Fn(&P) -> Result<(), BoxError> + Send + Sync;

/// Shared state behind a [`Listener`] handle.
pub(crate) struct ListenerInner<E: Event> {
    callback: Box<Callback<E::Payload>>,
    _event: PhantomData<fn() -> E>,
}

/// A listener for event `E`.
pub struct Listener<E: Event> {
    inner: Arc<ListenerInner<E>>,
}

impl<E: Event> Listener<E> {
    /// Creates a listener from a callback.
    pub fn new<F, R>(callback: F) -> Self
    where
        F: Fn(&E::Payload) -> R + Send + Sync + 'static,
        R: ListenerOutcome,
    {
        Self {
            inner: Arc::new(ListenerInner {
                callback: Box::new(move |payload| callback(payload).into_outcome()),
                _event: PhantomData,
            }),
        }
    }

    /// Invokes the callback directly, bypassing any broker.
    pub fn call(&self, payload: &E::Payload) -> Result<(), BoxError> {
        (self.inner.callback)(payload)
    }

    /// Returns `true` if both handles refer to the same listener.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the type-erased form stored in the broker registry.
    pub(crate) fn erase(&self) -> Arc<dyn ErasedListener> {
        self.inner.clone()
    }
}

impl<E: Event> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Event> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("event", &E::NAME)
            .field("id", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

// ============================================================================
// IntoListener
// ============================================================================

/// Conversion into a [`Listener`].
///
/// Implemented for existing handles (identity preserved) and for closures
/// (a fresh identity per call). `Marker` only keeps the two impls apart.
pub trait IntoListener<E: Event, Marker>: Sized {
    /// Performs the conversion.
    fn into_listener(self) -> Listener<E>;
}

impl<E: Event> IntoListener<E, ()> for Listener<E> {
    fn into_listener(self) -> Listener<E> {
        self
    }
}

impl<E, F, R> IntoListener<E, (R,)> for F
where
    E: Event,
    F: Fn(&E::Payload) -> R + Send + Sync + 'static,
    R: ListenerOutcome,
{
    fn into_listener(self) -> Listener<E> {
        Listener::new(self)
    }
}

// ============================================================================
// Type-erased listener
// ============================================================================

/// Object-safe listener as stored in the broker registry.
pub(crate) trait ErasedListener: Send + Sync {
    /// Invokes the listener with the payload carried by `envelope`.
    fn call(&self, envelope: &EventEnvelope) -> Result<(), BoxError>;
}

impl<E: Event> ErasedListener for ListenerInner<E> {
    fn call(&self, envelope: &EventEnvelope) -> Result<(), BoxError> {
        let payload =
            envelope
                .payload_as::<E::Payload>()
                .ok_or(EventFlowError::PayloadMismatch {
                    event: E::NAME,
                    expected: type_name::<E::Payload>(),
                })?;
        (self.callback)(payload)
    }
}

/// Returns `true` if both trait objects share an allocation.
pub(crate) fn same_listener(a: &Arc<dyn ErasedListener>, b: &Arc<dyn ErasedListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
