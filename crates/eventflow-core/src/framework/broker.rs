//! The event broker for EventFlow.
//!
//! This module provides the [`EventBroker`], which owns per-event listener
//! sets, a middleware chain, and an error policy for one [`EventMap`].
//!
//! # Dispatch
//!
//! When an event is emitted:
//!
//! 1. The middleware chain is folded around a terminal stage, first-registered
//!    outermost
//! 2. The terminal stage snapshots the listener set for the event name and
//!    calls each listener in registration order, each under its own guard
//! 3. Failing middleware layers are resolved by the middleware slot
//! 4. Anything escaping (a `Stop` from an inner slot) is resolved exactly once
//!    by the emit slot, which may hand it back to the caller
//!
//! ```rust,ignore
//! use eventflow_core::{EventBroker, ErrorPolicy, PolicyMode};
//!
//! let broker = EventBroker::<AppEvents>::new();
//!
//! let subscription = broker.on(UserLogin, |user: &User| {
//!     println!("welcome back, {}", user.name);
//! });
//!
//! broker.emit(UserLogin, user)?;
//! subscription.unsubscribe();
//! ```
//!
//! # Re-entrancy
//!
//! Registry locks are never held while user code runs. Listeners may emit,
//! subscribe, or unsubscribe on the same broker; changes to a listener set
//! take effect from the next emission of that event.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{Level, debug, span, trace, warn};

use super::listener::{ErasedListener, IntoListener, Listener, same_listener};
use super::middleware::{Middleware, Next, same_middleware};
use super::subscription::{MiddlewareHandle, Subscription};
use crate::foundation::{
    BoxError, DispatchError, DispatchResult, ErrorHandler, ErrorKind, ErrorPolicy, Event,
    EventEnvelope, EventMap,
};

/// Listener count at which a leak warning is logged, unless configured.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

// ============================================================================
// BrokerInner - shared, map-independent state
// ============================================================================

type ListenerSet = Vec<Arc<dyn ErasedListener>>;

/// State shared by every handle to one broker.
pub(crate) struct BrokerInner {
    listeners: RwLock<BTreeMap<&'static str, ListenerSet>>,
    middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
    policy: ErrorPolicy,
    max_listeners: usize,
    fallback_handler: Option<ErrorHandler>,
}

impl BrokerInner {
    fn add_listener(&self, event: &'static str, listener: &Arc<dyn ErasedListener>) {
        let mut listeners = self.listeners.write();
        let set = listeners.entry(event).or_default();

        if self.max_listeners > 0 && set.len() >= self.max_listeners {
            warn!(
                event,
                count = set.len() + 1,
                max_listeners = self.max_listeners,
                "MaxListenersExceeded: possible EventFlow memory leak detected. {} listeners \
                 added for event '{event}'. Raise max_listeners to increase the limit.",
                set.len() + 1
            );
        }

        if set.iter().any(|existing| same_listener(existing, listener)) {
            trace!(event, "Listener already registered");
            return;
        }
        set.push(Arc::clone(listener));
        trace!(event, count = set.len(), "Listener registered");
    }

    pub(crate) fn remove_listener(&self, event: &'static str, listener: *const dyn ErasedListener) {
        let mut listeners = self.listeners.write();
        let Some(set) = listeners.get_mut(event) else {
            return;
        };

        let before = set.len();
        set.retain(|existing| !std::ptr::addr_eq(Arc::as_ptr(existing), listener));
        if set.len() != before {
            trace!(event, count = set.len(), "Listener removed");
        }
        if set.is_empty() {
            listeners.remove(event);
        }
    }

    pub(crate) fn contains_listener(
        &self,
        event: &'static str,
        listener: *const dyn ErasedListener,
    ) -> bool {
        self.listeners.read().get(event).is_some_and(|set| {
            set.iter()
                .any(|existing| std::ptr::addr_eq(Arc::as_ptr(existing), listener))
        })
    }

    pub(crate) fn remove_middleware(&self, middleware: *const dyn Middleware) {
        self.middlewares
            .write()
            .retain(|existing| !std::ptr::addr_eq(Arc::as_ptr(existing), middleware));
    }

    /// Runs one emission through the middleware chain and the listeners.
    fn dispatch(&self, event: &mut EventEnvelope) -> DispatchResult {
        let span = span!(Level::DEBUG, "emit", event = event.name());
        let _enter = span.enter();

        let chain = self.middlewares.read().clone();
        let terminal = |event: &mut EventEnvelope| self.invoke_listeners(event);

        // The error keeps the kind it was raised with; only the slot differs.
        match Next::new(&chain, &terminal, &self.policy).run(event) {
            Ok(()) => Ok(()),
            Err(err) => self.policy.resolve(ErrorKind::Emit, err, event),
        }
    }

    /// The terminal stage: calls every listener registered for the event.
    fn invoke_listeners(&self, event: &mut EventEnvelope) -> DispatchResult {
        let listeners = self
            .listeners
            .read()
            .get(event.name())
            .cloned()
            .unwrap_or_default();

        debug!(listeners = listeners.len(), "Invoking listeners");

        for listener in listeners {
            if let Err(err) = listener.call(event) {
                let err = DispatchError::new(ErrorKind::Listener, event.name(), err);
                self.policy.resolve(ErrorKind::Listener, err, event)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// EventBroker
// ============================================================================

/// A typed publish/subscribe broker for the events of map `M`.
///
/// `EventBroker` is a handle: clones share listeners, middleware and policy.
/// It is `Send + Sync`, but dispatch is fully synchronous and runs on the
/// caller's thread.
pub struct EventBroker<M: EventMap> {
    inner: Arc<BrokerInner>,
    _map: PhantomData<fn() -> M>,
}

impl<M: EventMap> EventBroker<M> {
    /// Creates a broker with default options.
    pub fn new() -> Self {
        Self::with_parts(ErrorPolicy::default(), DEFAULT_MAX_LISTENERS, None)
    }

    pub(crate) fn with_parts(
        policy: ErrorPolicy,
        max_listeners: usize,
        fallback_handler: Option<ErrorHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                listeners: RwLock::new(BTreeMap::new()),
                middlewares: RwLock::new(Vec::new()),
                policy,
                max_listeners,
                fallback_handler,
            }),
            _map: PhantomData,
        }
    }

    /// Registers a listener for `event`.
    ///
    /// Registering the same [`Listener`] handle twice is a no-op. Logs a
    /// warning when the set already holds `max_listeners` listeners.
    pub fn on<E, L, Marker>(&self, _event: E, listener: L) -> Subscription
    where
        E: Event<Map = M>,
        L: IntoListener<E, Marker>,
    {
        let listener = listener.into_listener().erase();
        self.inner.add_listener(E::NAME, &listener);
        Subscription::new(&self.inner, E::NAME, &listener)
    }

    /// Registers a listener that runs for the next emission of `event` only.
    ///
    /// The returned subscription removes the pending registration if the
    /// event has not fired yet.
    pub fn once<E, L, Marker>(&self, _event: E, listener: L) -> Subscription
    where
        E: Event<Map = M>,
        L: IntoListener<E, Marker>,
    {
        let listener = listener.into_listener();
        let slot = Arc::new(OnceLock::<Subscription>::new());
        let fired = AtomicBool::new(false);

        let own_subscription = Arc::clone(&slot);
        let wrapper = Listener::<E>::new(move |payload: &E::Payload| -> Result<(), BoxError> {
            if fired.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            let result = listener.call(payload);
            if let Some(subscription) = own_subscription.get() {
                subscription.unsubscribe();
            }
            result
        });

        // The slot is filled before the listener becomes visible to emitters.
        let erased = wrapper.erase();
        let subscription = Subscription::new(&self.inner, E::NAME, &erased);
        let _ = slot.set(subscription.clone());
        self.inner.add_listener(E::NAME, &erased);
        subscription
    }

    /// Removes `listener` from `event`. Unknown listeners are ignored.
    pub fn off<E>(&self, _event: E, listener: &Listener<E>)
    where
        E: Event<Map = M>,
    {
        let erased = listener.erase();
        self.inner.remove_listener(E::NAME, Arc::as_ptr(&erased));
    }

    /// Removes every listener of every event.
    ///
    /// Middleware and the error policy are kept.
    pub fn clear(&self) {
        self.inner.listeners.write().clear();
        debug!("Cleared all listeners");
    }

    /// Appends `middleware` to the chain.
    ///
    /// Adding the same `Arc` twice is a no-op and keeps its original position.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) -> MiddlewareHandle {
        {
            let mut chain = self.inner.middlewares.write();
            if !chain.iter().any(|existing| same_middleware(existing, &middleware)) {
                debug!(middleware = middleware.name(), "Middleware added");
                chain.push(Arc::clone(&middleware));
            }
        }
        MiddlewareHandle::new(&self.inner, &middleware)
    }

    /// Emits `event` with `payload`.
    ///
    /// Returns an error only when the emit slot of the error policy is
    /// `Stop` and something escaped the inner guards.
    pub fn emit<E>(&self, _event: E, payload: E::Payload) -> DispatchResult
    where
        E: Event<Map = M>,
    {
        let mut envelope = EventEnvelope::new(E::NAME, payload);
        self.inner.dispatch(&mut envelope)
    }

    /// Returns the number of listeners registered for `event`.
    pub fn listener_count<E>(&self, _event: E) -> usize
    where
        E: Event<Map = M>,
    {
        self.inner
            .listeners
            .read()
            .get(E::NAME)
            .map_or(0, Vec::len)
    }

    /// Returns `true` if `event` has at least one listener.
    pub fn has_listeners<E>(&self, event: E) -> bool
    where
        E: Event<Map = M>,
    {
        self.listener_count(event) > 0
    }

    /// Returns the names of events that currently have listeners, sorted.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.inner.listeners.read().keys().copied().collect()
    }

    /// Returns the number of middleware layers.
    pub fn middleware_count(&self) -> usize {
        self.inner.middlewares.read().len()
    }

    /// Returns the leak-warning threshold (`0` disables the warning).
    pub fn max_listeners(&self) -> usize {
        self.inner.max_listeners
    }

    /// Returns the error policy.
    pub fn error_policy(&self) -> &ErrorPolicy {
        &self.inner.policy
    }

    /// Returns the fallback error handler supplied at construction.
    ///
    /// The broker never calls it; it is kept for callers that want one
    /// shared handler next to the broker.
    pub fn fallback_handler(&self) -> Option<&ErrorHandler> {
        self.inner.fallback_handler.as_ref()
    }
}

impl<M: EventMap> Default for EventBroker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: EventMap> Clone for EventBroker<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _map: PhantomData,
        }
    }
}

impl<M: EventMap> fmt::Debug for EventBroker<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBroker")
            .field("events", &self.event_names())
            .field("middleware_count", &self.middleware_count())
            .field("max_listeners", &self.inner.max_listeners)
            .field("policy", &self.inner.policy)
            .finish()
    }
}
