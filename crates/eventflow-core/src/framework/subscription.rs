//! Removal handles returned by `on`, `once` and `use_middleware`.
//!
//! Both handles hold only weak references: they never keep a broker alive, and
//! they pin the identity of what they remove so a later registration can never
//! be removed by a stale handle. Removal is idempotent.
//!
//! Dropping a handle does **not** remove anything. Use
//! [`Subscription::into_guard`] for scope-bound subscriptions.

use std::fmt;
use std::sync::{Arc, Weak};

use super::broker::BrokerInner;
use super::listener::ErasedListener;
use super::middleware::Middleware;

// ============================================================================
// Subscription
// ============================================================================

/// Unsubscribes one listener from one event.
#[derive(Clone)]
pub struct Subscription {
    broker: Weak<BrokerInner>,
    event: &'static str,
    listener: Weak<dyn ErasedListener>,
}

impl Subscription {
    pub(crate) fn new(
        broker: &Arc<BrokerInner>,
        event: &'static str,
        listener: &Arc<dyn ErasedListener>,
    ) -> Self {
        Self {
            broker: Arc::downgrade(broker),
            event,
            listener: Arc::downgrade(listener),
        }
    }

    /// Removes the listener. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        let Some(broker) = self.broker.upgrade() else {
            return;
        };
        broker.remove_listener(self.event, self.listener.as_ptr());
    }

    /// Returns the event this subscription belongs to.
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Returns `true` while the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.broker
            .upgrade()
            .is_some_and(|broker| broker.contains_listener(self.event, self.listener.as_ptr()))
    }

    /// Converts into a guard that unsubscribes when dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard {
            inner: self,
            armed: true,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish()
    }
}

/// A [`Subscription`] that unsubscribes on drop.
#[derive(Debug)]
pub struct SubscriptionGuard {
    inner: Subscription,
    armed: bool,
}

impl SubscriptionGuard {
    /// Gives the subscription back without unsubscribing.
    pub fn disarm(mut self) -> Subscription {
        self.armed = false;
        self.inner.clone()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner.unsubscribe();
        }
    }
}

// ============================================================================
// MiddlewareHandle
// ============================================================================

/// Removes one middleware from a broker's chain.
#[derive(Clone)]
pub struct MiddlewareHandle {
    broker: Weak<BrokerInner>,
    middleware: Weak<dyn Middleware>,
}

impl MiddlewareHandle {
    pub(crate) fn new(broker: &Arc<BrokerInner>, middleware: &Arc<dyn Middleware>) -> Self {
        Self {
            broker: Arc::downgrade(broker),
            middleware: Arc::downgrade(middleware),
        }
    }

    /// Removes the middleware. Safe to call any number of times.
    pub fn remove(&self) {
        if let Some(broker) = self.broker.upgrade() {
            broker.remove_middleware(self.middleware.as_ptr());
        }
    }
}

impl fmt::Debug for MiddlewareHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareHandle").finish_non_exhaustive()
    }
}
