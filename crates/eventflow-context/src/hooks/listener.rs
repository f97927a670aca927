//! Listener hooks: `use_event_listener` and `use_listen_once`.

use std::fmt;

use eventflow_core::{Event, EventBroker, IntoListener, Listener, Subscription};
use tracing::trace;

use crate::error::ContextResult;
use crate::scope::Scope;

/// Whether the hook registers with `on` or `once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Every,
    Once,
}

/// A listener whose subscription follows a component's lifecycle.
///
/// Subscribed when created (mount). Re-subscribed by [`update`](Self::update)
/// when the dependency value changes. Unsubscribed by
/// [`unmount`](Self::unmount) or on drop.
pub struct EventListenerHook<E: Event, D = ()> {
    event: E,
    broker: EventBroker<E::Map>,
    listener: Listener<E>,
    deps: D,
    mode: Mode,
    subscription: Option<Subscription>,
}

/// Subscribes `listener` to `event` on the broker provided in `scope`.
///
/// ```rust,ignore
/// let mut hook = use_event_listener(&scope, UserLogin, |user: &User| greet(user), user_id)?;
///
/// // next render
/// hook.update(new_user_id);
/// ```
pub fn use_event_listener<E, L, Marker, D>(
    scope: &Scope,
    event: E,
    listener: L,
    deps: D,
) -> ContextResult<EventListenerHook<E, D>>
where
    E: Event + Copy,
    L: IntoListener<E, Marker>,
    D: PartialEq,
{
    let broker = scope.use_event_broker::<E::Map>()?;
    Ok(EventListenerHook::mount(
        event,
        broker,
        listener.into_listener(),
        deps,
        Mode::Every,
    ))
}

/// Like [`use_event_listener`], but the listener fires at most once per mount.
pub fn use_listen_once<E, L, Marker>(
    scope: &Scope,
    event: E,
    listener: L,
) -> ContextResult<EventListenerHook<E>>
where
    E: Event + Copy,
    L: IntoListener<E, Marker>,
{
    let broker = scope.use_event_broker::<E::Map>()?;
    Ok(EventListenerHook::mount(
        event,
        broker,
        listener.into_listener(),
        (),
        Mode::Once,
    ))
}

impl<E: Event + Copy, D: PartialEq> EventListenerHook<E, D> {
    fn mount(
        event: E,
        broker: EventBroker<E::Map>,
        listener: Listener<E>,
        deps: D,
        mode: Mode,
    ) -> Self {
        let mut hook = Self {
            event,
            broker,
            listener,
            deps,
            mode,
            subscription: None,
        };
        hook.subscribe();
        hook
    }

    fn subscribe(&mut self) {
        let subscription = match self.mode {
            Mode::Every => self.broker.on(self.event, self.listener.clone()),
            Mode::Once => self.broker.once(self.event, self.listener.clone()),
        };
        trace!(event = E::NAME, mode = ?self.mode, "Hook subscribed");
        self.subscription = Some(subscription);
    }

    /// Re-subscribes if `deps` differs from the previous value.
    ///
    /// Returns `true` when a re-subscription happened. An unmounted hook is
    /// mounted again.
    pub fn update(&mut self, deps: D) -> bool {
        if self.deps == deps && self.subscription.is_some() {
            return false;
        }
        self.deps = deps;
        self.unmount();
        self.subscribe();
        true
    }

    /// Like [`update`](Self::update), also swapping in the listener of the
    /// current render when the dependencies changed.
    pub fn update_with<L, Marker>(&mut self, deps: D, listener: L) -> bool
    where
        L: IntoListener<E, Marker>,
    {
        if self.deps == deps && self.subscription.is_some() {
            return false;
        }
        self.listener = listener.into_listener();
        self.update(deps)
    }
}

impl<E: Event, D> EventListenerHook<E, D> {
    /// Unsubscribes. Calling it again is a no-op.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            trace!(event = E::NAME, "Hook unsubscribed");
        }
    }

    /// Returns `true` while the listener is registered with the broker.
    ///
    /// A `use_listen_once` hook reports `false` once its listener has fired.
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Returns the current dependency value.
    pub fn deps(&self) -> &D {
        &self.deps
    }

    /// Returns the listener handle.
    pub fn listener(&self) -> &Listener<E> {
        &self.listener
    }
}

impl<E: Event, D> Drop for EventListenerHook<E, D> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<E: Event, D: fmt::Debug> fmt::Debug for EventListenerHook<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListenerHook")
            .field("event", &E::NAME)
            .field("deps", &self.deps)
            .field("mode", &self.mode)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
