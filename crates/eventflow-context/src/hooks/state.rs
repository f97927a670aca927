//! `use_event_state`: local state fed by an event.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use eventflow_core::{Event, Listener, SubscriptionGuard};
use parking_lot::RwLock;

use crate::error::ContextResult;
use crate::scope::Scope;

struct StateCell<T> {
    value: RwLock<T>,
    renders: AtomicU64,
}

/// The latest payload of one event, seeded with an initial value.
///
/// Every emission overwrites the value and counts as one re-render. The
/// subscription ends when the state is dropped.
pub struct EventState<E: Event> {
    cell: Arc<StateCell<E::Payload>>,
    _subscription: SubscriptionGuard,
}

/// Tracks the latest payload of `event`, starting from `initial`.
///
/// ```rust,ignore
/// let unread = use_event_state(&scope, UnreadCount, 0)?;
/// emitter.emit(UnreadCount, 3)?;
/// assert_eq!(unread.get(), 3);
/// ```
pub fn use_event_state<E>(
    scope: &Scope,
    event: E,
    initial: E::Payload,
) -> ContextResult<EventState<E>>
where
    E: Event,
    E::Payload: Clone + Send + Sync,
{
    let broker = scope.use_event_broker::<E::Map>()?;
    let cell = Arc::new(StateCell {
        value: RwLock::new(initial),
        renders: AtomicU64::new(0),
    });

    let sink = Arc::clone(&cell);
    let listener = Listener::<E>::new(move |payload: &E::Payload| {
        *sink.value.write() = payload.clone();
        sink.renders.fetch_add(1, Ordering::SeqCst);
    });

    Ok(EventState {
        cell,
        _subscription: broker.on(event, listener).into_guard(),
    })
}

impl<E> EventState<E>
where
    E: Event,
    E::Payload: Clone,
{
    /// Returns a copy of the current value.
    pub fn get(&self) -> E::Payload {
        self.cell.value.read().clone()
    }
}

impl<E: Event> EventState<E> {
    /// Reads the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&E::Payload) -> R) -> R {
        f(&self.cell.value.read())
    }

    /// Returns how many emissions have updated the value.
    pub fn renders(&self) -> u64 {
        self.cell.renders.load(Ordering::SeqCst)
    }
}

impl<E: Event> fmt::Debug for EventState<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventState")
            .field("event", &E::NAME)
            .field("value", &*self.cell.value.read())
            .field("renders", &self.renders())
            .finish()
    }
}
