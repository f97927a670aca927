//! `use_emit`: a scoped emit handle.

use eventflow_core::{DispatchResult, Event, EventBroker, EventMap};

use crate::error::ContextResult;
use crate::scope::Scope;

/// Forwards emissions to the broker provided in a scope.
pub struct Emitter<M: EventMap> {
    broker: EventBroker<M>,
}

/// Returns an [`Emitter`] for the broker of map `M` provided in `scope`.
pub fn use_emit<M: EventMap>(scope: &Scope) -> ContextResult<Emitter<M>> {
    Ok(Emitter {
        broker: scope.use_event_broker::<M>()?,
    })
}

impl<M: EventMap> Emitter<M> {
    /// Emits `event`; see [`EventBroker::emit`].
    pub fn emit<E>(&self, event: E, payload: E::Payload) -> DispatchResult
    where
        E: Event<Map = M>,
    {
        self.broker.emit(event, payload)
    }

    /// Returns the underlying broker.
    pub fn broker(&self) -> &EventBroker<M> {
        &self.broker
    }
}

impl<M: EventMap> Clone for Emitter<M> {
    fn clone(&self) -> Self {
        Self {
            broker: self.broker.clone(),
        }
    }
}

impl<M: EventMap> std::fmt::Debug for Emitter<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Emitter").field(&self.broker).finish()
    }
}
