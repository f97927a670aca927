//! Hooks binding broker subscriptions to a component's lifecycle.
//!
//! | Hook | Returns | Teardown |
//! |------|---------|----------|
//! | [`use_event_listener`] | [`EventListenerHook`] | `unmount()` or drop |
//! | [`use_listen_once`] | [`EventListenerHook`] | `unmount()`, drop, or first emission |
//! | [`use_emit`] | [`Emitter`] | none |
//! | [`use_event_state`] | [`EventState`] | drop |
//!
//! Every hook resolves its broker through a [`Scope`](crate::Scope) and fails
//! with [`ContextError::MissingProvider`](crate::ContextError::MissingProvider)
//! outside a provider.

mod emit;
mod listener;
mod state;

pub use emit::{Emitter, use_emit};
pub use listener::{EventListenerHook, use_event_listener, use_listen_once};
pub use state::{EventState, use_event_state};
