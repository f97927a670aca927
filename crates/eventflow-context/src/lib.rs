//! # EventFlow Context
//!
//! Scoped access to an [`EventBroker`](eventflow_core::EventBroker) for
//! component trees, plus hooks that tie subscriptions to component lifecycles.
//!
//! The broker is passed explicitly: a [`Scope`] node provides it, and every
//! descendant scope resolves it by event map type.
//!
//! ```rust,ignore
//! use eventflow_context::{Scope, use_emit, use_event_state};
//!
//! let app = Scope::root().provide(broker);
//!
//! let badge = app.child();
//! let unread = use_event_state(&badge, UnreadCount, 0)?;
//!
//! use_emit::<AppEvents>(&app)?.emit(UnreadCount, 4)?;
//! assert_eq!(unread.get(), 4);
//! ```

pub mod error;
pub mod hooks;
pub mod scope;

pub use error::{ContextError, ContextResult};
pub use hooks::{
    Emitter, EventListenerHook, EventState, use_emit, use_event_listener, use_event_state,
    use_listen_once,
};
pub use scope::Scope;
