//! # EventFlow Core
//!
//! A typed, synchronous publish/subscribe broker with a middleware chain and a
//! configurable error policy.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! The typed vocabulary:
//! - **Event maps**: compile-time sets of events ([`EventMap`], [`Event`])
//! - **Envelopes**: the `{name, data}` pair in flight ([`EventEnvelope`])
//! - **Errors**: dispatch failures and their policy ([`DispatchError`], [`ErrorPolicy`])
//!
//! ### Framework Layer
//!
//! Dispatch:
//! - **Broker**: listener registry and emission ([`EventBroker`])
//! - **Middleware**: onion-style layers around every emission ([`Middleware`], [`Next`])
//! - **Logger**: a ready-made pass-through middleware ([`LoggerMiddleware`])
//! - **Factory**: option-driven construction ([`create_event_broker`])
//!
//! ## Dispatch Pipeline
//!
//! ```text
//! emit ──▶ middleware A ──▶ middleware B ──▶ listener 1, listener 2, ...
//!   ▲           │                 │                    │
//!   └── emit ◀──┴─ middleware ◀───┴──── listener ◀─────┘   (error policy slots)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use eventflow_core::prelude::*;
//! use eventflow_macros::EventMap;
//!
//! #[derive(EventMap)]
//! pub struct AppEvents {
//!     user_login: String,
//! }
//!
//! let broker = create_event_broker::<AppEvents>(BrokerOptions::new().logger(true));
//! broker.on(UserLogin, |name: &String| println!("hello {name}"));
//! broker.emit(UserLogin, "ada".to_string())?;
//! ```

pub mod foundation;
pub mod framework;

pub use foundation::{
    BoxError, DispatchError, DispatchResult, ErrorHandler, ErrorKind, ErrorPolicy, Event,
    EventEnvelope, EventFlowError, EventMap, Payload, PolicyAction, PolicyMode,
};

pub use framework::{
    BrokerOptions, CustomLogger, DEFAULT_MAX_LISTENERS, EventBroker, FromFn, IntoListener,
    Listener, ListenerOutcome, LoggerMiddleware, Middleware, MiddlewareHandle, Next, Subscription,
    SubscriptionGuard, create_event_broker, from_fn,
};

/// Middleware building blocks.
pub mod middleware {
    pub use crate::framework::logger::{CustomLogger, LoggerMiddleware};
    pub use crate::framework::middleware::{FromFn, Middleware, Next, from_fn};
}

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::{
        BoxError, DispatchError, ErrorKind, ErrorPolicy, Event, EventEnvelope, EventMap,
        PolicyAction, PolicyMode,
    };
    pub use super::framework::{
        BrokerOptions, EventBroker, Listener, LoggerMiddleware, Middleware, Next, Subscription,
        create_event_broker, from_fn,
    };
}
