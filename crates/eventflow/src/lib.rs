//! # EventFlow
//!
//! A typed, synchronous publish/subscribe broker with an onion-style
//! middleware chain and a per-kind error policy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  emit   ┌──────────────┐     ┌──────────────┐     ┌────────────────────┐
//! │  caller  │────────▶│ middleware A │────▶│ middleware B │────▶│ listeners (in      │
//! │          │◀────────│  (outermost) │◀────│  (logger)    │◀────│ registration order)│
//! └──────────┘  Result └──────────────┘     └──────────────┘     └────────────────────┘
//! ```
//!
//! - **Core**: event maps, the broker, middleware, error policy ([`core`])
//! - **Macros**: `#[derive(EventMap)]` generating typed event keys
//! - **Context**: scoped providers and lifecycle hooks ([`context`])
//! - **Runtime**: configuration and logging setup ([`runtime`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eventflow::prelude::*;
//!
//! #[derive(EventMap)]
//! #[event_map(crate = "eventflow::core")]
//! pub struct AppEvents {
//!     user_login: String,
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let broker = create_event_broker::<AppEvents>(BrokerOptions::new().logger(true));
//!     broker.on(UserLogin, |name: &String| println!("welcome, {name}"));
//!     broker.emit(UserLogin, "ada".to_string())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros`: `#[derive(EventMap)]` (default)
//! - `context`: `Scope` and hooks (default)
//! - `runtime`: configuration loading and logging (default)
//! - `toml-config` / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output

pub use eventflow_core as core;

#[cfg(feature = "context")]
pub use eventflow_context as context;

#[cfg(feature = "runtime")]
pub use eventflow_runtime as runtime;

#[cfg(feature = "macros")]
pub use eventflow_macros::EventMap;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use eventflow::prelude::*;
/// ```
pub mod prelude {
    // Broker and factory
    pub use eventflow_core::{BrokerOptions, EventBroker, create_event_broker};

    // Event maps and listeners
    pub use eventflow_core::{Event, EventEnvelope, EventMap, Listener, Subscription};

    // Middleware
    pub use eventflow_core::middleware::{LoggerMiddleware, Middleware, Next, from_fn};

    // Errors and policy
    pub use eventflow_core::{
        BoxError, DispatchError, DispatchResult, ErrorKind, ErrorPolicy, PolicyAction, PolicyMode,
    };

    #[cfg(feature = "macros")]
    pub use eventflow_macros::EventMap;

    #[cfg(feature = "context")]
    pub use eventflow_context::{
        Scope, use_emit, use_event_listener, use_event_state, use_listen_once,
    };

    #[cfg(feature = "runtime")]
    pub use eventflow_runtime::{ConfigLoader, EventFlowConfig, LoggingBuilder, bootstrap};
}
