//! Framework layer: the broker, its middleware chain, and the factory.

pub mod broker;
pub mod listener;
pub mod logger;
pub mod middleware;
pub mod options;
pub mod subscription;

pub use broker::{DEFAULT_MAX_LISTENERS, EventBroker};
pub use listener::{IntoListener, Listener, ListenerOutcome};
pub use logger::{CustomLogger, LoggerMiddleware};
pub use middleware::{FromFn, Middleware, Next, from_fn};
pub use options::{BrokerOptions, create_event_broker};
pub use subscription::{MiddlewareHandle, Subscription, SubscriptionGuard};
