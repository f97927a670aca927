//! Broker construction options and the factory function.

use std::fmt;
use std::sync::Arc;

use super::broker::{DEFAULT_MAX_LISTENERS, EventBroker};
use super::logger::LoggerMiddleware;
use super::middleware::Middleware;
use crate::foundation::{ErrorHandler, ErrorPolicy, EventMap};

/// Options accepted by [`create_event_broker`].
///
/// # Example
///
/// ```rust,ignore
/// let broker = create_event_broker::<AppEvents>(
///     BrokerOptions::new()
///         .logger(true)
///         .max_listeners(20)
///         .error_policy(ErrorPolicy::new().on_emit_error(PolicyMode::Stop)),
/// );
/// ```
#[derive(Clone)]
pub struct BrokerOptions {
    logger: bool,
    logger_middleware: Option<LoggerMiddleware>,
    max_listeners: usize,
    error_policy: ErrorPolicy,
    middlewares: Vec<Arc<dyn Middleware>>,
    error_handler: Option<ErrorHandler>,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerOptions {
    /// Creates the default options: no logger, 10 listeners, all `Continue`.
    pub fn new() -> Self {
        Self {
            logger: false,
            logger_middleware: None,
            max_listeners: DEFAULT_MAX_LISTENERS,
            error_policy: ErrorPolicy::default(),
            middlewares: Vec::new(),
            error_handler: None,
        }
    }

    /// Appends the logger middleware after all user middleware.
    pub fn logger(mut self, enabled: bool) -> Self {
        self.logger = enabled;
        self
    }

    /// Enables the logger with a customised [`LoggerMiddleware`].
    pub fn logger_middleware(mut self, logger: LoggerMiddleware) -> Self {
        self.logger = true;
        self.logger_middleware = Some(logger);
        self
    }

    /// Sets the listener-count warning threshold (`0` disables it).
    pub fn max_listeners(mut self, max: usize) -> Self {
        self.max_listeners = max;
        self
    }

    /// Sets the error policy.
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Appends a middleware.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Stores a fallback error handler.
    ///
    /// Available via [`EventBroker::fallback_handler`]; error routing only
    /// ever uses the [`ErrorPolicy`].
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Returns `true` if the logger will be injected.
    pub fn has_logger(&self) -> bool {
        self.logger
    }
}

impl fmt::Debug for BrokerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerOptions")
            .field("logger", &self.logger)
            .field("max_listeners", &self.max_listeners)
            .field("error_policy", &self.error_policy)
            .field("middleware_count", &self.middlewares.len())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// Creates a broker for map `M`.
///
/// User middleware keeps its order; when `logger` is set the logger is
/// appended last, making it the innermost layer.
pub fn create_event_broker<M: EventMap>(options: BrokerOptions) -> EventBroker<M> {
    let BrokerOptions {
        logger,
        logger_middleware,
        max_listeners,
        error_policy,
        mut middlewares,
        error_handler,
    } = options;

    if logger {
        middlewares.push(Arc::new(logger_middleware.unwrap_or_default()));
    }

    let broker = EventBroker::with_parts(error_policy, max_listeners, error_handler);
    for middleware in middlewares {
        broker.use_middleware(middleware);
    }
    broker
}
