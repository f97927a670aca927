//! Logging middleware.
//!
//! [`LoggerMiddleware`] writes a grouped block for every event (an
//! `eventflow.event` span holding the timestamp and payload records), calls an
//! optional user callback, then forwards to the next layer untouched.

use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{Level, info, span};

use super::middleware::{Middleware, Next};
use crate::foundation::{BoxError, EventEnvelope};

/// A user callback invoked by [`LoggerMiddleware`] for every event.
pub type CustomLogger = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// Pass-through middleware that logs every event.
#[derive(Clone)]
pub struct LoggerMiddleware {
    builtin: bool,
    custom: Option<CustomLogger>,
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerMiddleware {
    /// Creates a logger that writes the built-in block only.
    pub fn new() -> Self {
        Self {
            builtin: true,
            custom: None,
        }
    }

    /// Adds a callback run after the built-in block.
    pub fn with_custom<F>(mut self, logger: F) -> Self
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(logger));
        self
    }

    /// Suppresses the built-in block, keeping only the callback.
    pub fn quiet(mut self) -> Self {
        self.builtin = false;
        self
    }

    fn write_block(&self, event: &EventEnvelope) {
        let now = OffsetDateTime::now_utc();
        let timestamp = now
            .format(&Rfc3339)
            .unwrap_or_else(|_| now.unix_timestamp().to_string());

        let span = span!(Level::INFO, "eventflow.event", name = event.name());
        let _enter = span.enter();
        info!(%timestamp, "Event: {}", event.name());
        info!(payload = ?event.payload(), "Payload");
    }
}

impl Middleware for LoggerMiddleware {
    fn handle(&self, event: &mut EventEnvelope, next: Next<'_>) -> Result<(), BoxError> {
        if self.builtin {
            self.write_block(event);
        }
        if let Some(custom) = &self.custom {
            custom(&*event);
        }
        next.run(event)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "logger"
    }
}

impl fmt::Debug for LoggerMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerMiddleware")
            .field("builtin", &self.builtin)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}
