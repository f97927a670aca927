//! Error policy for EventFlow brokers.
//!
//! Every broker owns one [`ErrorPolicy`] with three independent slots, one per
//! [`ErrorKind`]. Each slot holds a [`PolicyAction`]:
//!
//! | Action | Effect |
//! |--------|--------|
//! | `Continue` | log the error, keep dispatching |
//! | `Stop` | propagate the error to the enclosing guard |
//! | `Custom(handler)` | call the handler, keep dispatching |
//!
//! All call sites go through [`ErrorPolicy::resolve`], which turns a slot into
//! a uniform handled (`Ok`) or propagate (`Err`) signal.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use super::error::{DispatchError, DispatchResult, ErrorKind, EventFlowError};
use super::event::EventEnvelope;

/// A user-supplied error handler, called with the error and the event in flight.
pub type ErrorHandler = Arc<dyn Fn(&DispatchError, &EventEnvelope) + Send + Sync>;

// =============================================================================
// Policy Mode
// =============================================================================

/// The symbolic subset of [`PolicyAction`], usable in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Log and keep going.
    #[default]
    Continue,
    /// Propagate the error.
    Stop,
}

impl PolicyMode {
    /// Returns the policy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyMode {
    type Err = EventFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "stop" => Ok(Self::Stop),
            _ => Err(EventFlowError::InvalidPolicy(s.to_string())),
        }
    }
}

// =============================================================================
// Policy Action
// =============================================================================

/// The configured response to one class of dispatch error.
#[derive(Clone, Default)]
pub enum PolicyAction {
    /// Log the error and continue.
    #[default]
    Continue,
    /// Re-raise the error to the enclosing guard.
    Stop,
    /// Hand the error to a custom handler and continue.
    Custom(ErrorHandler),
}

impl PolicyAction {
    /// Creates a custom action from a closure.
    pub fn custom<F>(handler: F) -> Self
    where
        F: Fn(&DispatchError, &EventEnvelope) + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(handler))
    }
}

impl From<PolicyMode> for PolicyAction {
    fn from(mode: PolicyMode) -> Self {
        match mode {
            PolicyMode::Continue => Self::Continue,
            PolicyMode::Stop => Self::Stop,
        }
    }
}

impl fmt::Debug for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("Continue"),
            Self::Stop => f.write_str("Stop"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// =============================================================================
// Error Policy
// =============================================================================

/// Per-kind error policy, fixed when a broker is built.
#[derive(Debug, Clone, Default)]
pub struct ErrorPolicy {
    /// Applied to errors returned by listeners.
    pub on_listener_error: PolicyAction,
    /// Applied to errors escaping the whole emission.
    pub on_emit_error: PolicyAction,
    /// Applied to errors returned by middleware.
    pub on_middleware_error: PolicyAction,
}

impl ErrorPolicy {
    /// Creates a policy with every slot set to `Continue`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy with every slot set to `action`.
    pub fn uniform(action: PolicyAction) -> Self {
        Self {
            on_listener_error: action.clone(),
            on_emit_error: action.clone(),
            on_middleware_error: action,
        }
    }

    /// Sets the listener slot.
    pub fn on_listener_error(mut self, action: impl Into<PolicyAction>) -> Self {
        self.on_listener_error = action.into();
        self
    }

    /// Sets the emit slot.
    pub fn on_emit_error(mut self, action: impl Into<PolicyAction>) -> Self {
        self.on_emit_error = action.into();
        self
    }

    /// Sets the middleware slot.
    pub fn on_middleware_error(mut self, action: impl Into<PolicyAction>) -> Self {
        self.on_middleware_error = action.into();
        self
    }

    /// Returns the action configured for `kind`.
    pub fn action(&self, kind: ErrorKind) -> &PolicyAction {
        match kind {
            ErrorKind::Listener => &self.on_listener_error,
            ErrorKind::Emit => &self.on_emit_error,
            ErrorKind::Middleware => &self.on_middleware_error,
        }
    }

    /// Resolves `error` against the slot for `kind`.
    ///
    /// Returns `Ok(())` when the error was handled and dispatch should go on,
    /// or gives the error back when the slot says `Stop`.
    pub fn resolve(
        &self,
        kind: ErrorKind,
        error: DispatchError,
        event: &EventEnvelope,
    ) -> DispatchResult {
        match self.action(kind) {
            PolicyAction::Custom(handler) => {
                handler(&error, event);
                Ok(())
            }
            PolicyAction::Continue => {
                error!(
                    event = event.name(),
                    kind = %kind,
                    "EventFlow error: Error in event {kind} for {}: {}",
                    event.name(),
                    error.inner()
                );
                Ok(())
            }
            PolicyAction::Stop => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn envelope() -> EventEnvelope {
        EventEnvelope::new("user_login", 1_u32)
    }

    #[test]
    fn test_default_is_continue() {
        let policy = ErrorPolicy::default();
        for kind in [ErrorKind::Listener, ErrorKind::Emit, ErrorKind::Middleware] {
            assert!(matches!(policy.action(kind), PolicyAction::Continue));
        }
    }

    #[test]
    fn test_continue_swallows() {
        let policy = ErrorPolicy::default();
        let err = DispatchError::new(ErrorKind::Listener, "user_login", "boom");
        assert!(policy.resolve(ErrorKind::Listener, err, &envelope()).is_ok());
    }

    #[test]
    fn test_stop_returns_original_error() {
        let policy = ErrorPolicy::new().on_listener_error(PolicyMode::Stop);
        let err = DispatchError::new(ErrorKind::Listener, "user_login", "boom");

        let returned = policy
            .resolve(ErrorKind::Listener, err, &envelope())
            .unwrap_err();
        assert_eq!(returned.kind(), ErrorKind::Listener);
        assert_eq!(returned.inner().to_string(), "boom");
    }

    #[test]
    fn test_slots_are_independent() {
        let policy = ErrorPolicy::new().on_middleware_error(PolicyMode::Stop);
        let listener_err = DispatchError::new(ErrorKind::Listener, "user_login", "a");
        let middleware_err = DispatchError::new(ErrorKind::Middleware, "user_login", "b");

        assert!(policy.resolve(ErrorKind::Listener, listener_err, &envelope()).is_ok());
        assert!(policy.resolve(ErrorKind::Middleware, middleware_err, &envelope()).is_err());
    }

    #[test]
    fn test_custom_handler_receives_error_and_event() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let policy = ErrorPolicy::uniform(PolicyAction::custom(move |err, event| {
            sink.lock().push(format!("{}:{}", event.name(), err.inner()));
        }));

        let err = DispatchError::new(ErrorKind::Emit, "user_login", "boom");
        assert!(policy.resolve(ErrorKind::Emit, err, &envelope()).is_ok());
        assert_eq!(*seen.lock(), vec!["user_login:boom".to_string()]);
    }

    #[test]
    fn test_policy_mode_parse() {
        assert_eq!("continue".parse::<PolicyMode>(), Ok(PolicyMode::Continue));
        assert_eq!("STOP".parse::<PolicyMode>(), Ok(PolicyMode::Stop));
        assert_eq!(
            "retry".parse::<PolicyMode>(),
            Err(EventFlowError::InvalidPolicy("retry".into()))
        );
    }

    #[test]
    fn test_policy_mode_serde() {
        let mode: PolicyMode = serde_json::from_str("\"stop\"").unwrap();
        assert_eq!(mode, PolicyMode::Stop);
        assert_eq!(serde_json::to_string(&PolicyMode::Continue).unwrap(), "\"continue\"");
    }
}
