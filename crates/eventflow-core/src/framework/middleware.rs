//! Middleware chain for EventFlow.
//!
//! A [`Middleware`] wraps the rest of the dispatch pipeline. It receives the
//! [`EventEnvelope`] and a [`Next`] continuation, and may inspect or edit the
//! envelope, call `next` (at most once, since `Next` is consumed), skip it, or
//! catch the errors it returns.
//!
//! # Ordering
//!
//! Middleware registered first is the outermost layer:
//!
//! ```text
//! emit ──▶ A ──▶ B ──▶ listeners
//!          A ◀── B ◀──
//! ```
//!
//! # Guards
//!
//! Every layer runs inside a guard that consults the middleware slot of the
//! broker's [`ErrorPolicy`] when the layer fails:
//!
//! - failed before calling `next`: on `Continue` the remaining chain runs as
//!   if the layer were absent;
//! - failed after `next` returned `Ok`: on `Continue` the emission is done;
//! - `next` itself failed (an escalated `Stop`): returning that error passes
//!   it through untouched; returning any other error hands it to the
//!   middleware slot.
//!
//! # Example
//!
//! ```rust,ignore
//! use eventflow_core::middleware::from_fn;
//!
//! broker.use_middleware(Arc::new(from_fn(|event, next| {
//!     let started = Instant::now();
//!     next.run(event)?;
//!     debug!(event = event.name(), elapsed = ?started.elapsed());
//!     Ok(())
//! })));
//! ```

use std::cell::Cell;
use std::sync::Arc;

use crate::foundation::{
    BoxError, DispatchError, DispatchResult, ErrorKind, ErrorPolicy, EventEnvelope,
};

// ============================================================================
// Middleware Trait
// ============================================================================

/// A layer wrapping the dispatch of every event emitted on a broker.
pub trait Middleware: Send + Sync + 'static {
    /// Handles one event, calling `next` to continue the chain.
    fn handle(&self, event: &mut EventEnvelope, next: Next<'_>) -> Result<(), BoxError>;

    /// Returns a name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A middleware built from a closure. See [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

/// Creates a middleware from a closure.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&mut EventEnvelope, Next<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
{
    FromFn { f }
}

impl<F> Middleware for FromFn<F>
where
    F: Fn(&mut EventEnvelope, Next<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn handle(&self, event: &mut EventEnvelope, next: Next<'_>) -> Result<(), BoxError> {
        (self.f)(event, next)
    }

    fn name(&self) -> &str {
        "from_fn"
    }
}

/// Returns `true` if both trait objects share an allocation.
pub(crate) fn same_middleware(a: &Arc<dyn Middleware>, b: &Arc<dyn Middleware>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// ============================================================================
// Next
// ============================================================================

/// The terminal stage invoked after the last middleware.
pub(crate) type Terminal<'a> = dyn Fn(&mut EventEnvelope) -> DispatchResult + 'a;

/// How far a layer got with its continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// `next` was never called.
    Pending,
    /// `next` ran and succeeded.
    Completed,
    /// `next` ran and failed.
    Failed,
}

/// The remainder of the middleware chain.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    terminal: &'a Terminal<'a>,
    policy: &'a ErrorPolicy,
    stage: Option<&'a Cell<Stage>>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        chain: &'a [Arc<dyn Middleware>],
        terminal: &'a Terminal<'a>,
        policy: &'a ErrorPolicy,
    ) -> Self {
        Self {
            chain,
            terminal,
            policy,
            stage: None,
        }
    }

    /// Runs the rest of the chain, ending with the listeners.
    pub fn run(self, event: &mut EventEnvelope) -> DispatchResult {
        let result = self.dispatch(event);
        if let Some(stage) = self.stage {
            stage.set(if result.is_ok() {
                Stage::Completed
            } else {
                Stage::Failed
            });
        }
        result
    }

    /// Returns the number of middleware layers left before the listeners.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    fn dispatch(&self, event: &mut EventEnvelope) -> DispatchResult {
        let Some((layer, rest)) = self.chain.split_first() else {
            return (self.terminal)(event);
        };

        let stage = Cell::new(Stage::Pending);
        let next = Next {
            chain: rest,
            terminal: self.terminal,
            policy: self.policy,
            stage: Some(&stage),
        };

        let Err(err) = layer.handle(event, next) else {
            return Ok(());
        };

        match stage.get() {
            Stage::Failed => match err.downcast::<DispatchError>() {
                Ok(escalated) => Err(*escalated),
                Err(own) => {
                    let err = DispatchError::new(ErrorKind::Middleware, event.name(), own);
                    self.policy.resolve(ErrorKind::Middleware, err, event)
                }
            },
            Stage::Completed => {
                let err = DispatchError::new(ErrorKind::Middleware, event.name(), err);
                self.policy.resolve(ErrorKind::Middleware, err, event)
            }
            Stage::Pending => {
                tracing::trace!(
                    middleware = layer.name(),
                    "Skipping failed middleware layer"
                );
                let err = DispatchError::new(ErrorKind::Middleware, event.name(), err);
                self.policy.resolve(ErrorKind::Middleware, err, event)?;
                Next {
                    chain: rest,
                    terminal: self.terminal,
                    policy: self.policy,
                    stage: None,
                }
                .dispatch(event)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::{PolicyAction, PolicyMode};
    use parking_lot::Mutex;

    fn run_chain(
        chain: &[Arc<dyn Middleware>],
        policy: &ErrorPolicy,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> DispatchResult {
        let sink = log.clone();
        let terminal = move |_: &mut EventEnvelope| -> DispatchResult {
            sink.lock().push("listeners".into());
            Ok(())
        };
        let mut event = EventEnvelope::new("test", ());
        Next::new(chain, &terminal, policy).run(&mut event)
    }

    fn tracer(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Middleware> {
        let log = log.clone();
        Arc::new(from_fn(move |event, next| {
            log.lock().push(format!("{name}:pre"));
            next.run(event)?;
            log.lock().push(format!("{name}:post"));
            Ok(())
        }))
    }

    #[test]
    fn test_empty_chain_runs_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        assert!(run_chain(&[], &ErrorPolicy::default(), &log).is_ok());
        assert_eq!(*log.lock(), vec!["listeners"]);
    }

    #[test]
    fn test_onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![tracer("a", &log), tracer("b", &log)];

        run_chain(&chain, &ErrorPolicy::default(), &log).unwrap();
        assert_eq!(
            *log.lock(),
            vec!["a:pre", "b:pre", "listeners", "b:post", "a:post"]
        );
    }

    #[test]
    fn test_layer_can_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(from_fn(|_, _| Ok(())))];

        run_chain(&chain, &ErrorPolicy::default(), &log).unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_failing_layer_is_skipped_on_continue() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![
            tracer("a", &log),
            Arc::new(from_fn(|_, _| Err("broken".into()))),
            tracer("c", &log),
        ];

        run_chain(&chain, &ErrorPolicy::default(), &log).unwrap();
        assert_eq!(
            *log.lock(),
            vec!["a:pre", "c:pre", "listeners", "c:post", "a:post"]
        );
    }

    #[test]
    fn test_failure_after_next_does_not_rerun_listeners() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(from_fn(|event, next| {
            next.run(event)?;
            Err("post-processing failed".into())
        }))];

        run_chain(&chain, &ErrorPolicy::default(), &log).unwrap();
        assert_eq!(*log.lock(), vec!["listeners"]);
    }

    #[test]
    fn test_stop_policy_propagates_layer_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let policy = ErrorPolicy::new().on_middleware_error(PolicyMode::Stop);
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(from_fn(|_, _| Err("broken".into())))];

        let err = run_chain(&chain, &policy, &log).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Middleware);
        assert_eq!(err.inner().to_string(), "broken");
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_escalation_passes_through_outer_layers() {
        let handled = Arc::new(Mutex::new(0));
        let counter = handled.clone();
        let policy = ErrorPolicy::new().on_middleware_error(PolicyAction::custom(move |_, _| {
            *counter.lock() += 1;
        }));

        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(from_fn(|event, next| {
            next.run(event)?;
            Ok(())
        }))];
        let terminal = |event: &mut EventEnvelope| -> DispatchResult {
            Err(DispatchError::new(ErrorKind::Listener, event.name(), "listener failed"))
        };
        let mut event = EventEnvelope::new("test", ());

        let err = Next::new(&chain, &terminal, &policy)
            .run(&mut event)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Listener);
        assert_eq!(*handled.lock(), 0);
    }

    #[test]
    fn test_layer_may_catch_downstream_error() {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(from_fn(|event, next| {
            let _ = next.run(event);
            Ok(())
        }))];
        let terminal = |event: &mut EventEnvelope| -> DispatchResult {
            Err(DispatchError::new(ErrorKind::Listener, event.name(), "listener failed"))
        };
        let mut event = EventEnvelope::new("test", ());

        assert!(
            Next::new(&chain, &terminal, &ErrorPolicy::default())
                .run(&mut event)
                .is_ok()
        );
    }
}
