//! Listener registry and error routing behaviour of `EventBroker`.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Ping, Session, TestEvents, Trace, UserLogin, X, capture_logs};
use eventflow_core::prelude::*;
use eventflow_core::{BoxError, ErrorKind, PolicyAction};

fn counter() -> (Arc<AtomicUsize>, impl Fn(&i32) + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&count);
    (count, move |_: &i32| {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_listener_receives_payload() {
    let broker = EventBroker::<TestEvents>::new();
    let seen = Trace::default();

    let sink = seen.clone();
    broker.on(X, move |n: &i32| sink.push(n.to_string()));

    broker.emit(X, 42).unwrap();
    assert_eq!(seen.entries(), ["42"]);
}

#[test]
fn test_listeners_run_in_registration_order() {
    let broker = EventBroker::<TestEvents>::new();
    let trace = Trace::default();

    for label in ["first", "second", "third"] {
        let trace = trace.clone();
        broker.on(X, move |_: &i32| trace.push(label));
    }

    broker.emit(X, 0).unwrap();
    assert_eq!(trace.entries(), ["first", "second", "third"]);
}

#[test]
fn test_emit_without_listeners_is_ok() {
    let broker = EventBroker::<TestEvents>::new();
    assert!(broker.emit(Ping, ()).is_ok());
    assert!(broker.event_names().is_empty());
}

#[test]
fn test_unsubscribe_removes_event_entry() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();

    let subscription = broker.on(X, listener);
    assert!(subscription.is_active());
    assert_eq!(broker.event_names(), ["x"]);

    subscription.unsubscribe();
    assert!(!subscription.is_active());
    assert!(!broker.has_listeners(X));
    assert!(broker.event_names().is_empty());

    broker.emit(X, 1).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unsubscribe_twice_is_harmless() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();
    let (other_count, other) = counter();

    let subscription = broker.on(X, listener);
    broker.on(X, other);

    subscription.unsubscribe();
    subscription.unsubscribe();

    broker.emit(X, 1).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(other_count.load(Ordering::SeqCst), 1);
    assert_eq!(broker.listener_count(X), 1);
}

#[test]
fn test_off_with_listener_handle() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();
    let listener = Listener::<X>::new(listener);

    broker.on(X, listener.clone());
    broker.off(X, &listener);
    broker.off(X, &listener);

    broker.emit(X, 1).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(broker.event_names().is_empty());
}

#[test]
fn test_duplicate_listener_handle_fires_once() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();
    let listener = Listener::<X>::new(listener);

    broker.on(X, listener.clone());
    broker.on(X, listener.clone());

    assert_eq!(broker.listener_count(X), 1);
    broker.emit(X, 1).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_once_fires_exactly_once() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();

    broker.once(X, listener);
    broker.emit(X, 1).unwrap();
    broker.emit(X, 2).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!broker.has_listeners(X));
}

#[test]
fn test_once_can_be_cancelled_before_firing() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();

    let subscription = broker.once(X, listener);
    subscription.unsubscribe();
    broker.emit(X, 1).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_once_subscription_tracks_registration() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();

    let subscription = broker.once(X, listener);
    assert!(subscription.is_active());
    assert_eq!(broker.listener_count(X), 1);

    broker.emit(X, 1).unwrap();
    assert!(!subscription.is_active());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_once_listener_is_removed_and_reported() {
    let errors = Trace::default();
    let sink = errors.clone();
    let policy = ErrorPolicy::new().on_listener_error(PolicyAction::custom(move |err, event| {
        sink.push(format!("{}:{}:{}", err.kind(), event.name(), err.inner()));
    }));
    let broker = create_event_broker::<TestEvents>(BrokerOptions::new().error_policy(policy));
    let calls = Arc::new(AtomicUsize::new(0));

    let handle = Arc::clone(&calls);
    broker.once(X, move |_: &i32| -> Result<(), BoxError> {
        handle.fetch_add(1, Ordering::SeqCst);
        Err("first call failed".into())
    });

    broker.emit(X, 1).unwrap();
    broker.emit(X, 2).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(broker.listener_count(X), 0);
    assert_eq!(errors.entries(), ["listener:x:first call failed"]);
}

#[test]
fn test_clear_drops_every_listener() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();
    let logins = Arc::new(AtomicUsize::new(0));

    broker.on(X, listener);
    let handle = Arc::clone(&logins);
    broker.on(UserLogin, move |_: &Session| {
        handle.fetch_add(1, Ordering::SeqCst);
    });
    broker.use_middleware(Arc::new(from_fn(|event, next| {
        next.run(event)?;
        Ok(())
    })));

    broker.clear();

    broker.emit(X, 1).unwrap();
    broker
        .emit(UserLogin, Session { user: "ada".into() })
        .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(logins.load(Ordering::SeqCst), 0);
    assert!(broker.event_names().is_empty());
    assert_eq!(broker.middleware_count(), 1);
}

#[test]
fn test_guard_unsubscribes_on_drop() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();

    {
        let _guard = broker.on(X, listener).into_guard();
        broker.emit(X, 1).unwrap();
    }
    broker.emit(X, 2).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_disarmed_guard_keeps_listener() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();

    let subscription = broker.on(X, listener).into_guard().disarm();
    broker.emit(X, 1).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(subscription.is_active());

    subscription.unsubscribe();
    broker.emit(X, 2).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_subscription_outlives_broker() {
    let broker = EventBroker::<TestEvents>::new();
    let subscription = broker.on(Ping, |_: &()| {});
    drop(broker);

    assert!(!subscription.is_active());
    subscription.unsubscribe();
}

#[test]
fn test_clones_share_state() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();

    broker.clone().on(X, listener);
    broker.emit(X, 1).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Re-entrancy
// ============================================================================

#[test]
fn test_listener_may_emit_on_same_broker() {
    let broker = EventBroker::<TestEvents>::new();
    let trace = Trace::default();

    let inner = broker.clone();
    let sink = trace.clone();
    broker.on(X, move |n: &i32| {
        sink.push(format!("x:{n}"));
        if *n > 0 {
            inner.emit(X, n - 1).unwrap();
        }
    });

    broker.emit(X, 2).unwrap();
    assert_eq!(trace.entries(), ["x:2", "x:1", "x:0"]);
}

#[test]
fn test_listener_added_during_emit_waits_for_next_emit() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, late) = counter();
    let late = Listener::<X>::new(late);

    let inner = broker.clone();
    broker.on(X, move |_: &i32| {
        inner.on(X, late.clone());
    });

    broker.emit(X, 1).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    broker.emit(X, 2).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_listener_removed_during_emit_still_runs_this_time() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, second) = counter();
    let second = Listener::<X>::new(second);

    let inner = broker.clone();
    let target = second.clone();
    broker.on(X, move |_: &i32| inner.off(X, &target));
    broker.on(X, second);

    broker.emit(X, 1).unwrap();
    broker.emit(X, 2).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Error policy
// ============================================================================

#[test]
fn test_listener_error_does_not_stop_others() {
    let broker = EventBroker::<TestEvents>::new();
    let (count, listener) = counter();

    broker.on(X, |_: &i32| -> Result<(), BoxError> { Err("boom".into()) });
    broker.on(X, listener);

    let (result, logs) = capture_logs(|| broker.emit(X, 1));
    assert!(result.is_ok());
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(logs.contains("EventFlow error: Error in event listener for x: boom"));
}

#[test]
fn test_stop_escalates_to_caller() {
    let broker = create_event_broker::<TestEvents>(
        BrokerOptions::new().error_policy(ErrorPolicy::uniform(PolicyAction::Stop)),
    );
    let (count, listener) = counter();

    broker.on(X, |_: &i32| -> Result<(), BoxError> { Err("boom".into()) });
    broker.on(X, listener);

    let err = broker.emit(X, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Listener);
    assert_eq!(err.event(), "x");
    assert_eq!(err.inner().to_string(), "boom");
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stop_then_emit_continue_is_handled_once() {
    let broker = create_event_broker::<TestEvents>(
        BrokerOptions::new().error_policy(ErrorPolicy::new().on_listener_error(PolicyMode::Stop)),
    );
    let (count, listener) = counter();

    broker.on(X, |_: &i32| -> Result<(), BoxError> { Err("boom".into()) });
    broker.on(X, listener);

    let (result, logs) = capture_logs(|| broker.emit(X, 1));
    assert!(result.is_ok());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(logs.matches("EventFlow error").count(), 1);
    assert!(logs.contains("Error in event emit for x: boom"));
}

#[test]
fn test_custom_handler_receives_error_and_event() {
    let calls = Trace::default();
    let sink = calls.clone();
    let policy = ErrorPolicy::new().on_listener_error(PolicyAction::custom(move |err, event| {
        sink.push(format!("{}:{}:{}", err.kind(), event.name(), err.inner()));
    }));
    let broker = create_event_broker::<TestEvents>(BrokerOptions::new().error_policy(policy));
    let (count, listener) = counter();

    broker.on(X, |_: &i32| -> Result<(), BoxError> { Err("bad input".into()) });
    broker.on(X, listener);

    broker.emit(X, 7).unwrap();
    assert_eq!(calls.entries(), ["listener:x:bad input"]);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_custom_emit_handler_sees_escalation_once() {
    let calls = Trace::default();
    let sink = calls.clone();
    let policy = ErrorPolicy::new()
        .on_listener_error(PolicyMode::Stop)
        .on_emit_error(PolicyAction::custom(move |err, _| {
            sink.push(err.kind().to_string());
        }));
    let broker = create_event_broker::<TestEvents>(BrokerOptions::new().error_policy(policy));

    broker.on(X, |_: &i32| -> Result<(), BoxError> { Err("boom".into()) });

    assert!(broker.emit(X, 1).is_ok());
    assert_eq!(calls.entries(), ["listener"]);
}

#[test]
fn test_fallback_handler_is_stored_but_unused() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&calls);
    let broker = create_event_broker::<TestEvents>(BrokerOptions::new().error_handler(Arc::new(
        move |_: &DispatchError, _: &EventEnvelope| {
            handle.fetch_add(1, Ordering::SeqCst);
        },
    )));

    broker.on(X, |_: &i32| -> Result<(), BoxError> { Err("boom".into()) });
    broker.emit(X, 1).unwrap();

    assert!(broker.fallback_handler().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Leak warning
// ============================================================================

#[test]
fn test_max_listeners_warning() {
    let broker = create_event_broker::<TestEvents>(BrokerOptions::new().max_listeners(1));
    let (first_count, first) = counter();
    let (second_count, second) = counter();

    let (_, logs) = capture_logs(|| broker.on(X, first));
    assert!(!logs.contains("MaxListenersExceeded"));

    let (_, logs) = capture_logs(|| broker.on(X, second));
    assert!(logs.contains("MaxListenersExceeded"));
    assert!(logs.contains("2 listeners added for event 'x'"));

    broker.emit(X, 1).unwrap();
    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_max_listeners_zero_disables_warning() {
    let broker = create_event_broker::<TestEvents>(BrokerOptions::new().max_listeners(0));

    let (_, logs) = capture_logs(|| {
        for _ in 0..20 {
            broker.on(Ping, |_: &()| {});
        }
    });

    assert_eq!(broker.listener_count(Ping), 20);
    assert!(!logs.contains("MaxListenersExceeded"));
}
