//! Render/request scopes carrying broker providers.
//!
//! A [`Scope`] is an immutable node in a tree. Providing a broker creates a
//! child node; lookups walk from a node towards the root and stop at the
//! nearest provider for the requested event map, so inner providers shadow
//! outer ones.
//!
//! ```text
//! root ─▶ provide(app) ─▶ child ─▶ provide(admin) ─▶ child
//!                           │                          │
//!                 use_event_broker::<App>    use_event_broker::<Admin>
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use eventflow_core::{EventBroker, EventMap};
use tracing::{debug, trace};

use crate::error::{ContextError, ContextResult};

type Provided = Box<dyn Any + Send + Sync>;

struct ScopeNode {
    parent: Option<Scope>,
    /// The provider installed at this node, if any.
    provider: Option<(TypeId, &'static str, Provided)>,
    depth: usize,
}

/// A scoped context through which components reach their broker.
///
/// Cloning a scope is cheap and yields the same node.
#[derive(Clone)]
pub struct Scope {
    node: Arc<ScopeNode>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Scope {
    /// Creates an empty root scope.
    pub fn root() -> Self {
        Self {
            node: Arc::new(ScopeNode {
                parent: None,
                provider: None,
                depth: 0,
            }),
        }
    }

    /// Creates a child scope without a provider of its own.
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Creates a child scope that provides `broker` to its descendants.
    pub fn provide<M: EventMap>(&self, broker: EventBroker<M>) -> Self {
        debug!(
            map = type_name::<M>(),
            depth = self.node.depth + 1,
            "Providing event broker"
        );
        self.derive(Some((TypeId::of::<M>(), type_name::<M>(), Box::new(broker))))
    }

    fn derive(&self, provider: Option<(TypeId, &'static str, Provided)>) -> Self {
        Self {
            node: Arc::new(ScopeNode {
                parent: Some(self.clone()),
                provider,
                depth: self.node.depth + 1,
            }),
        }
    }

    /// Returns the nearest broker provided for map `M`.
    pub fn use_event_broker<M: EventMap>(&self) -> ContextResult<EventBroker<M>> {
        self.ancestors()
            .find_map(|scope| {
                let (id, _, provided) = scope.node.provider.as_ref()?;
                if *id != TypeId::of::<M>() {
                    return None;
                }
                provided.downcast_ref::<EventBroker<M>>().cloned()
            })
            .ok_or_else(|| {
                trace!(map = type_name::<M>(), "No event broker provider in scope");
                ContextError::MissingProvider {
                    map: type_name::<M>(),
                }
            })
    }

    /// Returns `true` if a broker for map `M` is reachable.
    pub fn has_provider<M: EventMap>(&self) -> bool {
        self.use_event_broker::<M>().is_ok()
    }

    /// Returns the distance from the root.
    pub fn depth(&self) -> usize {
        self.node.depth
    }

    fn ancestors(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |scope| scope.node.parent.as_ref())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<&str> = self
            .ancestors()
            .filter_map(|scope| scope.node.provider.as_ref().map(|(_, name, _)| *name))
            .collect();
        f.debug_struct("Scope")
            .field("depth", &self.node.depth)
            .field("providers", &providers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventflow_core::Event;

    struct AppEvents;
    impl EventMap for AppEvents {
        const EVENT_NAMES: &'static [&'static str] = &["ping"];
    }

    struct OtherEvents;
    impl EventMap for OtherEvents {
        const EVENT_NAMES: &'static [&'static str] = &[];
    }

    #[derive(Clone, Copy)]
    struct Ping;
    impl Event for Ping {
        type Map = AppEvents;
        type Payload = u32;
        const NAME: &'static str = "ping";
    }

    #[test]
    fn test_missing_provider() {
        let err = Scope::root().use_event_broker::<AppEvents>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "useEventBroker must be used within an EventBrokerProvider"
        );
    }

    #[test]
    fn test_descendants_see_provider() {
        let broker = EventBroker::<AppEvents>::new();
        let scope = Scope::root().provide(broker.clone()).child().child();

        let found = scope.use_event_broker::<AppEvents>().unwrap();
        found.on(Ping, |_: &u32| {});
        assert_eq!(broker.listener_count(Ping), 1);
        assert_eq!(scope.depth(), 3);
    }

    #[test]
    fn test_inner_provider_shadows_outer() {
        let outer = EventBroker::<AppEvents>::new();
        let inner = EventBroker::<AppEvents>::new();
        let scope = Scope::root().provide(outer.clone()).provide(inner.clone());

        scope
            .use_event_broker::<AppEvents>()
            .unwrap()
            .on(Ping, |_: &u32| {});
        assert_eq!(inner.listener_count(Ping), 1);
        assert_eq!(outer.listener_count(Ping), 0);
    }

    #[test]
    fn test_providers_are_keyed_by_map() {
        let scope = Scope::root().provide(EventBroker::<AppEvents>::new());
        assert!(scope.has_provider::<AppEvents>());
        assert!(!scope.has_provider::<OtherEvents>());
    }

    #[test]
    fn test_parent_does_not_see_child_provider() {
        let root = Scope::root();
        let _child = root.provide(EventBroker::<AppEvents>::new());
        assert!(!root.has_provider::<AppEvents>());
    }
}
