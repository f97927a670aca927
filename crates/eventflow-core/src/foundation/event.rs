//! Event map contract for EventFlow.
//!
//! This module provides the typed vocabulary every broker is built on:
//!
//! - [`EventMap`] - Marker trait for a set of events a broker accepts
//! - [`Event`] - A typed key naming one event of a map and its payload type
//! - [`Payload`] - Object-safe view of any payload (`Any + Debug`)
//! - [`EventEnvelope`] - The `{name, data}` pair seen by middleware and error handlers
//!
//! # Typed Keys
//!
//! Event maps are usually declared with `#[derive(EventMap)]`, which turns every
//! field into a key type:
//!
//! ```rust,ignore
//! use eventflow_macros::EventMap;
//!
//! #[derive(EventMap)]
//! pub struct AppEvents {
//!     user_login: User,
//!     #[event(name = "cart:add")]
//!     cart_add: Item,
//! }
//!
//! // Generated: `UserLogin` and `CartAdd` key types.
//! broker.emit(UserLogin, user)?;
//! ```

use std::any::Any;
use std::fmt;

// ============================================================================
// Event Map Contract
// ============================================================================

/// A set of events accepted by one broker.
///
/// The map itself carries no data; it only ties [`Event`] keys together so a
/// broker for `AppEvents` rejects keys of any other map at compile time.
pub trait EventMap: 'static {
    /// Names of every event in this map, in declaration order.
    const EVENT_NAMES: &'static [&'static str];
}

/// A typed key naming a single event of an [`EventMap`].
///
/// Keys are zero-sized marker values; `NAME` is the string key the broker
/// stores listeners under, and `Payload` is the type listeners receive.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Copy)]
/// pub struct UserLogin;
///
/// impl Event for UserLogin {
///     type Map = AppEvents;
///     type Payload = User;
///     const NAME: &'static str = "user_login";
/// }
/// ```
pub trait Event: 'static {
    /// The map this key belongs to.
    type Map: EventMap;

    /// The data carried by this event.
    type Payload: fmt::Debug + 'static;

    /// The event name used as registry key and in diagnostics.
    const NAME: &'static str;
}

// ============================================================================
// Type-erased Payload
// ============================================================================

/// Object-safe view of an event payload.
///
/// Automatically implemented for every `'static` type that implements `Debug`.
pub trait Payload: Any + fmt::Debug {
    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + fmt::Debug> Payload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Event Envelope
// ============================================================================

/// An event in flight: its name plus the emitted data.
///
/// One envelope is created per `emit` call and handed by mutable reference
/// through the middleware chain, so a middleware may swap or edit the payload
/// before listeners see it. The name is fixed for the whole emission.
pub struct EventEnvelope {
    name: &'static str,
    payload: Box<dyn Payload>,
}

impl EventEnvelope {
    /// Creates a new envelope.
    pub fn new<P: Payload>(name: &'static str, payload: P) -> Self {
        Self {
            name,
            payload: Box::new(payload),
        }
    }

    /// Returns the event name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the payload as a trait object.
    pub fn payload(&self) -> &dyn Payload {
        &*self.payload
    }

    /// Returns the payload if it is of type `T`.
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        (*self.payload).as_any().downcast_ref::<T>()
    }

    /// Returns the payload mutably if it is of type `T`.
    pub fn payload_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        (*self.payload).as_any_mut().downcast_mut::<T>()
    }

    /// Returns `true` if the payload is of type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        (*self.payload).as_any().is::<T>()
    }

    /// Replaces the payload, returning the previous one.
    pub fn replace_payload<P: Payload>(&mut self, payload: P) -> Box<dyn Payload> {
        std::mem::replace(&mut self.payload, Box::new(payload))
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("name", &self.name)
            .field("payload", &self.payload)
            .finish()
    }
}
