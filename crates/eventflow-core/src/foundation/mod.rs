//! Foundation layer: the event map contract, envelope, and error vocabulary.

pub mod error;
pub mod event;
pub mod policy;

pub use error::{BoxError, DispatchError, DispatchResult, ErrorKind, EventFlowError};
pub use event::{Event, EventEnvelope, EventMap, Payload};
pub use policy::{ErrorHandler, ErrorPolicy, PolicyAction, PolicyMode};
