//! Procedural macros for EventFlow.
//!
//! This crate provides:
//!
//! - `#[derive(EventMap)]` - Turns a struct of payload fields into an event map
//!   plus one typed key per event
//!
//! # EventMap Derive Macro
//!
//! ```rust,ignore
//! use eventflow_macros::EventMap;
//!
//! #[derive(EventMap)]
//! pub struct AppEvents {
//!     /// Fired after a successful sign-in.
//!     user_login: User,
//!     #[event(name = "cart:add")]
//!     cart_add: Item,
//!     #[event(key = "Logout")]
//!     user_logout: (),
//! }
//!
//! // Generated keys: `UserLogin`, `CartAdd`, `Logout`.
//! broker.emit(CartAdd, item)?;
//! ```

mod event_map;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `EventMap` for a struct with named fields.
///
/// For every field this generates a unit key struct (same visibility as the
/// map) implementing `Event`, with the field type as payload.
///
/// # Attributes
///
/// - `#[event_map(crate = "...")]` - Path to the core crate (default: `::eventflow_core`)
/// - `#[event(name = "...")]` - Override the event name (default: the field name)
/// - `#[event(key = "...")]` - Override the key type name (default: PascalCase field name)
///
/// Duplicate event names or key names are compile errors.
#[proc_macro_derive(EventMap, attributes(event_map, event))]
pub fn derive_event_map(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match event_map::derive_event_map(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
