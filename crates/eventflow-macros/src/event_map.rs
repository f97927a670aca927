//! `#[derive(EventMap)]` implementation.
//!
//! # Struct-level attributes `#[event_map(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `crate` | `"eventflow::core"` | Path the generated code uses for the core crate |
//!
//! # Field-level attributes `#[event(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `name` | `"cart:add"` | Event name used by the broker |
//! | `key` | `"AddToCart"` | Name of the generated key type |

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, Path, Type, spanned::Spanned};

// ============================================================================
// Attribute structures
// ============================================================================

/// Per-field `#[event(...)]` values.
#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    key: Option<String>,
}

/// One event of the map, ready for code generation.
struct EventDef {
    name: String,
    key: Ident,
    payload: Type,
    docs: Vec<Attribute>,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_event_map(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "EventMap cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "EventMap requires a struct with named fields",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(syn::Error::new(
                input.span(),
                "EventMap does not support enums. Use a struct with one field per event.",
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "EventMap cannot be derived for unions",
            ));
        }
    };

    let krate = parse_crate_path(&input.attrs)?;
    let events = collect_events(fields.named.iter())?;

    Ok(generate(input, &krate, &events))
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_crate_path(attrs: &[Attribute]) -> syn::Result<Path> {
    let mut krate: Option<Path> = None;

    for attr in attrs {
        if !attr.path().is_ident("event_map") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let lit = meta.value()?.parse::<syn::LitStr>()?;
                krate = Some(lit.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown #[event_map] key, expected `crate`"))
            }
        })?;
    }

    Ok(krate.unwrap_or_else(|| syn::parse_quote!(::eventflow_core)))
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                result.name = Some(meta.value()?.parse::<syn::LitStr>()?.value());
            } else if meta.path.is_ident("key") {
                result.key = Some(meta.value()?.parse::<syn::LitStr>()?.value());
            } else {
                return Err(meta.error("unknown #[event] key, expected `name` or `key`"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn collect_events<'a>(fields: impl Iterator<Item = &'a syn::Field>) -> syn::Result<Vec<EventDef>> {
    let mut events = Vec::new();
    let mut seen_names = HashSet::new();
    let mut seen_keys = HashSet::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        let field_name = ident.to_string().trim_start_matches("r#").to_string();

        let name = attrs.name.unwrap_or_else(|| field_name.clone());
        if name.is_empty() {
            return Err(syn::Error::new(field.span(), "event name cannot be empty"));
        }
        if !seen_names.insert(name.clone()) {
            return Err(syn::Error::new(
                field.span(),
                format!("duplicate event name `{name}`"),
            ));
        }

        let key_name = attrs.key.unwrap_or_else(|| to_pascal_case(&field_name));
        if syn::parse_str::<Ident>(&key_name).is_err() {
            return Err(syn::Error::new(
                field.span(),
                format!("`{key_name}` is not a valid key name"),
            ));
        }
        if !seen_keys.insert(key_name.clone()) {
            return Err(syn::Error::new(
                field.span(),
                format!("duplicate event key `{key_name}`"),
            ));
        }

        let docs = field
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident("doc"))
            .cloned()
            .collect();

        events.push(EventDef {
            name,
            key: Ident::new(&key_name, ident.span()),
            payload: field.ty.clone(),
            docs,
        });
    }

    Ok(events)
}

/// `user_login` -> `UserLogin`.
fn to_pascal_case(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

// ============================================================================
// Code generation
// ============================================================================

fn generate(input: &DeriveInput, krate: &Path, events: &[EventDef]) -> TokenStream {
    let map = &input.ident;
    let vis = &input.vis;
    let names = events.iter().map(|event| &event.name);

    let keys = events.iter().map(|event| {
        let EventDef {
            name,
            key,
            payload,
            docs,
        } = event;
        let summary = format!("Key for the `{name}` event of [`{map}`].");
        let doc_attrs = if docs.is_empty() {
            quote! { #[doc = #summary] }
        } else {
            quote! { #(#docs)* }
        };

        quote! {
            #doc_attrs
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
            #vis struct #key;

            impl #krate::Event for #key {
                type Map = #map;
                type Payload = #payload;
                const NAME: &'static str = #name;
            }
        }
    });

    quote! {
        impl #krate::EventMap for #map {
            const EVENT_NAMES: &'static [&'static str] = &[#(#names),*];
        }

        #(#keys)*
    }
}
