//! Procedural macros for Courier.
//!
//! This crate provides:
//! - `#[listener]` - Attribute macro turning a trait into a listener interface
//! - `#[derive(Listener)]` - Derive macro declaring which interfaces a type implements

use proc_macro::TokenStream;

mod derive;
mod interface;

/// Turn a trait into a listener interface.
///
/// Generates the method eligibility table (`impl courier::Interface for dyn Trait`)
/// and the dispatch proxy (`impl Trait for courier::Proxy<dyn Trait>`).
///
/// # Method markers
///
/// - `#[courier(ignore)]`: proxies never forward this method.
/// - `#[courier(dispatch)]`: forward this method; required for every
///   forwarded method when the trait is declared `#[listener(explicit)]`.
/// - `#[courier(deliver = "sync" | "deferred")]`: force the delivery mode
///   of this method regardless of the listener's own mode.
///
/// # Example
///
/// ```rust,ignore
/// #[courier::listener]
/// pub trait Click {
///     fn on_click(&self, x: i32);
///
///     #[courier(deliver = "deferred")]
///     fn on_long_press(&self, x: i32) -> Result<(), MyError>;
///
///     #[courier(ignore)]
///     fn describe(&self) -> String;
/// }
/// ```
#[proc_macro_attribute]
pub fn listener(attr: TokenStream, item: TokenStream) -> TokenStream {
    interface::listener_impl(attr, item)
}

/// Derive macro for implementing the `Listener` trait.
///
/// ```rust,ignore
/// #[derive(courier::Listener)]
/// #[listener(implements(Click, Scroll), deferred, name = "toolbar")]
/// struct Toolbar;
/// ```
#[proc_macro_derive(Listener, attributes(listener))]
pub fn derive_listener(input: TokenStream) -> TokenStream {
    derive::derive_listener_impl(input)
}
