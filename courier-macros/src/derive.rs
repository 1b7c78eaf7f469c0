//! `#[derive(Listener)]`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, Path, Token, parse_macro_input, punctuated::Punctuated};

/// Options collected from `#[listener(...)]`.
#[derive(Default)]
struct ListenerArgs {
    implements: Vec<Path>,
    deferred: Option<bool>,
    name: Option<LitStr>,
}

fn parse_args(input: &DeriveInput) -> syn::Result<ListenerArgs> {
    let mut args = ListenerArgs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("listener") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                let content;
                syn::parenthesized!(content in meta.input);
                let paths = Punctuated::<Path, Token![,]>::parse_terminated(&content)?;
                args.implements.extend(paths);
                Ok(())
            } else if meta.path.is_ident("deferred") {
                args.deferred = Some(true);
                Ok(())
            } else if meta.path.is_ident("sync") {
                args.deferred = Some(false);
                Ok(())
            } else if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error(
                    "unknown listener option, expected `implements(..)`, `sync`, `deferred` or `name`",
                ))
            }
        })?;
    }

    if args.implements.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "a listener must declare its interfaces with `#[listener(implements(..))]`",
        ));
    }
    Ok(args)
}

/// Derive macro for implementing the `Listener` trait.
pub fn derive_listener_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let args = match parse_args(&input) {
        Ok(args) => args,
        Err(error) => return error.to_compile_error().into(),
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let casts = args.implements.iter().map(|interface| {
        quote! {
            caps.implements::<dyn #interface>(|listener| {
                let handle: ::std::sync::Weak<dyn #interface> = listener;
                handle
            });
        }
    });

    let delivery_mode = args.deferred.map(|deferred| {
        let mode = if deferred {
            quote! { ::courier::DeliveryMode::Deferred }
        } else {
            quote! { ::courier::DeliveryMode::Sync }
        };
        quote! {
            fn delivery_mode(&self) -> ::courier::DeliveryMode {
                #mode
            }
        }
    });

    let listener_name = args.name.map(|name| {
        quote! {
            fn name(&self) -> &'static str {
                #name
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics ::courier::Listener for #ident #ty_generics #where_clause {
            fn capabilities(caps: &mut ::courier::Capabilities<Self>) {
                #(#casts)*
            }

            #delivery_mode

            #listener_name
        }
    };

    TokenStream::from(expanded)
}
