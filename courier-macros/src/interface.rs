//! Listener interface macro.
//!
//! `#[listener]` on a trait emits:
//! - the trait itself, with `Send + Sync + 'static` supertraits and the
//!   `#[courier(...)]` markers removed
//! - `impl courier::Interface for dyn Trait`, the method eligibility table
//! - `impl Trait for courier::Proxy<dyn Trait>`, the dispatch proxy

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    Attribute, FnArg, GenericArgument, Ident, ItemTrait, LitStr, Pat, PatIdent, PathArguments,
    ReturnType, Token, TraitItem, TraitItemFn, Type, TypeParamBound,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse_macro_input, parse_quote,
    spanned::Spanned,
};

/// Arguments for the `#[listener]` macro.
pub(crate) struct InterfaceArgs {
    /// Only methods marked `#[courier(dispatch)]` are forwarded.
    pub explicit: bool,
    /// Interface name used in logs and errors. Defaults to the trait name.
    pub name: Option<LitStr>,
}

impl Parse for InterfaceArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut explicit = false;
        let mut name = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;

            match ident.to_string().as_str() {
                "explicit" => explicit = true,
                "name" => {
                    input.parse::<Token![=]>()?;
                    name = Some(input.parse()?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(InterfaceArgs { explicit, name })
    }
}

#[derive(Clone, Copy)]
enum DeliverOverride {
    Sync,
    Deferred,
}

/// The `#[courier(...)]` markers of one method.
#[derive(Default)]
struct Markers {
    ignore: Option<Span>,
    dispatch: Option<Span>,
    deliver: Option<(DeliverOverride, Span)>,
}

/// Remove the `#[courier(...)]` attributes from `attrs` and parse them.
fn take_markers(attrs: &mut Vec<Attribute>) -> syn::Result<Markers> {
    let mut markers = Markers::default();
    let mut kept = Vec::with_capacity(attrs.len());

    for attr in std::mem::take(attrs) {
        if !attr.path().is_ident("courier") {
            kept.push(attr);
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ignore") {
                markers.ignore = Some(meta.path.span());
                Ok(())
            } else if meta.path.is_ident("dispatch") {
                markers.dispatch = Some(meta.path.span());
                Ok(())
            } else if meta.path.is_ident("deliver") {
                let lit: LitStr = meta.value()?.parse()?;
                let mode = match lit.value().as_str() {
                    "sync" => DeliverOverride::Sync,
                    "deferred" => DeliverOverride::Deferred,
                    _ => {
                        return Err(syn::Error::new(
                            lit.span(),
                            "expected `\"sync\"` or `\"deferred\"`",
                        ));
                    }
                };
                markers.deliver = Some((mode, lit.span()));
                Ok(())
            } else {
                Err(meta.error("unknown marker, expected `ignore`, `dispatch` or `deliver`"))
            }
        })?;
    }

    *attrs = kept;
    Ok(markers)
}

/// How a method's return type is handled by the proxy.
enum Returns {
    /// `()` or no return type.
    Unit,
    /// `Result<(), E>`.
    UnitResult,
    /// Any other `Result<T, E>`.
    OtherResult,
    /// Anything else.
    Other,
}

fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}

fn classify(output: &ReturnType) -> Returns {
    let ty = match output {
        ReturnType::Default => return Returns::Unit,
        ReturnType::Type(_, ty) => &**ty,
    };
    if is_unit(ty) {
        return Returns::Unit;
    }

    let Type::Path(path) = ty else {
        return Returns::Other;
    };
    let Some(last) = path.path.segments.last() else {
        return Returns::Other;
    };
    if path.qself.is_some() || last.ident != "Result" {
        return Returns::Other;
    }
    match &last.arguments {
        PathArguments::AngleBracketed(args) if args.args.len() == 2 => {
            match args.args.first() {
                Some(GenericArgument::Type(ok)) if is_unit(ok) => Returns::UnitResult,
                _ => Returns::OtherResult,
            }
        }
        _ => Returns::OtherResult,
    }
}

/// One analysed interface method.
struct Method {
    index: usize,
    dispatchable: bool,
    deliver: Option<DeliverOverride>,
    returns: Returns,
}

fn analyse(method: &mut TraitItemFn, index: usize, explicit: bool) -> syn::Result<Method> {
    let markers = take_markers(&mut method.attrs)?;
    let sig = &method.sig;

    if let (Some(span), Some(_)) = (markers.ignore, markers.dispatch) {
        return Err(syn::Error::new(
            span,
            "a method cannot be both `ignore` and `dispatch`",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "listener interface methods cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "listener interface methods cannot be generic",
        ));
    }
    match sig.receiver() {
        Some(receiver)
            if receiver.reference.is_some()
                && receiver.mutability.is_none()
                && receiver.colon_token.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                "listener interface methods must take `&self`",
            ));
        }
    }

    let dispatchable = if explicit {
        markers.dispatch.is_some()
    } else {
        markers.ignore.is_none()
    };
    let returns = classify(&sig.output);

    if dispatchable {
        if !matches!(returns, Returns::Unit | Returns::UnitResult) {
            return Err(syn::Error::new_spanned(
                &sig.output,
                "dispatchable listener methods must return `()` or `Result<(), E>`; \
                 mark the method `#[courier(ignore)]` to keep it out of dispatch",
            ));
        }
        for input in &sig.inputs {
            let FnArg::Typed(arg) = input else { continue };
            match &*arg.ty {
                Type::Reference(_) => {
                    return Err(syn::Error::new_spanned(
                        &arg.ty,
                        "dispatchable method arguments must be owned values \
                         (`Clone + Send + Sync + 'static`)",
                    ));
                }
                Type::ImplTrait(_) => {
                    return Err(syn::Error::new_spanned(
                        &arg.ty,
                        "listener interface methods cannot be generic",
                    ));
                }
                _ => {}
            }
        }
    } else if let Some((_, span)) = markers.deliver {
        return Err(syn::Error::new(
            span,
            "`deliver` has no effect on a method that is not dispatched",
        ));
    }

    Ok(Method {
        index,
        dispatchable,
        deliver: markers.deliver.map(|(mode, _)| mode),
        returns,
    })
}

fn descriptor(method: &TraitItemFn, analysed: &Method) -> TokenStream2 {
    let name = method.sig.ident.unraw().to_string();
    let base = if analysed.dispatchable {
        quote! { ::courier::MethodDescriptor::dispatchable(#name) }
    } else {
        quote! { ::courier::MethodDescriptor::ignored(#name) }
    };
    match analysed.deliver {
        Some(DeliverOverride::Sync) => {
            quote! { #base.with_delivery(::courier::DeliveryMode::Sync) }
        }
        Some(DeliverOverride::Deferred) => {
            quote! { #base.with_delivery(::courier::DeliveryMode::Deferred) }
        }
        None => base,
    }
}

fn proxy_method(trait_ident: &Ident, method: &TraitItemFn, analysed: &Method) -> TokenStream2 {
    let mut sig = method.sig.clone();
    let mut args = Vec::new();
    for input in sig.inputs.iter_mut() {
        if let FnArg::Typed(arg) = input {
            let ident = format_ident!("__arg{}", args.len());
            arg.attrs.clear();
            *arg.pat = Pat::Ident(PatIdent {
                attrs: Vec::new(),
                by_ref: None,
                mutability: None,
                ident: ident.clone(),
                subpat: None,
            });
            args.push(ident);
        }
    }

    let method_ident = &sig.ident;
    let index = analysed.index;
    let call = quote! {
        #trait_ident::#method_ident(listener, #(::core::clone::Clone::clone(&#args)),*)
    };

    let body = match (analysed.dispatchable, &analysed.returns) {
        (true, Returns::UnitResult) => quote! {
            ::courier::Proxy::dispatch(self, #index, move |listener| {
                #call.map_err(::core::convert::Into::into)
            })
            .map_err(::core::convert::From::from)
        },
        (true, _) => quote! {
            if let ::core::result::Result::Err(error) =
                ::courier::Proxy::dispatch(self, #index, move |listener| {
                    #call;
                    ::core::result::Result::Ok(())
                })
            {
                ::courier::Proxy::report(self, error);
            }
        },
        (false, Returns::UnitResult | Returns::OtherResult) => quote! {
            ::core::result::Result::Err(::core::convert::From::from(
                ::courier::Proxy::reject(self, #index),
            ))
        },
        (false, _) => quote! {
            ::core::panic!("{}", ::courier::Proxy::reject(self, #index))
        },
    };

    let allow = (!analysed.dispatchable).then(|| quote! { #[allow(unused_variables)] });
    quote! {
        #allow
        #sig {
            #body
        }
    }
}

fn ensure_supertraits(item: &mut ItemTrait) {
    let has_trait = |name: &str| {
        item.supertraits.iter().any(|bound| match bound {
            TypeParamBound::Trait(bound) => bound
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == name),
            _ => false,
        })
    };
    let has_static = item.supertraits.iter().any(|bound| {
        matches!(bound, TypeParamBound::Lifetime(lifetime) if lifetime.ident == "static")
    });

    let mut missing: Vec<TypeParamBound> = Vec::new();
    if !has_trait("Send") {
        missing.push(parse_quote!(::core::marker::Send));
    }
    if !has_trait("Sync") {
        missing.push(parse_quote!(::core::marker::Sync));
    }
    if !has_static {
        missing.push(parse_quote!('static));
    }
    if missing.is_empty() {
        return;
    }
    if item.colon_token.is_none() {
        item.colon_token = Some(Default::default());
    }
    item.supertraits.extend(missing);
}

fn expand(args: InterfaceArgs, mut item: ItemTrait) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "listener interfaces cannot be generic",
        ));
    }
    if let Some(unsafety) = &item.unsafety {
        return Err(syn::Error::new_spanned(
            unsafety,
            "listener interfaces cannot be unsafe traits",
        ));
    }

    ensure_supertraits(&mut item);

    let trait_ident = item.ident.clone();
    let name = match args.name {
        Some(name) => name,
        None => LitStr::new(&trait_ident.unraw().to_string(), trait_ident.span()),
    };

    let mut descriptors = Vec::new();
    let mut proxies = Vec::new();
    for trait_item in item.items.iter_mut() {
        match trait_item {
            TraitItem::Fn(method) => {
                let analysed = analyse(method, descriptors.len(), args.explicit)?;
                descriptors.push(descriptor(method, &analysed));
                proxies.push(proxy_method(&trait_ident, method, &analysed));
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "listener interfaces may only contain methods",
                ));
            }
        }
    }

    Ok(quote! {
        #item

        impl ::courier::Interface for dyn #trait_ident {
            const NAME: &'static str = #name;
            const METHODS: &'static [::courier::MethodDescriptor] = &[#(#descriptors),*];
        }

        impl #trait_ident for ::courier::Proxy<dyn #trait_ident> {
            #(#proxies)*
        }
    })
}

pub(crate) fn listener_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as InterfaceArgs);
    let item = parse_macro_input!(item as ItemTrait);

    match expand(args, item) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(error) => error.to_compile_error().into(),
    }
}
