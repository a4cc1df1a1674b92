// #[js_type] macro: generates a JsType impl and an inventory registration
// from the #[js(...)] methods of an impl block.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{parse2, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, ReturnType, Token, Type};

use crate::naming::to_camel_case;

// ---------------------------------------------------------------------------
// Parsed member info
// ---------------------------------------------------------------------------

#[derive(Default)]
struct JsAttr {
    method: bool,
    field: bool,
    name: Option<String>,
    getter: Option<Option<String>>,
    setter: Option<Option<String>>,
}

struct MethodInfo {
    js_name: String,
    ident: Ident,
    is_static: bool,
}

struct Accessor {
    ident: Ident,
    value_ty: Type,
}

struct AccessorGroup {
    js_name: String,
    span: Span,
    getter: Option<Accessor>,
    setter: Option<Accessor>,
    field: bool,
}

// ---------------------------------------------------------------------------
// Main expansion
// ---------------------------------------------------------------------------

pub fn expand_js_type(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let input: ItemImpl = parse2(item)?;

    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(path, "#[js_type] goes on an inherent impl block"));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[js_type] types must be concrete; generic impls cannot be registered",
        ));
    }

    let self_ty = &input.self_ty;
    let type_ident = match &**self_ty {
        Type::Path(tp) => tp
            .path
            .segments
            .last()
            .ok_or_else(|| syn::Error::new_spanned(self_ty, "expected type name"))?
            .ident
            .clone(),
        _ => return Err(syn::Error::new_spanned(self_ty, "expected type name")),
    };
    let js_name = parse_type_name(attr)?.unwrap_or_else(|| type_ident.to_string());

    // Classify methods: collect #[js] info, then strip attrs
    let mut methods: Vec<MethodInfo> = Vec::new();
    let mut groups: Vec<AccessorGroup> = Vec::new();
    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            for attr in method.attrs.iter().filter(|a| a.path().is_ident("js")) {
                let parsed = parse_js_attr(attr)?;
                classify(method, parsed, attr, &mut methods, &mut groups)?;
            }
        }
    }

    let mut clean_impl = input.clone();
    for item in &mut clean_impl.items {
        if let ImplItem::Fn(method) = item {
            method.attrs.retain(|a| !a.path().is_ident("js"));
        }
    }

    let rt = quote! { ::jsbridge::runtime };

    let mut chain: Vec<TokenStream> = Vec::new();
    for m in &methods {
        let name = &m.js_name;
        let ident = &m.ident;
        chain.push(if m.is_static {
            quote! { .method(#rt::MethodMember::host_static(#name, <#self_ty>::#ident)) }
        } else {
            quote! { .method(#rt::MethodMember::host(#name, <#self_ty>::#ident)) }
        });
    }
    for group in &groups {
        let name = &group.js_name;
        let value_ty = match (&group.getter, &group.setter) {
            (Some(get), _) => &get.value_ty,
            (None, Some(set)) => &set.value_ty,
            (None, None) => continue,
        };
        let get = match &group.getter {
            Some(g) => {
                let ident = &g.ident;
                quote! {
                    ::core::option::Option::Some(<#self_ty>::#ident as fn(&#self_ty) -> #value_ty)
                }
            }
            None => quote! { ::core::option::Option::None },
        };
        let set = match &group.setter {
            Some(s) => {
                let ident = &s.ident;
                quote! {
                    ::core::option::Option::Some(<#self_ty>::#ident as fn(&#self_ty, #value_ty))
                }
            }
            None => quote! { ::core::option::Option::None },
        };
        let prop = quote! { #rt::HostProperty::<#self_ty, #value_ty>::new(#get, #set) };
        chain.push(if group.field {
            quote! { .field(#rt::FieldMember::with_accessors(#name, #prop)) }
        } else {
            quote! { .property(#rt::PropertyMember::from_host_property(#name, #prop)) }
        });
    }

    Ok(quote! {
        #clean_impl

        impl #rt::JsType for #self_ty {
            fn type_definition() -> #rt::BridgeResult<::std::rc::Rc<#rt::TypeDefinition>> {
                #rt::TypeDefinition::builder(#js_name)
                    #(#chain)*
                    .build()
            }
        }

        ::jsbridge::__inventory::submit! {
            #rt::JsTypeRegistration {
                name: #js_name,
                type_id: ::std::any::TypeId::of::<#self_ty>,
                type_definition: <#self_ty as #rt::JsType>::type_definition,
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Attribute parsing
// ---------------------------------------------------------------------------

fn parse_type_name(attr: TokenStream) -> syn::Result<Option<String>> {
    let mut name = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse::<LitStr>()?.value());
            Ok(())
        } else {
            Err(meta.error("unknown js_type argument; expected `name = \"...\"`"))
        }
    });
    syn::parse::Parser::parse2(parser, attr)?;
    Ok(name)
}

fn parse_js_attr(attr: &syn::Attribute) -> syn::Result<JsAttr> {
    let mut out = JsAttr::default();
    attr.parse_nested_meta(|meta| {
        let optional_name = |meta: &syn::meta::ParseNestedMeta<'_>| -> syn::Result<Option<String>> {
            if meta.input.peek(Token![=]) {
                Ok(Some(meta.value()?.parse::<LitStr>()?.value()))
            } else {
                Ok(None)
            }
        };
        if meta.path.is_ident("method") {
            out.method = true;
        } else if meta.path.is_ident("field") {
            out.field = true;
        } else if meta.path.is_ident("name") {
            out.name = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if meta.path.is_ident("getter") {
            out.getter = Some(optional_name(&meta)?);
        } else if meta.path.is_ident("setter") {
            out.setter = Some(optional_name(&meta)?);
        } else {
            return Err(meta.error(
                "unknown js attribute; expected `method`, `name`, `getter`, `setter` or `field`",
            ));
        }
        Ok(())
    })?;
    Ok(out)
}

fn classify(
    method: &ImplItemFn,
    attr: JsAttr,
    span_of: &syn::Attribute,
    methods: &mut Vec<MethodInfo>,
    groups: &mut Vec<AccessorGroup>,
) -> syn::Result<()> {
    let roles = attr.method as u8 + attr.getter.is_some() as u8 + attr.setter.is_some() as u8;
    if roles != 1 {
        return Err(syn::Error::new_spanned(
            span_of,
            "a #[js] attribute needs exactly one of `method`, `getter` or `setter`",
        ));
    }

    let ident = method.sig.ident.clone();
    let has_self = receiver(method)?;
    let params = typed_params(method);

    if attr.method {
        if attr.field {
            return Err(syn::Error::new_spanned(span_of, "`field` applies to getters and setters"));
        }
        methods.push(MethodInfo {
            js_name: attr.name.unwrap_or_else(|| to_camel_case(&ident.to_string())),
            ident,
            is_static: !has_self,
        });
        return Ok(());
    }
    if attr.name.is_some() {
        return Err(syn::Error::new_spanned(
            span_of,
            "accessors take their name from `getter = \"...\"` or `setter = \"...\"`",
        ));
    }
    if !has_self {
        return Err(syn::Error::new_spanned(&method.sig, "accessors take `&self`"));
    }

    let (js_name, is_getter, value_ty) = if let Some(name) = attr.getter {
        let value_ty = match &method.sig.output {
            ReturnType::Type(_, ty) if !is_unit(ty) => (**ty).clone(),
            _ => return Err(syn::Error::new_spanned(&method.sig, "getters must return a value")),
        };
        if !params.is_empty() {
            return Err(syn::Error::new_spanned(&method.sig.inputs, "getters take no arguments"));
        }
        let name = name.unwrap_or_else(|| to_camel_case(&ident.to_string()));
        (name, true, value_ty)
    } else {
        let name = attr.setter.flatten();
        let value_ty = match params.as_slice() {
            [ty] => ty.clone(),
            _ => {
                return Err(syn::Error::new_spanned(
                    &method.sig.inputs,
                    "setters take exactly one argument after `&self`",
                ));
            }
        };
        if let ReturnType::Type(_, ty) = &method.sig.output {
            if !is_unit(ty) {
                return Err(syn::Error::new_spanned(ty, "setters return nothing"));
            }
        }
        let raw = ident.to_string();
        let name = name.unwrap_or_else(|| to_camel_case(raw.strip_prefix("set_").unwrap_or(&raw)));
        (name, false, value_ty)
    };

    let index = match groups.iter().position(|g| g.js_name == js_name) {
        Some(index) => index,
        None => {
            groups.push(AccessorGroup {
                js_name: js_name.clone(),
                span: ident.span(),
                getter: None,
                setter: None,
                field: false,
            });
            groups.len() - 1
        }
    };
    let group = &mut groups[index];
    group.field |= attr.field;
    let slot = if is_getter { &mut group.getter } else { &mut group.setter };
    if slot.is_some() {
        let which = if is_getter { "getter" } else { "setter" };
        return Err(syn::Error::new(
            group.span,
            format!("`{js_name}` already has a {which}"),
        ));
    }
    *slot = Some(Accessor { ident, value_ty });
    Ok(())
}

/// `true` for `&self`, `false` for associated functions.
fn receiver(method: &ImplItemFn) -> syn::Result<bool> {
    match method.sig.inputs.first() {
        Some(FnArg::Receiver(r)) => {
            if r.reference.is_none() || r.mutability.is_some() || r.colon_token.is_some() {
                Err(syn::Error::new_spanned(
                    r,
                    "script members take `&self`; keep mutable state behind Cell or RefCell",
                ))
            } else {
                Ok(true)
            }
        }
        _ => Ok(false),
    }
}

fn typed_params(method: &ImplItemFn) -> Vec<Type> {
    method
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat_type) => Some((*pat_type.ty).clone()),
            FnArg::Receiver(_) => None,
        })
        .collect()
}

fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}
