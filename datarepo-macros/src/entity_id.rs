use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, LitBool, Result, parse_macro_input};

/// #[entity_id] 宏实现
/// 仅支持单字段 tuple struct，用作 `Entity::Id`：
/// - 合并派生：Clone, Debug（`debug = false` 可关闭）, PartialEq, Eq, PartialOrd, Ord, Hash
/// - 提供 new(value)、Display、FromStr、From 以及与 `Value` 的双向转换
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let derive_debug = if attr.is_empty() {
        true
    } else {
        let parser = |input: syn::parse::ParseStream| -> Result<bool> {
            let key: syn::Ident = input.parse()?;
            if key != "debug" {
                return Err(syn::Error::new(key.span(), "unknown key; expected 'debug'"));
            }
            let _eq: syn::Token![=] = input.parse()?;
            let b: LitBool = input.parse()?;
            Ok(b.value)
        };
        parse_macro_input!(attr with parser)
    };
    let input = parse_macro_input!(item as Item);
    match expand_struct(input, derive_debug) {
        Ok(out) => out.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_struct(input: Item, derive_debug: bool) -> Result<TokenStream2> {
    let mut st = match input {
        Item::Struct(s) => s,
        other => return Err(syn::Error::new(other.span(), "#[entity_id] only on struct")),
    };

    let inner_ty = match &st.fields {
        syn::Fields::Unnamed(f) if f.unnamed.len() == 1 => f.unnamed[0].ty.clone(),
        syn::Fields::Unnamed(f) => {
            return Err(syn::Error::new(
                f.span(),
                "#[entity_id] requires a tuple struct with exactly one field",
            ));
        }
        _ => {
            return Err(syn::Error::new(
                st.span(),
                "#[entity_id] supports only tuple struct, e.g., struct X(String);",
            ));
        }
    };

    let mut required: Vec<syn::Path> = vec![
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(Eq),
        syn::parse_quote!(PartialOrd),
        syn::parse_quote!(Ord),
        syn::parse_quote!(Hash),
    ];
    if derive_debug {
        required.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, required)?;

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    Ok(quote! {
        #st

        impl #impl_generics #ident #ty_generics #where_clause {
            pub fn new(value: #inner_ty) -> Self { Self(value) }

            pub fn value(&self) -> &#inner_ty { &self.0 }
        }

        impl #impl_generics ::std::str::FromStr for #ident #ty_generics #where_clause
        where #inner_ty: ::std::str::FromStr
        {
            type Err = <#inner_ty as ::std::str::FromStr>::Err;
            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let inner: #inner_ty = s.parse()?;
                ::std::result::Result::Ok(Self(inner))
            }
        }

        impl #impl_generics ::std::fmt::Display for #ident #ty_generics #where_clause
        where #inner_ty: ::std::fmt::Display
        {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl #impl_generics ::core::convert::From<#inner_ty> for #ident #ty_generics #where_clause {
            fn from(value: #inner_ty) -> Self { Self(value) }
        }

        impl #impl_generics ::datarepo_domain::value::IntoValue for #ident #ty_generics #where_clause
        where #inner_ty: ::datarepo_domain::value::IntoValue
        {
            fn into_value(self) -> ::datarepo_domain::value::Value {
                ::datarepo_domain::value::IntoValue::into_value(self.0)
            }
        }

        impl #impl_generics ::datarepo_domain::value::FromValue for #ident #ty_generics #where_clause
        where #inner_ty: ::datarepo_domain::value::FromValue
        {
            fn from_value(
                value: ::datarepo_domain::value::Value,
            ) -> ::datarepo_domain::error::DomainResult<Self> {
                ::std::result::Result::Ok(Self(
                    <#inner_ty as ::datarepo_domain::value::FromValue>::from_value(value)?,
                ))
            }
        }
    })
}
