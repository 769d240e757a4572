use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, Result, parse_macro_input};

/// #[projection] 宏实现
/// 为具名字段或 tuple struct 生成 `FromTuple`：字段声明顺序即投影列顺序，
/// 每列经 `FromValue` 转换；并合并派生 Debug, Clone。
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[projection] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let input = parse_macro_input!(item as Item);
    match expand_struct(input) {
        Ok(out) => out.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_struct(input: Item) -> Result<TokenStream2> {
    let mut st = match input {
        Item::Struct(s) => s,
        other => return Err(syn::Error::new(other.span(), "#[projection] only on struct")),
    };

    apply_derives(
        &mut st.attrs,
        vec![syn::parse_quote!(Debug), syn::parse_quote!(Clone)],
    )?;

    let column = quote! {
        ::datarepo_domain::value::FromValue::from_value(
            ::core::iter::Iterator::next(&mut columns).unwrap_or_default(),
        )?
    };

    let (arity, construct) = match &st.fields {
        syn::Fields::Named(named) => {
            let idents = named.named.iter().filter_map(|f| f.ident.as_ref());
            let columns = idents.clone().map(|_| column.clone());
            (
                named.named.len(),
                quote! { Self { #( #idents: #columns, )* } },
            )
        }
        syn::Fields::Unnamed(unnamed) => {
            let columns = unnamed.unnamed.iter().map(|_| column.clone());
            (unnamed.unnamed.len(), quote! { Self( #( #columns, )* ) })
        }
        syn::Fields::Unit => {
            return Err(syn::Error::new(
                st.span(),
                "#[projection] needs at least one field",
            ));
        }
    };

    let ident = &st.ident;
    let type_name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    Ok(quote! {
        #st

        impl #impl_generics ::datarepo_domain::query::FromTuple for #ident #ty_generics #where_clause {
            const ARITY: usize = #arity;

            fn from_tuple(
                values: ::std::vec::Vec<::datarepo_domain::value::Value>,
            ) -> ::datarepo_domain::error::DomainResult<Self> {
                ::datarepo_domain::query::expect_arity(#type_name, #arity, &values)?;
                let mut columns = ::std::iter::IntoIterator::into_iter(values);
                ::std::result::Result::Ok(#construct)
            }
        }
    })
}
