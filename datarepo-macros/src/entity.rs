use crate::derive_utils::apply_derives;
use crate::field_utils::{FieldKind, ensure_leading_fields, take_field_kind};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Ident, Item, LitBool, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

/// #[entity] 宏实现
/// - 补齐 `id`（以及启用审计时的 `audit`）字段并置于最前
/// - 合并派生 `Debug`（可关闭）与 `Clone`
/// - 生成 `::datarepo_domain::entity::Entity` 与 `::datarepo_domain::record::Record` 实现
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);
    match expand_struct(cfg, input) {
        Ok(out) => out.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Generated,
    Assigned,
}

fn expand_struct(cfg: EntityAttrConfig, input: Item) -> Result<TokenStream2> {
    let mut st = match input {
        Item::Struct(s) => s,
        other => return Err(syn::Error::new(other.span(), "#[entity] only on struct")),
    };

    let key = cfg.key.unwrap_or(KeyKind::Generated);
    let audit = cfg.audit.unwrap_or(key == KeyKind::Assigned);
    if key == KeyKind::Assigned && !audit {
        return Err(syn::Error::new(
            Span::call_site(),
            "key = assigned needs audit metadata to decide whether an entity is new",
        ));
    }
    let id_type: Type = cfg.id_ty.unwrap_or_else(|| syn::parse_quote! { i64 });
    let type_name = cfg
        .name
        .map(|lit| lit.value())
        .unwrap_or_else(|| st.ident.to_string());

    let st_span = st.span();
    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => return Err(syn::Error::new(st_span, "only supports named-field struct")),
    };

    // 按字段选项分类；id/audit 由宏管理
    let mut columns: Vec<Ident> = Vec::new();
    let mut associations: Vec<(Ident, Type)> = Vec::new();
    for field in fields_named.named.iter_mut() {
        let kind = take_field_kind(field)?;
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        if ident == "id" || ident == "audit" {
            continue;
        }
        match kind {
            FieldKind::Column => columns.push(ident),
            FieldKind::Association => associations.push((ident, field.ty.clone())),
            FieldKind::Skip => {}
        }
    }

    let id_field_ty: Type = match key {
        KeyKind::Generated => syn::parse_quote! { ::core::option::Option<#id_type> },
        KeyKind::Assigned => id_type.clone(),
    };
    let audit_ty: Type = syn::parse_quote! { ::datarepo_domain::audit::AuditMetadata };
    let mut leading: Vec<(&str, &Type)> = vec![("id", &id_field_ty)];
    if audit {
        leading.push(("audit", &audit_ty));
    }
    ensure_leading_fields(fields_named, &leading);

    let mut derives: Vec<syn::Path> = vec![syn::parse_quote!(Clone)];
    if cfg.derive_debug.unwrap_or(true) {
        derives.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, derives)?;

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let column_names: Vec<String> = columns.iter().map(|i| i.to_string()).collect();
    let assoc_idents: Vec<&Ident> = associations.iter().map(|(i, _)| i).collect();
    let assoc_names: Vec<String> = assoc_idents.iter().map(|i| i.to_string()).collect();
    let assoc_tys: Vec<&Type> = associations.iter().map(|(_, t)| t).collect();

    let (key_variant, id_getter, id_setter) = match key {
        KeyKind::Generated => (
            quote! { Generated },
            quote! { self.id.as_ref() },
            quote! { self.id = ::core::option::Option::Some(id); },
        ),
        KeyKind::Assigned => (
            quote! { Assigned },
            quote! { ::core::option::Option::Some(&self.id) },
            quote! { self.id = id; },
        ),
    };

    let (audit_methods, audit_has, audit_get, audit_set) = if audit {
        (
            quote! {
                fn audit(&self) -> ::core::option::Option<&::datarepo_domain::audit::AuditMetadata> {
                    ::core::option::Option::Some(&self.audit)
                }

                fn audit_mut(&mut self) -> ::core::option::Option<&mut ::datarepo_domain::audit::AuditMetadata> {
                    ::core::option::Option::Some(&mut self.audit)
                }
            },
            quote! {
                (head, ::core::option::Option::None) => {
                    <#audit_ty as ::datarepo_domain::record::Record>::has_path(head)
                }
            },
            quote! {
                (head, ::core::option::Option::None) => {
                    ::datarepo_domain::record::Record::field(&self.audit, head)
                }
            },
            quote! {
                (head, ::core::option::Option::None)
                    if <#audit_ty as ::datarepo_domain::record::Record>::has_path(head) =>
                {
                    ::datarepo_domain::record::Record::set_field(&mut self.audit, head, value)
                }
            },
        )
    } else {
        (quote! {}, quote! {}, quote! {}, quote! {})
    };

    Ok(quote! {
        #st

        impl #impl_generics ::datarepo_domain::entity::Entity for #ident #ty_generics #where_clause {
            const TYPE: &'static str = #type_name;
            const KEY_STRATEGY: ::datarepo_domain::entity::KeyStrategy =
                ::datarepo_domain::entity::KeyStrategy::#key_variant;

            type Id = #id_type;

            fn id(&self) -> ::core::option::Option<&Self::Id> {
                #id_getter
            }

            fn set_id(&mut self, id: Self::Id) {
                #id_setter
            }

            #audit_methods
        }

        impl #impl_generics ::datarepo_domain::record::Record for #ident #ty_generics #where_clause {
            fn has_path(path: &str) -> bool {
                match ::datarepo_domain::record::split_path(path) {
                    ("id", ::core::option::Option::None) => true,
                    #( (#column_names, ::core::option::Option::None) => true, )*
                    #(
                        (#assoc_names, ::core::option::Option::None) => true,
                        (#assoc_names, ::core::option::Option::Some(rest)) => {
                            <#assoc_tys as ::datarepo_domain::record::Record>::has_path(rest)
                        }
                    )*
                    #audit_has
                    _ => false,
                }
            }

            fn field(&self, path: &str) -> ::core::option::Option<::datarepo_domain::value::Value> {
                match ::datarepo_domain::record::split_path(path) {
                    ("id", ::core::option::Option::None) => ::core::option::Option::Some(
                        ::datarepo_domain::value::IntoValue::into_value(::core::clone::Clone::clone(&self.id)),
                    ),
                    #(
                        (#column_names, ::core::option::Option::None) => ::core::option::Option::Some(
                            ::datarepo_domain::value::IntoValue::into_value(
                                ::core::clone::Clone::clone(&self.#columns),
                            ),
                        ),
                    )*
                    #(
                        (#assoc_names, ::core::option::Option::None) => {
                            ::datarepo_domain::record::Record::field(&self.#assoc_idents, "id")
                        }
                        (#assoc_names, ::core::option::Option::Some(rest)) => {
                            ::datarepo_domain::record::Record::field(&self.#assoc_idents, rest)
                        }
                    )*
                    #audit_get
                    _ => ::core::option::Option::None,
                }
            }

            fn set_field(
                &mut self,
                path: &str,
                value: ::datarepo_domain::value::Value,
            ) -> ::datarepo_domain::error::DomainResult<()> {
                match ::datarepo_domain::record::split_path(path) {
                    ("id", ::core::option::Option::None) => {
                        self.id = ::datarepo_domain::value::FromValue::from_value(value)?;
                        ::core::result::Result::Ok(())
                    }
                    #(
                        (#column_names, ::core::option::Option::None) => {
                            self.#columns = ::datarepo_domain::value::FromValue::from_value(value)?;
                            ::core::result::Result::Ok(())
                        }
                    )*
                    #(
                        (#assoc_names, ::core::option::Option::None) => {
                            ::datarepo_domain::record::Record::set_field(&mut self.#assoc_idents, "id", value)
                        }
                        (#assoc_names, ::core::option::Option::Some(rest)) => {
                            ::datarepo_domain::record::Record::set_field(&mut self.#assoc_idents, rest, value)
                        }
                    )*
                    #audit_set
                    _ => ::core::result::Result::Err(::datarepo_domain::record::unknown_field(
                        <Self as ::datarepo_domain::entity::Entity>::TYPE,
                        path,
                    )),
                }
            }
        }
    })
}

// -------- parsing --------

#[derive(Default)]
struct EntityAttrConfig {
    id_ty: Option<Type>,
    key: Option<KeyKind>,
    audit: Option<bool>,
    name: Option<LitStr>,
    derive_debug: Option<bool>,
}

fn set_once<T>(slot: &mut Option<T>, value: T, key: &Ident) -> Result<()> {
    if slot.replace(value).is_some() {
        return Err(syn::Error::new(
            key.span(),
            format!("duplicate key '{key}' in attribute"),
        ));
    }
    Ok(())
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self::default();
        if input.is_empty() {
            return Ok(cfg);
        }

        let elems: Punctuated<EntityAttrElem, Token![,]> =
            Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                EntityAttrElem::Id(key, ty) => set_once(&mut cfg.id_ty, *ty, &key)?,
                EntityAttrElem::Key(key, kind) => set_once(&mut cfg.key, kind, &key)?,
                EntityAttrElem::Audit(key, b) => set_once(&mut cfg.audit, b, &key)?,
                EntityAttrElem::Name(key, lit) => set_once(&mut cfg.name, lit, &key)?,
                EntityAttrElem::Debug(key, b) => set_once(&mut cfg.derive_debug, b, &key)?,
            }
        }

        Ok(cfg)
    }
}

enum EntityAttrElem {
    Id(Ident, Box<Type>),
    Key(Ident, KeyKind),
    Audit(Ident, bool),
    Name(Ident, LitStr),
    Debug(Ident, bool),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        match key.to_string().as_str() {
            "id" => {
                let ty: Type = input.parse()?;
                Ok(EntityAttrElem::Id(key, Box::new(ty)))
            }
            "key" => {
                let value: Ident = input.parse()?;
                let kind = match value.to_string().as_str() {
                    "generated" => KeyKind::Generated,
                    "assigned" => KeyKind::Assigned,
                    _ => {
                        return Err(syn::Error::new(
                            value.span(),
                            "expected 'generated' | 'assigned'",
                        ));
                    }
                };
                Ok(EntityAttrElem::Key(key, kind))
            }
            "audit" => {
                let b: LitBool = input.parse()?;
                Ok(EntityAttrElem::Audit(key, b.value))
            }
            "name" => {
                let lit: LitStr = input.parse()?;
                Ok(EntityAttrElem::Name(key, lit))
            }
            "debug" => {
                let b: LitBool = input.parse()?;
                Ok(EntityAttrElem::Debug(key, b.value))
            }
            _ => Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'id' | 'key' | 'audit' | 'name' | 'debug'",
            )),
        }
    }
}
