use syn::spanned::Spanned;
use syn::{Field, FieldsNamed, Token, Type, punctuated::Punctuated};

fn is_named(field: &Field, name: &str) -> bool {
    field.ident.as_ref().map(|i| i == name).unwrap_or(false)
}

/// 确保具名字段结构体包含所需字段，并按给定顺序置于最前
/// - 已存在的同名字段原样复用（不校验其类型）
/// - 其余字段保持原始相对顺序
pub(crate) fn ensure_leading_fields(fields_named: &mut FieldsNamed, required: &[(&str, &Type)]) {
    let old_named = fields_named.named.clone();
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    for (name, ty) in required.iter() {
        match old_named.iter().find(|f| is_named(f, name)) {
            Some(existing) => new_named.push(existing.clone()),
            None => {
                let ident = syn::Ident::new(name, proc_macro2::Span::call_site());
                new_named.push(syn::parse_quote! { #ident: #ty });
            }
        }
    }

    for f in old_named.into_iter() {
        if !required.iter().any(|(n, _)| is_named(&f, n)) {
            new_named.push(f);
        }
    }

    fields_named.named = new_named;
}

/// 字段级选项：`#[field(skip)]`、`#[field(association)]`
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    #[default]
    Column,
    Association,
    Skip,
}

/// 解析并移除字段上的 `#[field(..)]` 属性
pub(crate) fn take_field_kind(field: &mut Field) -> syn::Result<FieldKind> {
    let mut kind: Option<FieldKind> = None;
    let mut retained = Vec::with_capacity(field.attrs.len());

    for attr in field.attrs.drain(..) {
        if !attr.path().is_ident("field") {
            retained.push(attr);
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let parsed = if meta.path.is_ident("skip") {
                FieldKind::Skip
            } else if meta.path.is_ident("association") {
                FieldKind::Association
            } else {
                return Err(meta.error("unknown key; expected 'skip' | 'association'"));
            };
            if kind.replace(parsed).is_some() {
                return Err(meta.error("conflicting #[field] options"));
            }
            Ok(())
        })?;
    }

    field.attrs = retained;
    if kind == Some(FieldKind::Association) && field.ident.as_ref().is_some_and(|i| i == "id") {
        return Err(syn::Error::new(field.span(), "'id' cannot be an association"));
    }
    Ok(kind.unwrap_or_default())
}
