use quote::ToTokens;
use syn::{Attribute, Path, Token, punctuated::Punctuated};

// 归一化 derive 的 key：`Clone` 与 `std::clone::Clone` 视为同一项
fn derive_key(p: &Path) -> String {
    p.segments
        .last()
        .map(|last| last.ident.to_string())
        .unwrap_or_else(|| p.to_token_stream().to_string())
}

/// 把默认派生合并进已有的 `#[derive(..)]`（去重，默认项在前），其余属性原样保留
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<Path>) -> syn::Result<()> {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.drain(..) {
        if attr.path().is_ident("derive") {
            let list = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)?;
            existing.extend(list);
        } else {
            retained.push(attr);
        }
    }

    let mut seen = std::collections::HashSet::<String>::new();
    let merged: Vec<Path> = required
        .into_iter()
        .chain(existing)
        .filter(|p| seen.insert(derive_key(p)))
        .collect();

    *attrs = std::iter::once(syn::parse_quote!(#[derive(#(#merged),*)]))
        .chain(retained)
        .collect();
    Ok(())
}
