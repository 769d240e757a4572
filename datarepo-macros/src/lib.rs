//! datarepo 过程宏
//!
//! - `#[entity]`：补齐标识/审计字段，生成 `Entity` 与按路径访问的 `Record` 实现；
//! - `#[entity_id]`：为单字段 tuple struct 形式的标识生成转换与格式化实现；
//! - `#[projection]`：为 DTO 生成按位置构造的 `FromTuple` 实现。
//!
use proc_macro::TokenStream;

mod derive_utils;
mod entity;
mod entity_id;
mod field_utils;
mod projection;

/// 实体宏
///
/// ```ignore
/// #[entity(id = i64, key = generated, audit = true, name = "Member")]
/// #[derive(Clone)]
/// struct Member {
///     username: String,
///     age: i32,
///     #[field(association)]
///     team: Reference<Team>,
/// }
/// ```
///
/// 参数：
/// - `id`：标识类型，默认 `i64`；
/// - `key`：`generated`（默认，追加 `id: Option<Id>`）或 `assigned`（追加 `id: Id`，必须启用审计）；
/// - `audit`：追加 `audit: AuditMetadata`，`assigned` 时默认开启；
/// - `name`：实体类型名，默认结构体名；
/// - `debug`：是否派生 `Debug`，默认 `true`。
///
/// 字段属性：`#[field(skip)]` 不参与路径访问；`#[field(association)]` 委托给关联的 `Record`。
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 实体标识宏
#[proc_macro_attribute]
pub fn entity_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_id::expand(attr, item)
}

/// 投影 DTO 宏：字段声明顺序即列顺序
#[proc_macro_attribute]
pub fn projection(attr: TokenStream, item: TokenStream) -> TokenStream {
    projection::expand(attr, item)
}
