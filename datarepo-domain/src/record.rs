//! 记录（Record）
//!
//! 以路径（`"username"`、`"team.name"`）读写实体字段的统一视图。
//! 谓词求值、排序、投影与批量更新都只依赖此 trait；
//! `#[entity]` 宏会为实体自动生成实现。
//!
use crate::error::{DomainError, DomainResult};
use crate::value::Value;

/// 按路径访问字段
pub trait Record {
    /// 路径在该类型上是否存在（用于启动期校验查询中的属性）
    fn has_path(path: &str) -> bool
    where
        Self: Sized;

    /// 读取字段；路径不存在或关联未加载时返回 `None`
    fn field(&self, path: &str) -> Option<Value>;

    /// 写入字段（批量更新使用）
    fn set_field(&mut self, path: &str, value: Value) -> DomainResult<()>;
}

/// 只读字段被写入时的统一错误
pub fn read_only_field(entity: &str, path: &str) -> DomainError {
    DomainError::invalid_argument(format!("field '{path}' of {entity} is not writable"))
}

/// 未知字段的统一错误
pub fn unknown_field(entity: &str, path: &str) -> DomainError {
    DomainError::UnknownField {
        entity: entity.to_string(),
        path: path.to_string(),
    }
}

/// 将 `Record` 路径拆分为首段与剩余部分：`"team.name"` → `("team", Some("name"))`
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}
