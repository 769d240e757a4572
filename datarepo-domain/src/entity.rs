//! 实体（Entity）基础抽象
//!
//! 统一实体的标识、类型名与“新建/已存在”判定：
//! - 代理键（`Generated`）：标识未分配即为新实体；
//! - 自然键（`Assigned`）：标识由调用方提供，改用审计字段 `created_at` 是否为空判定，
//!   避免每次保存前的存在性查询。
//!
//! 关联通过 [`Reference`] 表达：只持有外键，只有调用方显式请求抓取时才会被加载，
//! 不存在隐式代理与延迟加载。
//!
use crate::audit::AuditMetadata;
use crate::error::DomainResult;
use crate::record::{Record, read_only_field};
use crate::value::{FromValue, IntoValue, Value};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// 主键分配策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// 由数据源在插入时分配（序列）
    Generated,
    /// 由调用方在创建时给定
    Assigned,
}

/// 具备唯一标识的持久化实体
pub trait Entity: Record + Clone + Send + Sync + 'static {
    /// 实体类型名（命名查询以 `TYPE.method` 查找）
    const TYPE: &'static str;

    /// 主键分配策略
    const KEY_STRATEGY: KeyStrategy;

    /// 实体标识类型
    type Id: Clone
        + Eq
        + Ord
        + Hash
        + Debug
        + Display
        + Send
        + Sync
        + IntoValue
        + FromValue
        + 'static;

    /// 获取实体标识；代理键未分配时为 `None`
    fn id(&self) -> Option<&Self::Id>;

    /// 设置实体标识（由数据源在插入时回填）
    fn set_id(&mut self, id: Self::Id);

    /// 审计元数据（未启用审计的实体返回 `None`）
    fn audit(&self) -> Option<&AuditMetadata> {
        None
    }

    fn audit_mut(&mut self) -> Option<&mut AuditMetadata> {
        None
    }

    /// 是否为新实体（决定 insert 还是 update），不访问存储
    fn is_new(&self) -> bool {
        match Self::KEY_STRATEGY {
            KeyStrategy::Generated => self.id().is_none(),
            KeyStrategy::Assigned => self.audit().is_none_or(AuditMetadata::is_new),
        }
    }
}

/// 多对一关联引用
///
/// 始终持有外键；被引用实体只有在抓取（fetch）后才可通过 [`Reference::get`] 访问。
pub struct Reference<T: Entity> {
    id: Option<T::Id>,
    loaded: Option<Box<T>>,
}

impl<T: Entity> Reference<T> {
    /// 空引用
    pub fn none() -> Self {
        Self {
            id: None,
            loaded: None,
        }
    }

    /// 仅持有外键的引用
    pub fn to(id: T::Id) -> Self {
        Self {
            id: Some(id),
            loaded: None,
        }
    }

    /// 由已保存实体构造（已加载状态）
    pub fn of(entity: &T) -> Self {
        Self {
            id: entity.id().cloned(),
            loaded: Some(Box::new(entity.clone())),
        }
    }

    pub fn id(&self) -> Option<&T::Id> {
        self.id.as_ref()
    }

    /// 已加载的被引用实体；未抓取时为 `None`
    pub fn get(&self) -> Option<&T> {
        self.loaded.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.id.is_none()
    }

    /// 填充被引用实体（抓取器调用）
    pub fn load(&mut self, entity: T) {
        self.id = entity.id().cloned();
        self.loaded = Some(Box::new(entity));
    }

    /// 卸载被引用实体，仅保留外键
    pub fn unload(&mut self) {
        self.loaded = None;
    }
}

impl<T: Entity> Default for Reference<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Entity> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            loaded: self.loaded.clone(),
        }
    }
}

impl<T: Entity + Debug> Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.loaded {
            Some(entity) => f.debug_tuple("Reference").field(entity).finish(),
            None => f
                .debug_struct("Reference")
                .field("id", &self.id)
                .field("loaded", &false)
                .finish(),
        }
    }
}

impl<T: Entity> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: Entity> Record for Reference<T> {
    fn has_path(path: &str) -> bool {
        path == "id" || T::has_path(path)
    }

    fn field(&self, path: &str) -> Option<Value> {
        if path == "id" {
            return Some(self.id.clone().into_value());
        }
        self.loaded.as_ref().and_then(|e| e.field(path))
    }

    fn set_field(&mut self, path: &str, value: Value) -> DomainResult<()> {
        if path == "id" {
            self.id = Option::<T::Id>::from_value(value)?;
            self.loaded = None;
            return Ok(());
        }
        Err(read_only_field(T::TYPE, path))
    }
}
