//! 数据源协议
//!
//! 仓储只通过该 trait 访问存储；谓词与排序以 [`Specification`]/[`Sort`] 传入，
//! 数据源负责过滤、排序与窗口截取。具体后端（内存、数据库）由上层注入。
//!
use crate::entity::Entity;
use crate::error::DomainResult;
use crate::paging::Sort;
use crate::query::{Assignment, LockMode};
use crate::specification::Specification;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// 结果窗口：`offset` 起最多 `limit` 行
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Window {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first(limit: u64) -> Self {
        Self {
            offset: 0,
            limit: Some(limit),
        }
    }

    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }
}

/// 行锁守卫；释放即解锁
pub struct RowLock {
    _guard: Box<dyn Send + Sync>,
}

impl RowLock {
    pub fn new<G: Send + Sync + 'static>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for RowLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RowLock")
    }
}

#[async_trait]
pub trait DataSource<E: Entity>: Send + Sync {
    /// 插入新实体；代理键由数据源分配并回填
    async fn insert(&self, entity: E) -> DomainResult<E>;

    /// 合并已存在实体（不存在时插入）
    async fn update(&self, entity: E) -> DomainResult<E>;

    async fn find_by_id(&self, id: &E::Id) -> DomainResult<Option<E>>;

    /// 批量按标识读取（一次往返）
    async fn find_by_ids(&self, ids: &[E::Id]) -> DomainResult<Vec<E>>;

    async fn exists_by_id(&self, id: &E::Id) -> DomainResult<bool>;

    async fn select(
        &self,
        filter: &dyn Specification<E>,
        sort: &Sort,
        window: Window,
    ) -> DomainResult<Vec<E>>;

    async fn count(&self, filter: &dyn Specification<E>) -> DomainResult<u64>;

    async fn delete_by_id(&self, id: &E::Id) -> DomainResult<bool>;

    /// 批量更新：绕过会话直接写入，返回受影响行数
    async fn update_where(
        &self,
        filter: &dyn Specification<E>,
        assignments: &[Assignment],
    ) -> DomainResult<u64>;

    /// 获取行锁；超时返回 `ConcurrencyConflict`
    async fn lock(&self, id: &E::Id, mode: LockMode, timeout: Duration) -> DomainResult<RowLock>;
}

#[async_trait]
impl<E, T> DataSource<E> for Arc<T>
where
    E: Entity,
    T: DataSource<E> + ?Sized,
{
    async fn insert(&self, entity: E) -> DomainResult<E> {
        (**self).insert(entity).await
    }

    async fn update(&self, entity: E) -> DomainResult<E> {
        (**self).update(entity).await
    }

    async fn find_by_id(&self, id: &E::Id) -> DomainResult<Option<E>> {
        (**self).find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[E::Id]) -> DomainResult<Vec<E>> {
        (**self).find_by_ids(ids).await
    }

    async fn exists_by_id(&self, id: &E::Id) -> DomainResult<bool> {
        (**self).exists_by_id(id).await
    }

    async fn select(
        &self,
        filter: &dyn Specification<E>,
        sort: &Sort,
        window: Window,
    ) -> DomainResult<Vec<E>> {
        (**self).select(filter, sort, window).await
    }

    async fn count(&self, filter: &dyn Specification<E>) -> DomainResult<u64> {
        (**self).count(filter).await
    }

    async fn delete_by_id(&self, id: &E::Id) -> DomainResult<bool> {
        (**self).delete_by_id(id).await
    }

    async fn update_where(
        &self,
        filter: &dyn Specification<E>,
        assignments: &[Assignment],
    ) -> DomainResult<u64> {
        (**self).update_where(filter, assignments).await
    }

    async fn lock(&self, id: &E::Id, mode: LockMode, timeout: Duration) -> DomainResult<RowLock> {
        (**self).lock(id, mode, timeout).await
    }
}
