use crate::entity::Entity;
use crate::error::DomainResult;
use crate::paging::{Page, PageRequest, Sort};
use crate::persist::Session;
use crate::specification::Specification;
use async_trait::async_trait;
use std::sync::Arc;

/// 通用 CRUD 仓储
///
/// 所有操作都在调用方提供的会话内执行：写入会纳入标识映射，
/// 按标识读取优先命中标识映射。
#[async_trait]
pub trait CrudRepository<E: Entity>: Send + Sync {
    /// 新实体插入，已有实体合并；首次持久化与每次更新前写入审计字段
    async fn save(&self, session: &Session, entity: E) -> DomainResult<E>;

    async fn save_all(&self, session: &Session, entities: Vec<E>) -> DomainResult<Vec<E>>;

    async fn find_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<Option<E>>;

    /// 不存在时返回 `NotFound`
    async fn get_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<E>;

    async fn exists_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<bool>;

    async fn find_all(&self, session: &Session) -> DomainResult<Vec<E>>;

    async fn find_all_sorted(&self, session: &Session, sort: &Sort) -> DomainResult<Vec<E>>;

    async fn find_all_paged(&self, session: &Session, request: &PageRequest)
    -> DomainResult<Page<E>>;

    /// 缺失的标识被忽略
    async fn find_all_by_ids(&self, session: &Session, ids: &[E::Id]) -> DomainResult<Vec<E>>;

    async fn count(&self, session: &Session) -> DomainResult<u64>;

    async fn delete(&self, session: &Session, entity: &E) -> DomainResult<()>;

    /// 不存在时静默返回
    async fn delete_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<()>;

    /// 返回删除的行数
    async fn delete_all(&self, session: &Session) -> DomainResult<u64>;
}

/// 规约查询
#[async_trait]
pub trait SpecificationExecutor<E: Entity>: Send + Sync {
    async fn find_all_matching(
        &self,
        session: &Session,
        spec: &dyn Specification<E>,
        sort: &Sort,
    ) -> DomainResult<Vec<E>>;

    async fn find_page_matching(
        &self,
        session: &Session,
        spec: &dyn Specification<E>,
        request: &PageRequest,
    ) -> DomainResult<Page<E>>;

    async fn count_matching(&self, session: &Session, spec: &dyn Specification<E>)
    -> DomainResult<u64>;

    async fn exists_matching(
        &self,
        session: &Session,
        spec: &dyn Specification<E>,
    ) -> DomainResult<bool>;
}

#[async_trait]
impl<E, T> CrudRepository<E> for Arc<T>
where
    E: Entity,
    T: CrudRepository<E> + ?Sized,
{
    async fn save(&self, session: &Session, entity: E) -> DomainResult<E> {
        (**self).save(session, entity).await
    }

    async fn save_all(&self, session: &Session, entities: Vec<E>) -> DomainResult<Vec<E>> {
        (**self).save_all(session, entities).await
    }

    async fn find_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<Option<E>> {
        (**self).find_by_id(session, id).await
    }

    async fn get_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<E> {
        (**self).get_by_id(session, id).await
    }

    async fn exists_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<bool> {
        (**self).exists_by_id(session, id).await
    }

    async fn find_all(&self, session: &Session) -> DomainResult<Vec<E>> {
        (**self).find_all(session).await
    }

    async fn find_all_sorted(&self, session: &Session, sort: &Sort) -> DomainResult<Vec<E>> {
        (**self).find_all_sorted(session, sort).await
    }

    async fn find_all_paged(
        &self,
        session: &Session,
        request: &PageRequest,
    ) -> DomainResult<Page<E>> {
        (**self).find_all_paged(session, request).await
    }

    async fn find_all_by_ids(&self, session: &Session, ids: &[E::Id]) -> DomainResult<Vec<E>> {
        (**self).find_all_by_ids(session, ids).await
    }

    async fn count(&self, session: &Session) -> DomainResult<u64> {
        (**self).count(session).await
    }

    async fn delete(&self, session: &Session, entity: &E) -> DomainResult<()> {
        (**self).delete(session, entity).await
    }

    async fn delete_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<()> {
        (**self).delete_by_id(session, id).await
    }

    async fn delete_all(&self, session: &Session) -> DomainResult<u64> {
        (**self).delete_all(session).await
    }
}
