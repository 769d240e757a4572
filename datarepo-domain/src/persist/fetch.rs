use super::data_source::DataSource;
use crate::entity::{Entity, Reference};
use crate::error::DomainResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// 关联抓取器
///
/// 对一批已加载的实体一次性补齐某条关联路径（如 `team`），
/// 查询声明的抓取路径与实体图都通过它执行。
#[async_trait]
pub trait AssociationFetcher<E: Entity>: Send + Sync {
    /// 关联路径
    fn path(&self) -> &str;

    async fn fetch(&self, entities: &mut [E]) -> DomainResult<()>;
}

/// 多对一关联：收集外键后按标识批量读取
pub struct ManyToOne<E: Entity, T: Entity> {
    path: String,
    source: Arc<dyn DataSource<T>>,
    reference: fn(&mut E) -> &mut Reference<T>,
}

impl<E: Entity, T: Entity> ManyToOne<E, T> {
    pub fn new(
        path: impl Into<String>,
        source: Arc<dyn DataSource<T>>,
        reference: fn(&mut E) -> &mut Reference<T>,
    ) -> Self {
        Self {
            path: path.into(),
            source,
            reference,
        }
    }
}

#[async_trait]
impl<E: Entity, T: Entity> AssociationFetcher<E> for ManyToOne<E, T> {
    fn path(&self) -> &str {
        &self.path
    }

    async fn fetch(&self, entities: &mut [E]) -> DomainResult<()> {
        let mut ids: Vec<T::Id> = entities
            .iter_mut()
            .filter_map(|e| (self.reference)(e).id().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }

        let loaded: HashMap<T::Id, T> = self
            .source
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .filter_map(|t| t.id().cloned().map(|id| (id, t)))
            .collect();

        for entity in entities.iter_mut() {
            let reference = (self.reference)(entity);
            if let Some(target) = reference.id().and_then(|id| loaded.get(id)) {
                reference.load(target.clone());
            }
        }

        tracing::trace!(
            entity = E::TYPE,
            path = %self.path,
            keys = ids.len(),
            loaded = loaded.len(),
            "association fetched"
        );
        Ok(())
    }
}
