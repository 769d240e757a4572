use super::data_source::{DataSource, RowLock};
use crate::audit::AuditorAware;
use crate::entity::Entity;
use crate::error::DomainResult;
use crate::query::LockMode;
use bon::Builder;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// 会话上下文
#[derive(Builder, Default, Debug, Clone)]
pub struct SessionContext {
    /// 当前操作主体（写入审计字段）
    #[builder(into)]
    principal: Option<String>,
    /// 关联ID
    #[builder(into)]
    correlation_id: Option<String>,
}

impl SessionContext {
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

impl AuditorAware for SessionContext {
    fn current_auditor(&self) -> Option<String> {
        self.principal.clone()
    }
}

/// 类型擦除后的单类型标识映射
trait IdentityMap: Send + Sync {
    fn len(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K, V> IdentityMap for HashMap<K, V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

type AnyMap = HashMap<TypeId, Box<dyn IdentityMap>>;

/// 工作单元（会话）
///
/// - 标识映射：按实体类型维护 `id → 实体`，同一会话内重复按标识查找不会访问数据源；
/// - 行锁：悲观锁在会话关闭（或被丢弃）时释放；其他会话的写入需等待锁释放；
/// - 批量修改绕过标识映射，执行后由仓储自动清空映射。
pub struct Session {
    context: SessionContext,
    identity: Mutex<AnyMap>,
    locks: Mutex<Vec<RowLock>>,
    locked: Mutex<HashSet<(TypeId, String)>>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

impl Session {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            identity: Mutex::new(HashMap::new()),
            locks: Mutex::new(Vec::new()),
            locked: Mutex::new(HashSet::new()),
        }
    }

    /// 无主体的会话
    pub fn anonymous() -> Self {
        Self::new(SessionContext::default())
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    fn with_map<E: Entity, R>(&self, f: impl FnOnce(&mut HashMap<E::Id, E>) -> R) -> R {
        let mut maps = guard(&self.identity);
        let slot = maps
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(HashMap::<E::Id, E>::new()) as Box<dyn IdentityMap>);
        if !slot.as_any_mut().is::<HashMap<E::Id, E>>() {
            *slot = Box::new(HashMap::<E::Id, E>::new());
        }
        match slot.as_any_mut().downcast_mut::<HashMap<E::Id, E>>() {
            Some(map) => f(map),
            None => f(&mut HashMap::new()),
        }
    }

    /// 标识映射中的受管实例
    pub fn find<E: Entity>(&self, id: &E::Id) -> Option<E> {
        self.with_map::<E, _>(|map| map.get(id).cloned())
    }

    pub fn contains<E: Entity>(&self, id: &E::Id) -> bool {
        self.with_map::<E, _>(|map| map.contains_key(id))
    }

    /// 纳入（或替换）受管实例；无标识的实体被忽略
    pub fn attach<E: Entity>(&self, entity: &E) {
        if let Some(id) = entity.id() {
            let id = id.clone();
            self.with_map::<E, _>(|map| {
                map.insert(id, entity.clone());
            });
        }
    }

    /// 将查询结果与标识映射合并：已受管的标识返回受管实例，其余纳入映射
    pub fn merge<E: Entity>(&self, entities: Vec<E>) -> Vec<E> {
        self.with_map::<E, _>(|map| {
            entities
                .into_iter()
                .map(|e| match e.id() {
                    Some(id) => map.entry(id.clone()).or_insert(e).clone(),
                    None => e,
                })
                .collect()
        })
    }

    pub fn detach<E: Entity>(&self, id: &E::Id) {
        self.with_map::<E, _>(|map| {
            map.remove(id);
        });
    }

    /// 清空标识映射（所有实体类型）
    pub fn clear(&self) {
        guard(&self.identity).clear();
    }

    /// 受管实例总数
    pub fn managed_count(&self) -> usize {
        guard(&self.identity).values().map(|map| map.len()).sum()
    }

    /// 获取行锁并持有到会话结束；本会话已持有的行直接返回
    pub async fn lock<E: Entity>(
        &self,
        source: &dyn DataSource<E>,
        id: &E::Id,
        mode: LockMode,
        timeout: Duration,
    ) -> DomainResult<()> {
        if mode == LockMode::None {
            return Ok(());
        }
        let key = (TypeId::of::<E>(), id.to_string());
        if guard(&self.locked).contains(&key) {
            return Ok(());
        }
        let row = source.lock(id, mode, timeout).await?;
        tracing::trace!(entity = E::TYPE, id = %id, ?mode, "row lock acquired");
        guard(&self.locks).push(row);
        guard(&self.locked).insert(key);
        Ok(())
    }

    /// 写入前的行级写锁，仅在本次写入期间持有
    ///
    /// 本会话已持有该行的锁时返回 `None`；其他会话持有时等待至超时。
    pub async fn write_guard<E: Entity>(
        &self,
        source: &dyn DataSource<E>,
        id: &E::Id,
        timeout: Duration,
    ) -> DomainResult<Option<RowLock>> {
        let key = (TypeId::of::<E>(), id.to_string());
        if guard(&self.locked).contains(&key) {
            return Ok(None);
        }
        source
            .lock(id, LockMode::PessimisticWrite, timeout)
            .await
            .map(Some)
    }

    pub fn held_locks(&self) -> usize {
        guard(&self.locks).len()
    }

    /// 关闭会话：释放全部行锁并丢弃标识映射
    pub fn close(self) {
        tracing::debug!(
            locks = self.held_locks(),
            correlation_id = self.context.correlation_id(),
            "session closed"
        );
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}
