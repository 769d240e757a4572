use super::data_source::{DataSource, RowLock, Window};
use crate::entity::{Entity, KeyStrategy};
use crate::error::{DomainError, DomainResult};
use crate::paging::Sort;
use crate::query::{Assignment, LockMode};
use crate::specification::Specification;
use crate::value::{FromValue, Value};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// 数据源访问计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataSourceStats {
    pub inserts: u64,
    pub updates: u64,
    /// `find_by_id` 与 `exists_by_id`
    pub lookups: u64,
    /// `find_by_ids`
    pub batch_lookups: u64,
    pub selects: u64,
    pub counts: u64,
    pub deletes: u64,
    pub bulk_updates: u64,
}

impl DataSourceStats {
    /// 读取类往返总数
    pub fn reads(&self) -> u64 {
        self.lookups + self.batch_lookups + self.selects + self.counts
    }
}

#[derive(Default)]
struct Counters {
    inserts: AtomicU64,
    updates: AtomicU64,
    lookups: AtomicU64,
    batch_lookups: AtomicU64,
    selects: AtomicU64,
    counts: AtomicU64,
    deletes: AtomicU64,
    bulk_updates: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DataSourceStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        DataSourceStats {
            inserts: get(&self.inserts),
            updates: get(&self.updates),
            lookups: get(&self.lookups),
            batch_lookups: get(&self.batch_lookups),
            selects: get(&self.selects),
            counts: get(&self.counts),
            deletes: get(&self.deletes),
            bulk_updates: get(&self.bulk_updates),
        }
    }

    fn reset(&self) {
        for c in [
            &self.inserts,
            &self.updates,
            &self.lookups,
            &self.batch_lookups,
            &self.selects,
            &self.counts,
            &self.deletes,
            &self.bulk_updates,
        ] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// 基于内存的数据源实现
/// - 行按标识有序存放，代理键由自增序列分配
/// - 行锁按标识维护，读锁共享、写锁独占，等待超时即冲突
/// - 记录各类访问次数，便于验证往返次数
pub struct InMemoryDataSource<E: Entity> {
    rows: RwLock<BTreeMap<E::Id, E>>,
    sequence: AtomicI64,
    locks: DashMap<E::Id, Arc<RwLock<()>>>,
    counters: Counters,
}

impl<E: Entity> Default for InMemoryDataSource<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            sequence: AtomicI64::new(0),
            locks: DashMap::new(),
            counters: Counters::default(),
        }
    }
}

impl<E: Entity> InMemoryDataSource<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stats(&self) -> DataSourceStats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    /// 锁表中的条目数（含正在持有或等待的行）
    pub fn lock_entries(&self) -> usize {
        self.locks.len()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn next_id(&self) -> DomainResult<E::Id> {
        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        E::Id::from_value(Value::Int(next)).map_err(|e| {
            DomainError::configuration(format!(
                "{} uses generated keys but its id type cannot hold a sequence value: {e}",
                E::TYPE
            ))
        })
    }

    fn require_id(entity: &E) -> DomainResult<E::Id> {
        entity.id().cloned().ok_or_else(|| {
            DomainError::invalid_argument(format!("{} has no identifier", E::TYPE))
        })
    }
}

#[async_trait]
impl<E: Entity> DataSource<E> for InMemoryDataSource<E> {
    async fn insert(&self, mut entity: E) -> DomainResult<E> {
        Counters::bump(&self.counters.inserts);
        if E::KEY_STRATEGY == KeyStrategy::Generated && entity.id().is_none() {
            entity.set_id(self.next_id()?);
        }
        let id = Self::require_id(&entity)?;

        let mut rows = self.rows.write().await;
        if rows.contains_key(&id) {
            return Err(DomainError::Persistence {
                reason: format!("duplicate key {} for {}", id, E::TYPE),
                source: None,
            });
        }
        rows.insert(id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: E) -> DomainResult<E> {
        Counters::bump(&self.counters.updates);
        let id = Self::require_id(&entity)?;
        self.rows.write().await.insert(id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &E::Id) -> DomainResult<Option<E>> {
        Counters::bump(&self.counters.lookups);
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[E::Id]) -> DomainResult<Vec<E>> {
        Counters::bump(&self.counters.batch_lookups);
        let rows = self.rows.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn exists_by_id(&self, id: &E::Id) -> DomainResult<bool> {
        Counters::bump(&self.counters.lookups);
        Ok(self.rows.read().await.contains_key(id))
    }

    async fn select(
        &self,
        filter: &dyn Specification<E>,
        sort: &Sort,
        window: Window,
    ) -> DomainResult<Vec<E>> {
        Counters::bump(&self.counters.selects);
        let rows = self.rows.read().await;
        let mut matched: Vec<&E> = rows.values().filter(|e| filter.is_satisfied_by(e)).collect();
        if sort.is_sorted() {
            matched.sort_by(|a, b| sort.compare(*a, *b));
        }
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = window
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &dyn Specification<E>) -> DomainResult<u64> {
        Counters::bump(&self.counters.counts);
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|e| filter.is_satisfied_by(e)).count() as u64)
    }

    async fn delete_by_id(&self, id: &E::Id) -> DomainResult<bool> {
        Counters::bump(&self.counters.deletes);
        let removed = self.rows.write().await.remove(id).is_some();
        self.locks.remove_if(id, |_, cell| Arc::strong_count(cell) == 1);
        Ok(removed)
    }

    async fn update_where(
        &self,
        filter: &dyn Specification<E>,
        assignments: &[Assignment],
    ) -> DomainResult<u64> {
        Counters::bump(&self.counters.bulk_updates);
        let mut rows = self.rows.write().await;
        // 全部匹配行计算成功后才整体写回
        let mut staged = Vec::new();
        for (id, row) in rows.iter() {
            if !filter.is_satisfied_by(row) {
                continue;
            }
            let mut next = row.clone();
            for assignment in assignments {
                assignment.apply(&mut next)?;
            }
            staged.push((id.clone(), next));
        }
        let affected = staged.len() as u64;
        rows.extend(staged);
        Ok(affected)
    }

    async fn lock(&self, id: &E::Id, mode: LockMode, timeout: Duration) -> DomainResult<RowLock> {
        if mode == LockMode::None {
            return Ok(RowLock::new(()));
        }
        // 清理无人持有或等待的锁条目
        self.locks.retain(|_, cell| Arc::strong_count(cell) > 1);
        let cell = self
            .locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone();

        let acquired = match mode {
            LockMode::None => return Ok(RowLock::new(())),
            LockMode::PessimisticRead => tokio::time::timeout(timeout, cell.read_owned())
                .await
                .map(RowLock::new),
            LockMode::PessimisticWrite => tokio::time::timeout(timeout, cell.write_owned())
                .await
                .map(RowLock::new),
        };

        acquired.map_err(|_| {
            tracing::warn!(
                entity = E::TYPE,
                id = %id,
                ?mode,
                timeout_ms = timeout.as_millis() as u64,
                "row lock wait timed out"
            );
            DomainError::ConcurrencyConflict {
                reason: format!(
                    "could not lock {} {} within {}ms",
                    E::TYPE,
                    id,
                    timeout.as_millis()
                ),
            }
        })
    }
}
