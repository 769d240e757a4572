//! 组合仓储
//!
//! 由 [`RepositoryFactory`](super::RepositoryFactory) 构建，持有一张只读的分派表：
//! `(方法名, 元数)` → 生成查询或自定义实现。
//!
use super::crud::{CrudRepository, SpecificationExecutor};
use super::custom::{CustomContext, CustomRepository};
use super::outcome::QueryOutcome;
use crate::audit::AuditingHandler;
use crate::config::RepositoryConfig;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::paging::{Page, PageRequest, Slice, Sort};
use crate::persist::{AssociationFetcher, DataSource, RowLock, Session, Window, paginator};
use crate::query::{
    Args, CompiledQuery, LockMode, MethodKey, Predicate, Projection, QuerySpec, ReturnShape,
    Subject,
};
use crate::record::Record;
use crate::specification::{MatchAll, Specification};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// 方法来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Generated,
    Custom,
}

#[derive(Clone)]
pub(crate) enum Route {
    Generated(Arc<CompiledQuery>),
    Custom,
}

pub struct Repository<E: Entity> {
    name: String,
    source: Arc<dyn DataSource<E>>,
    routes: HashMap<MethodKey, Route>,
    custom: Option<Arc<dyn CustomRepository<E>>>,
    fetchers: HashMap<String, Arc<dyn AssociationFetcher<E>>>,
    auditing: AuditingHandler,
    config: RepositoryConfig,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            source: self.source.clone(),
            routes: self.routes.clone(),
            custom: self.custom.clone(),
            fetchers: self.fetchers.clone(),
            auditing: self.auditing.clone(),
            config: self.config.clone(),
        }
    }
}

fn distinct<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// 至多一行
fn single<E>(mut rows: Vec<E>) -> DomainResult<Option<E>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        n => Err(DomainError::NonUniqueResult {
            expected: 1,
            actual: n,
        }),
    }
}

impl<E: Entity> Repository<E> {
    pub(crate) fn new(
        name: String,
        source: Arc<dyn DataSource<E>>,
        routes: HashMap<MethodKey, Route>,
        custom: Option<Arc<dyn CustomRepository<E>>>,
        fetchers: HashMap<String, Arc<dyn AssociationFetcher<E>>>,
        auditing: AuditingHandler,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            name,
            source,
            routes,
            custom,
            fetchers,
            auditing,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Arc<dyn DataSource<E>> {
        &self.source
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// 方法由谁实现
    pub fn resolve(&self, name: &str, arity: usize) -> Option<Origin> {
        self.routes
            .get(&MethodKey::new(name, arity))
            .map(|route| match route {
                Route::Generated(_) => Origin::Generated,
                Route::Custom => Origin::Custom,
            })
    }

    /// 生成方法的编译结果
    pub fn compiled(&self, name: &str, arity: usize) -> Option<&CompiledQuery> {
        match self.routes.get(&MethodKey::new(name, arity)) {
            Some(Route::Generated(query)) => Some(query),
            _ => None,
        }
    }

    /// 全部可调用方法（有序）
    pub fn methods(&self) -> Vec<MethodKey> {
        let mut keys: Vec<MethodKey> = self.routes.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 按名称与实参个数分派
    pub async fn invoke(
        &self,
        session: &Session,
        name: &str,
        args: Args,
    ) -> DomainResult<QueryOutcome<E>> {
        let key = MethodKey::new(name, args.len());
        let route = self.routes.get(&key).ok_or_else(|| DomainError::NotFound {
            reason: format!("{}.{key}: no such query method", self.name),
        })?;

        match route {
            Route::Custom => {
                let custom = self.custom.as_ref().ok_or_else(|| {
                    DomainError::configuration(format!(
                        "{}.{key}: routed to a missing custom implementation",
                        self.name
                    ))
                })?;
                tracing::trace!(repository = %self.name, method = %key, "invoking custom method");
                custom
                    .invoke(CustomContext::new(session, &*self.source), &key, args)
                    .await
            }
            Route::Generated(query) => self.execute(session, query, &args).await,
        }
    }

    async fn execute(
        &self,
        session: &Session,
        query: &CompiledQuery,
        args: &Args,
    ) -> DomainResult<QueryOutcome<E>> {
        for (index, (arg, expected)) in args.iter().zip(query.params()).enumerate() {
            if arg.kind() != *expected {
                return Err(DomainError::invalid_argument(format!(
                    "{}.{}: argument {index} must be {expected:?}, found {:?}",
                    self.name,
                    query.key(),
                    arg.kind()
                )));
            }
        }

        let spec = query.spec().bind(&args.values())?;
        let filter = Predicate::from_clauses(spec.clauses())?;
        let dynamic = args
            .sort_arg()
            .or_else(|| args.page_request().map(PageRequest::sort));
        let sort = paginator::ordering(dynamic, spec.order());

        tracing::trace!(
            repository = %self.name,
            method = %query.key(),
            query = %spec,
            "executing query method"
        );

        match spec.subject() {
            Subject::Count => Ok(QueryOutcome::Count(self.source.count(&filter).await?)),
            Subject::Exists => {
                let hit = self
                    .source
                    .select(&filter, &Sort::unsorted(), Window::first(1))
                    .await?;
                Ok(QueryOutcome::Exists(!hit.is_empty()))
            }
            Subject::Update => {
                let matched = self
                    .source
                    .select(&filter, &Sort::unsorted(), Window::all())
                    .await?;
                let mut guards = Vec::with_capacity(matched.len());
                for id in matched.iter().filter_map(|row| row.id()) {
                    guards.push(self.write_guard(session, id).await?);
                }
                let affected = self
                    .source
                    .update_where(&filter, spec.assignments())
                    .await?;
                drop(guards);
                let evicted = session.managed_count();
                session.clear();
                tracing::debug!(
                    repository = %self.name,
                    method = %query.key(),
                    affected,
                    evicted,
                    "identity map cleared after bulk update"
                );
                Ok(QueryOutcome::Affected(affected))
            }
            Subject::Delete => {
                let rows = self
                    .source
                    .select(&filter, &sort, Window::new(0, spec.max_results()))
                    .await?;
                for row in &rows {
                    if let Some(id) = row.id() {
                        let _guard = self.write_guard(session, id).await?;
                        self.source.delete_by_id(id).await?;
                        session.detach::<E>(id);
                    }
                }
                match query.returns() {
                    ReturnShape::List => Ok(QueryOutcome::List(rows)),
                    _ => Ok(QueryOutcome::Affected(rows.len() as u64)),
                }
            }
            Subject::Find => self.find(session, query, &spec, &filter, &sort, args).await,
        }
    }

    async fn find(
        &self,
        session: &Session,
        query: &CompiledQuery,
        spec: &QuerySpec,
        filter: &Predicate,
        sort: &Sort,
        args: &Args,
    ) -> DomainResult<QueryOutcome<E>> {
        match query.returns() {
            ReturnShape::Page => {
                let request = self.page_request(query, args)?;
                let count_filter = match spec.count_query() {
                    Some(count) => Predicate::from_clauses(count.clauses())?,
                    None => filter.clone(),
                };
                let page =
                    paginator::page(&*self.source, filter, &count_filter, sort, &request).await?;
                let total = page.total_elements();
                let content = self.prepare(session, spec, page.into_content()).await?;
                return Ok(QueryOutcome::Page(Page::new(content, request, total)));
            }
            ReturnShape::Slice => {
                let request = self.page_request(query, args)?;
                let slice = paginator::slice(&*self.source, filter, sort, &request).await?;
                let has_next = slice.has_next();
                let content = self.prepare(session, spec, slice.into_content()).await?;
                return Ok(QueryOutcome::Slice(Slice::new(content, request, has_next)));
            }
            _ => {}
        }

        let window = match args.page_request() {
            Some(request) => {
                let request = self.config.clamp(request)?;
                Window::new(request.offset(), Some(request.page_size()))
            }
            None => Window::new(0, spec.max_results()),
        };
        let mut rows = self.source.select(filter, sort, window).await?;

        match spec.projection() {
            Projection::Entity => {
                let rows = self.prepare(session, spec, rows).await?;
                match query.returns() {
                    ReturnShape::One => single(rows)?.map(QueryOutcome::One).ok_or_else(|| {
                        DomainError::NoResult {
                            reason: format!("{}.{} returned no result", self.name, query.key()),
                        }
                    }),
                    ReturnShape::Optional => single(rows).map(QueryOutcome::Optional),
                    _ => Ok(QueryOutcome::List(rows)),
                }
            }
            Projection::Scalar(path) => {
                self.fetch_paths(&mut rows, &self.projection_fetches(spec))
                    .await?;
                let values: Vec<Value> = rows
                    .iter()
                    .map(|row| row.field(path).unwrap_or(Value::Null))
                    .collect();
                let values = if spec.is_distinct() {
                    distinct(values)
                } else {
                    values
                };
                Ok(QueryOutcome::Scalars(values))
            }
            Projection::Tuple(paths) => {
                self.fetch_paths(&mut rows, &self.projection_fetches(spec))
                    .await?;
                let tuples: Vec<Vec<Value>> = rows
                    .iter()
                    .map(|row| {
                        paths
                            .iter()
                            .map(|p| row.field(p).unwrap_or(Value::Null))
                            .collect()
                    })
                    .collect();
                let tuples = if spec.is_distinct() {
                    distinct(tuples)
                } else {
                    tuples
                };
                Ok(QueryOutcome::Tuples(tuples))
            }
        }
    }

    fn page_request(&self, query: &CompiledQuery, args: &Args) -> DomainResult<PageRequest> {
        let request = args.page_request().ok_or_else(|| {
            DomainError::invalid_argument(format!(
                "{}.{}: a page request is required",
                self.name,
                query.key()
            ))
        })?;
        self.config.clamp(request)
    }

    /// 实体结果的后处理：加锁、纳入会话、抓取关联
    async fn prepare(
        &self,
        session: &Session,
        spec: &QuerySpec,
        rows: Vec<E>,
    ) -> DomainResult<Vec<E>> {
        let locked = spec.lock_mode() != LockMode::None;
        let mut rows = if locked {
            self.lock_rows(session, spec.lock_mode(), rows).await?
        } else {
            rows
        };

        if !spec.is_read_only() {
            if locked {
                rows.iter().for_each(|row| session.attach(row));
            } else {
                rows = session.merge(rows);
            }
        }

        if !spec.fetches().is_empty() {
            self.fetch_paths(&mut rows, spec.fetches()).await?;
            if !spec.is_read_only() {
                rows.iter().for_each(|row| session.attach(row));
            }
        }
        Ok(rows)
    }

    /// 逐行加锁后重新读取，返回加锁时刻的最新状态
    async fn lock_rows(
        &self,
        session: &Session,
        mode: LockMode,
        rows: Vec<E>,
    ) -> DomainResult<Vec<E>> {
        let ids: Vec<E::Id> = rows.iter().filter_map(|row| row.id().cloned()).collect();
        for id in &ids {
            session
                .lock(&*self.source, id, mode, self.config.lock_timeout())
                .await?;
        }
        let mut fresh: HashMap<E::Id, E> = self
            .source
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .filter_map(|row| row.id().cloned().map(|id| (id, row)))
            .collect();
        Ok(ids.iter().filter_map(|id| fresh.remove(id)).collect())
    }

    /// 写入期间的行写锁；其他会话持有该行锁时按锁超时等待
    async fn write_guard(&self, session: &Session, id: &E::Id) -> DomainResult<Option<RowLock>> {
        session
            .write_guard(&*self.source, id, self.config.lock_timeout())
            .await
    }

    async fn fetch_paths(&self, rows: &mut [E], paths: &[String]) -> DomainResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        for path in paths {
            let fetcher = self.fetchers.get(path).ok_or_else(|| {
                DomainError::configuration(format!(
                    "{}: no association fetcher registered for '{path}'",
                    self.name
                ))
            })?;
            fetcher.fetch(rows).await?;
        }
        Ok(())
    }

    /// 投影需要的关联：声明的抓取路径加上投影列中关联属性的首段
    fn projection_fetches(&self, spec: &QuerySpec) -> Vec<String> {
        let mut paths = spec.fetches().to_vec();
        for column in spec.projection().paths() {
            let Some((head, rest)) = column.split_once('.') else {
                continue;
            };
            if rest != "id"
                && self.fetchers.contains_key(head)
                && !paths.iter().any(|p| p == head)
            {
                paths.push(head.to_string());
            }
        }
        paths
    }

    fn has_find_all_override(&self) -> bool {
        self.routes.contains_key(&MethodKey::new("findAll", 0))
    }
}

#[async_trait]
impl<E: Entity> CrudRepository<E> for Repository<E> {
    async fn save(&self, session: &Session, mut entity: E) -> DomainResult<E> {
        let _guard = match entity.id() {
            Some(id) => self.write_guard(session, id).await?,
            None => None,
        };
        let saved = if entity.is_new() {
            self.auditing.before_persist(&mut entity, session.context());
            self.source.insert(entity).await?
        } else {
            self.auditing.before_update(&mut entity, session.context());
            self.source.update(entity).await?
        };
        session.attach(&saved);
        tracing::trace!(repository = %self.name, id = ?saved.id(), "entity saved");
        Ok(saved)
    }

    async fn save_all(&self, session: &Session, entities: Vec<E>) -> DomainResult<Vec<E>> {
        let mut saved = Vec::with_capacity(entities.len());
        for entity in entities {
            saved.push(self.save(session, entity).await?);
        }
        Ok(saved)
    }

    async fn find_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<Option<E>> {
        if let Some(managed) = session.find::<E>(id) {
            return Ok(Some(managed));
        }
        let found = self.source.find_by_id(id).await?;
        if let Some(entity) = &found {
            session.attach(entity);
        }
        Ok(found)
    }

    async fn get_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<E> {
        self.find_by_id(session, id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                reason: format!("{} {id} does not exist", E::TYPE),
            })
    }

    async fn exists_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<bool> {
        if session.contains::<E>(id) {
            return Ok(true);
        }
        self.source.exists_by_id(id).await
    }

    async fn find_all(&self, session: &Session) -> DomainResult<Vec<E>> {
        if self.has_find_all_override() {
            return self
                .invoke(session, "findAll", Args::new())
                .await?
                .into_list();
        }
        self.find_all_sorted(session, &Sort::unsorted()).await
    }

    async fn find_all_sorted(&self, session: &Session, sort: &Sort) -> DomainResult<Vec<E>> {
        self.find_all_matching(session, &MatchAll, sort).await
    }

    async fn find_all_paged(
        &self,
        session: &Session,
        request: &PageRequest,
    ) -> DomainResult<Page<E>> {
        self.find_page_matching(session, &MatchAll, request).await
    }

    async fn find_all_by_ids(&self, session: &Session, ids: &[E::Id]) -> DomainResult<Vec<E>> {
        let rows = self.source.find_by_ids(ids).await?;
        Ok(session.merge(rows))
    }

    async fn count(&self, _session: &Session) -> DomainResult<u64> {
        self.source.count(&MatchAll).await
    }

    async fn delete(&self, session: &Session, entity: &E) -> DomainResult<()> {
        let id = entity.id().ok_or_else(|| {
            DomainError::invalid_argument(format!("cannot delete an unsaved {}", E::TYPE))
        })?;
        self.delete_by_id(session, id).await
    }

    async fn delete_by_id(&self, session: &Session, id: &E::Id) -> DomainResult<()> {
        let _guard = self.write_guard(session, id).await?;
        let removed = self.source.delete_by_id(id).await?;
        session.detach::<E>(id);
        tracing::trace!(repository = %self.name, %id, removed, "entity deleted");
        Ok(())
    }

    async fn delete_all(&self, session: &Session) -> DomainResult<u64> {
        let rows = self
            .source
            .select(&MatchAll, &Sort::unsorted(), Window::all())
            .await?;
        let mut removed = 0;
        for row in &rows {
            if let Some(id) = row.id() {
                let _guard = self.write_guard(session, id).await?;
                if self.source.delete_by_id(id).await? {
                    removed += 1;
                }
                session.detach::<E>(id);
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl<E: Entity> SpecificationExecutor<E> for Repository<E> {
    async fn find_all_matching(
        &self,
        session: &Session,
        spec: &dyn Specification<E>,
        sort: &Sort,
    ) -> DomainResult<Vec<E>> {
        let sort = paginator::ordering(Some(sort), &Sort::unsorted());
        let rows = self.source.select(spec, &sort, Window::all()).await?;
        Ok(session.merge(rows))
    }

    async fn find_page_matching(
        &self,
        session: &Session,
        spec: &dyn Specification<E>,
        request: &PageRequest,
    ) -> DomainResult<Page<E>> {
        let request = self.config.clamp(request)?;
        let sort = paginator::ordering(Some(request.sort()), &Sort::unsorted());
        let page = paginator::page(&*self.source, spec, spec, &sort, &request).await?;
        let total = page.total_elements();
        Ok(Page::new(session.merge(page.into_content()), request, total))
    }

    async fn count_matching(
        &self,
        _session: &Session,
        spec: &dyn Specification<E>,
    ) -> DomainResult<u64> {
        self.source.count(spec).await
    }

    async fn exists_matching(
        &self,
        _session: &Session,
        spec: &dyn Specification<E>,
    ) -> DomainResult<bool> {
        let hit = self
            .source
            .select(spec, &Sort::unsorted(), Window::first(1))
            .await?;
        Ok(!hit.is_empty())
    }
}
