//! 查询方法编译
//!
//! 仓储构建时把每个 [`QueryMethod`] 编译为 [`CompiledQuery`]：
//! 选择查询来源、解析参数绑定、校验属性路径与返回形态。
//! 这里出现的任何问题都是配置错误，仓储构建因此失败。
//!
use super::criteria::Operand;
use super::method::{MethodKey, ParamKind, QueryMethod, ResultKind, ReturnShape};
use super::method_name::{derive_query, is_derivable};
use super::spec::{Projection, QuerySpec, Subject};
use crate::config::QueryLookupStrategy;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// 查询来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// 方法上的显式查询
    Declared,
    /// 命名查询
    Named(String),
    /// 方法名派生
    Derived,
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::Declared => write!(f, "declared"),
            QuerySource::Named(n) => write!(f, "named({n})"),
            QuerySource::Derived => write!(f, "derived"),
        }
    }
}

/// 编译所需的仓储级上下文
pub struct CompileContext<'a> {
    pub named_queries: &'a HashMap<String, QuerySpec>,
    pub named_graphs: &'a HashMap<String, Vec<String>>,
    pub fetchable: &'a HashSet<String>,
    pub lookup: QueryLookupStrategy,
}

/// 编译后的查询方法
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    key: MethodKey,
    spec: QuerySpec,
    returns: ReturnShape,
    result: ResultKind,
    params: Vec<ParamKind>,
    source: QuerySource,
}

impl CompiledQuery {
    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    /// 操作数已全部改写为值参数位置（或字面量）
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    pub fn result(&self) -> ResultKind {
        self.result
    }

    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }
}

fn config_err(method: &QueryMethod, entity: &str, reason: impl fmt::Display) -> DomainError {
    DomainError::configuration(format!("{entity}.{}: {reason}", method.key()))
}

/// 编译单个查询方法
pub fn compile<E: Entity>(
    method: &QueryMethod,
    ctx: &CompileContext<'_>,
) -> DomainResult<CompiledQuery> {
    let entity = E::TYPE;
    let (mut spec, source) = select_source::<E>(method, ctx)?;

    let value_names: Vec<&str> = method.value_params().map(|p| p.name()).collect();
    let mut used = vec![false; value_names.len()];

    match source {
        QuerySource::Derived => {
            let needed = spec.operands().count();
            if needed != value_names.len() {
                return Err(config_err(
                    method,
                    entity,
                    format!(
                        "declares {} value parameter(s) but the derived query needs {needed}",
                        value_names.len()
                    ),
                ));
            }
            used.iter_mut().for_each(|u| *u = true);
        }
        _ => {
            let mut count = spec.take_count_query();
            resolve_operands(method, entity, &mut spec, &value_names, &mut used)?;
            if let Some(c) = count.as_mut() {
                resolve_operands(method, entity, c, &value_names, &mut used)?;
            }
            spec.set_count_query(count);
        }
    }

    if let Some(count) = method.declared_count_query() {
        let mut count = count.clone();
        resolve_operands(method, entity, &mut count, &value_names, &mut used)?;
        spec.set_count_query(Some(count));
    }

    for (name, used) in value_names.iter().zip(&used) {
        if !used {
            tracing::warn!(
                entity,
                method = %method.key(),
                parameter = name,
                "declared parameter is not used by the query"
            );
        }
    }

    // 方法级选项
    let mut graph: Vec<String> = method.graph_paths().to_vec();
    if let Some(name) = method.graph_name() {
        let paths = ctx
            .named_graphs
            .get(name)
            .ok_or_else(|| config_err(method, entity, format!("unknown entity graph '{name}'")))?;
        graph.extend(paths.iter().cloned());
    }
    spec.add_fetches(graph);
    spec.set_read_only(method.is_read_only());
    spec.set_lock(method.lock_mode());

    validate_paths::<E>(method, &spec, ctx)?;
    validate_shape(method, entity, &spec)?;

    if matches!(method.returns(), ReturnShape::Page) && spec.count_query().is_none() {
        let count = spec.to_count();
        spec.set_count_query(Some(count));
    }

    tracing::debug!(
        entity,
        method = %method.key(),
        source = %source,
        query = %spec,
        "query method compiled"
    );

    Ok(CompiledQuery {
        key: method.key(),
        spec,
        returns: method.returns(),
        result: method.result(),
        params: method.params().iter().map(|p| p.kind()).collect(),
        source,
    })
}

fn select_source<E: Entity>(
    method: &QueryMethod,
    ctx: &CompileContext<'_>,
) -> DomainResult<(QuerySpec, QuerySource)> {
    let entity = E::TYPE;
    let derive = || {
        derive_query::<E>(entity, method.name())
            .map(|spec| (spec, QuerySource::Derived))
            .map_err(|e| config_err(method, entity, e))
    };

    if ctx.lookup == QueryLookupStrategy::Create {
        return derive();
    }
    if let Some(spec) = method.declared_query() {
        return Ok((spec.clone(), QuerySource::Declared));
    }

    let explicit = method.declared_named_query();
    let named = explicit
        .map(str::to_string)
        .unwrap_or_else(|| format!("{entity}.{}", method.name()));
    if let Some(spec) = ctx.named_queries.get(&named) {
        return Ok((spec.clone(), QuerySource::Named(named)));
    }
    if explicit.is_some() {
        return Err(config_err(method, entity, format!("named query '{named}' not found")));
    }

    match ctx.lookup {
        QueryLookupStrategy::UseDeclaredQuery => Err(config_err(
            method,
            entity,
            "no declared or named query found and derivation is disabled",
        )),
        _ if !is_derivable(method.name()) => Err(config_err(
            method,
            entity,
            "no declared query and the method name cannot be derived",
        )),
        _ => derive(),
    }
}

fn resolve_operands(
    method: &QueryMethod,
    entity: &str,
    spec: &mut QuerySpec,
    value_names: &[&str],
    used: &mut [bool],
) -> DomainResult<()> {
    spec.try_map_operands(|op| match op {
        Operand::Literal(_) => Ok(()),
        Operand::Positional(i) => {
            let i = *i;
            if i >= value_names.len() {
                return Err(config_err(
                    method,
                    entity,
                    format!(
                        "positional parameter ?{i} out of range ({} value parameter(s))",
                        value_names.len()
                    ),
                ));
            }
            used[i] = true;
            Ok(())
        }
        Operand::Named(name) => {
            let index = value_names
                .iter()
                .position(|n| *n == name.as_str())
                .ok_or_else(|| {
                    config_err(method, entity, format!("named parameter :{name} is not declared"))
                })?;
            used[index] = true;
            *op = Operand::Positional(index);
            Ok(())
        }
    })
}

fn validate_paths<E: Entity>(
    method: &QueryMethod,
    spec: &QuerySpec,
    ctx: &CompileContext<'_>,
) -> DomainResult<()> {
    let entity = E::TYPE;
    let count_paths = spec.count_query().into_iter().flat_map(|c| c.paths());
    for path in spec.paths().chain(count_paths) {
        if !E::has_path(path) {
            return Err(config_err(
                method,
                entity,
                format!("no property '{path}' found for type {entity}"),
            ));
        }
    }
    for path in spec.fetches() {
        if !ctx.fetchable.contains(path) {
            return Err(config_err(
                method,
                entity,
                format!("no association fetcher registered for '{path}'"),
            ));
        }
    }
    Ok(())
}

fn validate_shape(method: &QueryMethod, entity: &str, spec: &QuerySpec) -> DomainResult<()> {
    let returns = method.returns();
    let subject_ok = match spec.subject() {
        Subject::Find => matches!(
            returns,
            ReturnShape::List
                | ReturnShape::One
                | ReturnShape::Optional
                | ReturnShape::Page
                | ReturnShape::Slice
        ),
        Subject::Count => returns == ReturnShape::Count,
        Subject::Exists => returns == ReturnShape::Exists,
        Subject::Delete => matches!(returns, ReturnShape::Modifying | ReturnShape::List),
        Subject::Update => returns == ReturnShape::Modifying,
    };
    if !subject_ok {
        return Err(config_err(
            method,
            entity,
            format!("{:?} query cannot return {returns:?}", spec.subject()),
        ));
    }

    match (spec.subject(), spec.assignments().is_empty()) {
        (Subject::Update, true) => {
            return Err(config_err(method, entity, "update query without assignments"));
        }
        (s, false) if s != Subject::Update => {
            return Err(config_err(
                method,
                entity,
                "assignments are only allowed in update queries",
            ));
        }
        _ => {}
    }

    let pageables = method
        .params()
        .iter()
        .filter(|p| p.kind() == ParamKind::Pageable)
        .count();
    let sorts = method
        .params()
        .iter()
        .filter(|p| p.kind() == ParamKind::Sort)
        .count();
    if pageables > 1 || sorts > 1 || (pageables == 1 && sorts == 1) {
        return Err(config_err(
            method,
            entity,
            "at most one pageable or sort parameter is allowed",
        ));
    }
    match returns {
        ReturnShape::Page | ReturnShape::Slice => {
            if pageables != 1 {
                return Err(config_err(
                    method,
                    entity,
                    format!("{returns:?} requires a pageable parameter"),
                ));
            }
            if spec.max_results().is_some() {
                return Err(config_err(
                    method,
                    entity,
                    format!("Top/First cannot be combined with {returns:?}"),
                ));
            }
        }
        ReturnShape::List => {}
        _ if pageables > 0 => {
            return Err(config_err(
                method,
                entity,
                format!("pageable parameter is not supported for {returns:?}"),
            ));
        }
        _ => {}
    }

    match (method.result(), spec.projection()) {
        (ResultKind::Entity, Projection::Entity) => Ok(()),
        (ResultKind::Scalar, Projection::Scalar(_)) if returns == ReturnShape::List => Ok(()),
        (ResultKind::Dto { arity, name }, Projection::Tuple(cols))
            if returns == ReturnShape::List =>
        {
            if cols.len() == arity {
                Ok(())
            } else {
                Err(config_err(
                    method,
                    entity,
                    format!(
                        "{name} expects {arity} column(s) but the query selects {}",
                        cols.len()
                    ),
                ))
            }
        }
        (result, projection) => Err(config_err(
            method,
            entity,
            format!("result {result:?} does not match projection {projection:?} for {returns:?}"),
        )),
    }
}
