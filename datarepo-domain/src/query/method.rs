//! 查询方法声明
//!
//! 对应仓储接口上的一个方法：名称、参数列表、返回形态与可选的查询选项
//! （显式查询、命名查询、实体图、锁、只读提示、计数查询）。
//!
use super::projection::FromTuple;
use super::spec::{LockMode, QuerySpec};
use crate::paging::{PageRequest, Sort};
use crate::value::{IntoValue, Value};
use std::any::type_name;
use std::fmt;

/// 方法签名键：名称 + 参数个数
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    name: String,
    arity: usize,
}

impl MethodKey {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// 返回形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    List,
    One,
    Optional,
    Page,
    Slice,
    Count,
    Exists,
    /// 受影响行数（删除/批量更新）
    Modifying,
}

/// 结果元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Entity,
    Scalar,
    Dto { name: &'static str, arity: usize },
}

/// 参数类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Value,
    Pageable,
    Sort,
}

/// 参数声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    name: String,
    kind: ParamKind,
}

impl ParamDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }
}

/// 查询方法声明
#[derive(Debug, Clone)]
pub struct QueryMethod {
    name: String,
    params: Vec<ParamDecl>,
    returns: ReturnShape,
    result: ResultKind,
    query: Option<QuerySpec>,
    named_query: Option<String>,
    entity_graph: Vec<String>,
    named_entity_graph: Option<String>,
    lock: LockMode,
    read_only: bool,
    count_query: Option<QuerySpec>,
}

impl QueryMethod {
    pub fn new(name: impl Into<String>, returns: ReturnShape) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns,
            result: ResultKind::Entity,
            query: None,
            named_query: None,
            entity_graph: Vec::new(),
            named_entity_graph: None,
            lock: LockMode::None,
            read_only: false,
            count_query: None,
        }
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::List)
    }

    pub fn one(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::One)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Optional)
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Page)
    }

    pub fn slice(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Slice)
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Count)
    }

    pub fn exists(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Exists)
    }

    pub fn modifying(name: impl Into<String>) -> Self {
        Self::new(name, ReturnShape::Modifying)
    }

    /// 值参数（名称用于 `:name` 绑定）
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            kind: ParamKind::Value,
        });
        self
    }

    pub fn pageable(mut self) -> Self {
        self.params.push(ParamDecl {
            name: "pageable".to_string(),
            kind: ParamKind::Pageable,
        });
        self
    }

    pub fn sort(mut self) -> Self {
        self.params.push(ParamDecl {
            name: "sort".to_string(),
            kind: ParamKind::Sort,
        });
        self
    }

    /// 显式查询（优先于命名查询与方法名派生）
    pub fn query(mut self, spec: QuerySpec) -> Self {
        self.query = Some(spec);
        self
    }

    /// 指定命名查询；默认按 `Entity.method` 查找
    pub fn named_query(mut self, name: impl Into<String>) -> Self {
        self.named_query = Some(name.into());
        self
    }

    /// 实体图：执行时额外抓取的关联
    pub fn entity_graph<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.entity_graph.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn named_entity_graph(mut self, name: impl Into<String>) -> Self {
        self.named_entity_graph = Some(name.into());
        self
    }

    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock = mode;
        self
    }

    /// 只读提示：结果不纳入会话的标识映射
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn count_query(mut self, spec: QuerySpec) -> Self {
        self.count_query = Some(spec);
        self
    }

    pub fn returning_scalar(mut self) -> Self {
        self.result = ResultKind::Scalar;
        self
    }

    pub fn returning_dto<D: FromTuple>(mut self) -> Self {
        self.result = ResultKind::Dto {
            name: type_name::<D>(),
            arity: D::ARITY,
        };
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn key(&self) -> MethodKey {
        MethodKey::new(self.name.clone(), self.params.len())
    }

    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    pub fn result(&self) -> ResultKind {
        self.result
    }

    pub fn declared_query(&self) -> Option<&QuerySpec> {
        self.query.as_ref()
    }

    pub fn declared_named_query(&self) -> Option<&str> {
        self.named_query.as_deref()
    }

    pub fn graph_paths(&self) -> &[String] {
        &self.entity_graph
    }

    pub fn graph_name(&self) -> Option<&str> {
        self.named_entity_graph.as_deref()
    }

    pub fn lock_mode(&self) -> LockMode {
        self.lock
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn declared_count_query(&self) -> Option<&QuerySpec> {
        self.count_query.as_ref()
    }

    /// 值参数（排除分页与排序参数）
    pub fn value_params(&self) -> impl Iterator<Item = &ParamDecl> {
        self.params.iter().filter(|p| p.kind == ParamKind::Value)
    }
}

/// 调用参数
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Page(PageRequest),
    Sort(Sort),
}

impl Arg {
    pub fn kind(&self) -> ParamKind {
        match self {
            Arg::Value(_) => ParamKind::Value,
            Arg::Page(_) => ParamKind::Pageable,
            Arg::Sort(_) => ParamKind::Sort,
        }
    }
}

/// 调用参数列表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, value: impl IntoValue) -> Self {
        self.0.push(Arg::Value(value.into_value()));
        self
    }

    pub fn page(mut self, request: PageRequest) -> Self {
        self.0.push(Arg::Page(request));
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.0.push(Arg::Sort(sort));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.0.get(index)
    }

    /// 值参数（按声明顺序）
    pub fn values(&self) -> Vec<Value> {
        self.0
            .iter()
            .filter_map(|a| match a {
                Arg::Value(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn page_request(&self) -> Option<&PageRequest> {
        self.0.iter().find_map(|a| match a {
            Arg::Page(p) => Some(p),
            _ => None,
        })
    }

    pub fn sort_arg(&self) -> Option<&Sort> {
        self.0.iter().find_map(|a| match a {
            Arg::Sort(s) => Some(s),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemberDto;
    impl FromTuple for MemberDto {
        const ARITY: usize = 3;
        fn from_tuple(_values: Vec<Value>) -> crate::error::DomainResult<Self> {
            Ok(MemberDto)
        }
    }

    #[test]
    fn key_counts_every_parameter() {
        let m = QueryMethod::page("findByUsername").param("username").pageable();
        assert_eq!(m.key(), MethodKey::new("findByUsername", 2));
        assert_eq!(m.value_params().count(), 1);
        assert_eq!(m.key().to_string(), "findByUsername/2");
    }

    #[test]
    fn dto_result_records_arity() {
        let m = QueryMethod::list("findMemberDto").returning_dto::<MemberDto>();
        assert!(matches!(m.result(), ResultKind::Dto { arity: 3, .. }));
    }

    #[test]
    fn args_split_values_from_paging() {
        let req = PageRequest::of(0, 3).unwrap();
        let args = Args::new().value(10).page(req.clone());
        assert_eq!(args.len(), 2);
        assert_eq!(args.values(), vec![Value::Int(10)]);
        assert_eq!(args.page_request(), Some(&req));
        assert!(args.sort_arg().is_none());
    }
}
