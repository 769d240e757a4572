//! 查询规格（QuerySpec）
//!
//! 显式构建的查询结构；方法名派生只是在其之上的一层解析。
//!
//! ```ignore
//! let spec = QuerySpec::select()
//!     .filter(Clause::eq("username", Operand::named("username")))
//!     .and(Clause::eq("age", Operand::named("age")));
//! ```
//!
use super::criteria::{Clause, Conjunction, Operand};
use crate::error::{DomainError, DomainResult};
use crate::paging::{Order, Sort};
use crate::record::Record;
use crate::value::Value;
use std::fmt;

/// 查询主体
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Subject {
    #[default]
    Find,
    Count,
    Exists,
    Delete,
    Update,
}

impl Subject {
    pub fn is_modifying(&self) -> bool {
        matches!(self, Subject::Delete | Subject::Update)
    }
}

/// 批量更新的赋值方式
#[derive(Debug, Clone, PartialEq)]
pub enum AssignKind {
    /// `set path = operand`
    Set(Operand),
    /// `set path = path + operand`
    Increment(Operand),
}

/// 批量更新赋值
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    path: String,
    kind: AssignKind,
}

impl Assignment {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &AssignKind {
        &self.kind
    }

    fn operand_mut(&mut self) -> &mut Operand {
        match &mut self.kind {
            AssignKind::Set(op) | AssignKind::Increment(op) => op,
        }
    }

    /// 将已绑定的赋值应用到记录上
    pub fn apply<R: Record + ?Sized>(&self, record: &mut R) -> DomainResult<()> {
        let literal = |op: &Operand| {
            op.as_literal().cloned().ok_or_else(|| {
                DomainError::invalid_argument(format!("unbound operand {op} in assignment"))
            })
        };
        let next = match &self.kind {
            AssignKind::Set(op) => literal(op)?,
            AssignKind::Increment(op) => {
                let current = record.field(&self.path).unwrap_or(Value::Null);
                current.checked_add(&literal(op)?)?
            }
        };
        record.set_field(&self.path, next)
    }
}

/// 结果投影
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// 完整实体
    #[default]
    Entity,
    /// 单列
    Scalar(String),
    /// 多列（按位置映射到 DTO）
    Tuple(Vec<String>),
}

impl Projection {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Projection::Entity => Vec::new(),
            Projection::Scalar(p) => vec![p.as_str()],
            Projection::Tuple(ps) => ps.iter().map(String::as_str).collect(),
        }
    }
}

/// 悲观锁模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockMode {
    #[default]
    None,
    PessimisticRead,
    PessimisticWrite,
}

/// 查询规格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    subject: Subject,
    clauses: Vec<Clause>,
    assignments: Vec<Assignment>,
    distinct: bool,
    limit: Option<u64>,
    order: Sort,
    projection: Projection,
    fetch: Vec<String>,
    read_only: bool,
    lock: LockMode,
    count_query: Option<Box<QuerySpec>>,
}

impl QuerySpec {
    fn with_subject(subject: Subject) -> Self {
        Self {
            subject,
            ..Self::default()
        }
    }

    pub fn select() -> Self {
        Self::with_subject(Subject::Find)
    }

    pub fn count() -> Self {
        Self::with_subject(Subject::Count)
    }

    pub fn exists() -> Self {
        Self::with_subject(Subject::Exists)
    }

    pub fn delete() -> Self {
        Self::with_subject(Subject::Delete)
    }

    pub fn update() -> Self {
        Self::with_subject(Subject::Update)
    }

    /// 第一个条件（等价于 `and`）
    pub fn filter(self, clause: Clause) -> Self {
        self.and(clause)
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause.joined_by(Conjunction::And));
        self
    }

    pub fn or(mut self, clause: Clause) -> Self {
        self.clauses.push(clause.joined_by(Conjunction::Or));
        self
    }

    pub fn set(mut self, path: impl Into<String>, operand: Operand) -> Self {
        self.assignments.push(Assignment {
            path: path.into(),
            kind: AssignKind::Set(operand),
        });
        self
    }

    pub fn increment(mut self, path: impl Into<String>, operand: Operand) -> Self {
        self.assignments.push(Assignment {
            path: path.into(),
            kind: AssignKind::Increment(operand),
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.order = self.order.and(sort);
        self
    }

    pub fn project(mut self, path: impl Into<String>) -> Self {
        self.projection = Projection::Scalar(path.into());
        self
    }

    pub fn project_tuple<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.projection = Projection::Tuple(paths.into_iter().map(Into::into).collect());
        self
    }

    /// 抓取关联（fetch join）
    pub fn fetch(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.fetch.contains(&path) {
            self.fetch.push(path);
        }
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock = mode;
        self
    }

    /// 分页时使用的独立计数查询
    pub fn count_with(mut self, count_query: QuerySpec) -> Self {
        self.count_query = Some(Box::new(count_query));
        self
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn max_results(&self) -> Option<u64> {
        self.limit
    }

    pub fn order(&self) -> &Sort {
        &self.order
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn fetches(&self) -> &[String] {
        &self.fetch
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn lock_mode(&self) -> LockMode {
        self.lock
    }

    pub fn count_query(&self) -> Option<&QuerySpec> {
        self.count_query.as_deref()
    }

    /// 由当前查询推导出的计数查询：保留条件，去掉排序、抓取、投影与数量限制
    pub fn to_count(&self) -> QuerySpec {
        QuerySpec {
            subject: Subject::Count,
            clauses: self.clauses.clone(),
            distinct: self.distinct,
            ..QuerySpec::default()
        }
    }

    /// 查询中引用的全部属性路径（用于启动期校验）
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.clauses
            .iter()
            .map(Clause::path)
            .chain(self.assignments.iter().map(Assignment::path))
            .chain(self.order.orders().iter().map(Order::property))
            .chain(self.projection.paths())
    }

    /// 按顺序遍历全部操作数
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.clauses
            .iter()
            .flat_map(|c| c.operands().iter())
            .chain(self.assignments.iter().map(|a| match &a.kind {
                AssignKind::Set(op) | AssignKind::Increment(op) => op,
            }))
    }

    /// 就地改写全部操作数（条件与赋值，不含计数查询）
    pub(crate) fn try_map_operands<F>(&mut self, mut f: F) -> DomainResult<()>
    where
        F: FnMut(&mut Operand) -> DomainResult<()>,
    {
        for clause in &mut self.clauses {
            for op in clause.operands_mut() {
                f(op)?;
            }
        }
        for assignment in &mut self.assignments {
            f(assignment.operand_mut())?;
        }
        Ok(())
    }

    pub(crate) fn set_count_query(&mut self, count_query: Option<QuerySpec>) {
        self.count_query = count_query.map(Box::new);
    }

    pub(crate) fn take_count_query(&mut self) -> Option<QuerySpec> {
        self.count_query.take().map(|b| *b)
    }

    pub(crate) fn add_fetches<I: IntoIterator<Item = String>>(&mut self, paths: I) {
        for path in paths {
            if !self.fetch.contains(&path) {
                self.fetch.push(path);
            }
        }
    }

    pub(crate) fn set_read_only(&mut self, read_only: bool) {
        self.read_only = self.read_only || read_only;
    }

    pub(crate) fn set_lock(&mut self, lock: LockMode) {
        if lock != LockMode::None {
            self.lock = lock;
        }
    }

    /// 以实际参数值替换位置参数，得到只含字面量的查询
    pub fn bind(&self, values: &[Value]) -> DomainResult<QuerySpec> {
        let mut bound = self.clone();
        bound.try_map_operands(|op| bind_operand(op, values))?;
        if let Some(count) = bound.count_query.as_deref_mut() {
            count.try_map_operands(|op| bind_operand(op, values))?;
        }
        Ok(bound)
    }
}

fn bind_operand(op: &mut Operand, values: &[Value]) -> DomainResult<()> {
    match op {
        Operand::Literal(_) => Ok(()),
        Operand::Positional(i) => {
            let value = values.get(*i).cloned().ok_or_else(|| {
                DomainError::invalid_argument(format!(
                    "parameter ?{i} not supplied ({} given)",
                    values.len()
                ))
            })?;
            *op = Operand::Literal(value);
            Ok(())
        }
        Operand::Named(name) => Err(DomainError::invalid_argument(format!(
            "named parameter :{name} was not resolved"
        ))),
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = match self.subject {
            Subject::Find => "select",
            Subject::Count => "count",
            Subject::Exists => "exists",
            Subject::Delete => "delete",
            Subject::Update => "update",
        };
        write!(f, "{head}")?;
        if self.distinct {
            write!(f, " distinct")?;
        }
        match &self.projection {
            Projection::Entity => {}
            Projection::Scalar(p) => write!(f, " {p}")?,
            Projection::Tuple(ps) => write!(f, " ({})", ps.join(", "))?,
        }
        for a in &self.assignments {
            match &a.kind {
                AssignKind::Set(op) => write!(f, " set {} = {op}", a.path)?,
                AssignKind::Increment(op) => write!(f, " set {0} = {0} + {op}", a.path)?,
            }
        }
        for (i, c) in self.clauses.iter().enumerate() {
            let joiner = match (i, c.conjunction()) {
                (0, _) => "where",
                (_, Conjunction::And) => "and",
                (_, Conjunction::Or) => "or",
            };
            write!(f, " {joiner} {c}")?;
        }
        if self.order.is_sorted() {
            let keys: Vec<String> = self
                .order
                .orders()
                .iter()
                .map(|o| format!("{} {:?}", o.property(), o.direction()))
                .collect();
            write!(f, " order by {}", keys.join(", "))?;
        }
        if let Some(n) = self.limit {
            write!(f, " limit {n}")?;
        }
        Ok(())
    }
}
