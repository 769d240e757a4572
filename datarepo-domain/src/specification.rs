//! 规约（Specification）
//!
//! 可组合的筛选条件。派生查询编译出的谓词树实现了该 trait，
//! 调用方也可以手写规约交给 [`SpecificationExecutor`](crate::repository::SpecificationExecutor) 执行。
//!
use std::marker::PhantomData;
use std::sync::Arc;

/// 规约模式的核心 trait
pub trait Specification<T>: Send + Sync {
    /// 检查候选对象是否满足规约
    fn is_satisfied_by(&self, candidate: &T) -> bool;

    /// 与另一个规约进行 AND 组合
    fn and<S>(self, other: S) -> AndSpecification<T>
    where
        Self: Sized + 'static,
        S: Specification<T> + 'static,
    {
        AndSpecification::new(Box::new(self), Box::new(other))
    }

    /// 与另一个规约进行 OR 组合
    fn or<S>(self, other: S) -> OrSpecification<T>
    where
        Self: Sized + 'static,
        S: Specification<T> + 'static,
    {
        OrSpecification::new(Box::new(self), Box::new(other))
    }

    /// 对规约进行 NOT 操作
    fn not(self) -> NotSpecification<T>
    where
        Self: Sized + 'static,
    {
        NotSpecification::new(Box::new(self))
    }
}

pub type BoxSpecification<T> = Box<dyn Specification<T>>;

impl<T> Specification<T> for Box<dyn Specification<T>> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.as_ref().is_satisfied_by(candidate)
    }
}

impl<T> Specification<T> for Arc<dyn Specification<T>> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.as_ref().is_satisfied_by(candidate)
    }
}

/// AND 组合规约
pub struct AndSpecification<T> {
    left: BoxSpecification<T>,
    right: BoxSpecification<T>,
}

impl<T> AndSpecification<T> {
    pub fn new(left: BoxSpecification<T>, right: BoxSpecification<T>) -> Self {
        Self { left, right }
    }
}

impl<T> Specification<T> for AndSpecification<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.left.is_satisfied_by(candidate) && self.right.is_satisfied_by(candidate)
    }
}

/// OR 组合规约
pub struct OrSpecification<T> {
    left: BoxSpecification<T>,
    right: BoxSpecification<T>,
}

impl<T> OrSpecification<T> {
    pub fn new(left: BoxSpecification<T>, right: BoxSpecification<T>) -> Self {
        Self { left, right }
    }
}

impl<T> Specification<T> for OrSpecification<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.left.is_satisfied_by(candidate) || self.right.is_satisfied_by(candidate)
    }
}

/// NOT 规约
pub struct NotSpecification<T> {
    inner: BoxSpecification<T>,
}

impl<T> NotSpecification<T> {
    pub fn new(inner: BoxSpecification<T>) -> Self {
        Self { inner }
    }
}

impl<T> Specification<T> for NotSpecification<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        !self.inner.is_satisfied_by(candidate)
    }
}

/// 由闭包构造的规约
pub struct FnSpecification<T, F> {
    f: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> Specification<T> for FnSpecification<T, F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        (self.f)(candidate)
    }
}

/// 以闭包创建规约：`spec_fn(|m: &Member| m.age >= 20)`
pub fn spec_fn<T, F>(f: F) -> FnSpecification<T, F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    FnSpecification {
        f,
        _marker: PhantomData,
    }
}

/// 恒真规约（无条件查询）
pub struct MatchAll;

impl<T> Specification<T> for MatchAll {
    fn is_satisfied_by(&self, _candidate: &T) -> bool {
        true
    }
}
