use crate::error::{DomainError, DomainResult};
use crate::paging::{Page, Slice};
use crate::query::FromTuple;
use crate::value::{FromValue, Value};

/// 查询方法的执行结果
///
/// 形态由方法声明决定；`into_*` 取出期望形态，不匹配时返回 `TypeMismatch`。
#[derive(Debug, Clone)]
pub enum QueryOutcome<E> {
    List(Vec<E>),
    One(E),
    Optional(Option<E>),
    Page(Page<E>),
    Slice(Slice<E>),
    /// 单列投影
    Scalars(Vec<Value>),
    /// 多列投影（按位置）
    Tuples(Vec<Vec<Value>>),
    Count(u64),
    Exists(bool),
    /// 修改类查询影响的行数
    Affected(u64),
}

impl<E> QueryOutcome<E> {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryOutcome::List(_) => "list",
            QueryOutcome::One(_) => "one",
            QueryOutcome::Optional(_) => "optional",
            QueryOutcome::Page(_) => "page",
            QueryOutcome::Slice(_) => "slice",
            QueryOutcome::Scalars(_) => "scalars",
            QueryOutcome::Tuples(_) => "tuples",
            QueryOutcome::Count(_) => "count",
            QueryOutcome::Exists(_) => "exists",
            QueryOutcome::Affected(_) => "affected",
        }
    }

    fn mismatch(&self, expected: &str) -> DomainError {
        DomainError::TypeMismatch {
            expected: expected.to_string(),
            found: self.kind().to_string(),
        }
    }

    pub fn into_list(self) -> DomainResult<Vec<E>> {
        match self {
            QueryOutcome::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn into_one(self) -> DomainResult<E> {
        match self {
            QueryOutcome::One(item) => Ok(item),
            other => Err(other.mismatch("one")),
        }
    }

    pub fn into_optional(self) -> DomainResult<Option<E>> {
        match self {
            QueryOutcome::Optional(item) => Ok(item),
            other => Err(other.mismatch("optional")),
        }
    }

    pub fn into_page(self) -> DomainResult<Page<E>> {
        match self {
            QueryOutcome::Page(page) => Ok(page),
            other => Err(other.mismatch("page")),
        }
    }

    pub fn into_slice(self) -> DomainResult<Slice<E>> {
        match self {
            QueryOutcome::Slice(slice) => Ok(slice),
            other => Err(other.mismatch("slice")),
        }
    }

    /// 单列投影转换为目标类型
    pub fn into_scalars<T: FromValue>(self) -> DomainResult<Vec<T>> {
        match self {
            QueryOutcome::Scalars(values) => values.into_iter().map(T::from_value).collect(),
            other => Err(other.mismatch("scalars")),
        }
    }

    /// 多列投影按位置构造 DTO
    pub fn into_dtos<D: FromTuple>(self) -> DomainResult<Vec<D>> {
        match self {
            QueryOutcome::Tuples(rows) => rows.into_iter().map(D::from_tuple).collect(),
            other => Err(other.mismatch("tuples")),
        }
    }

    pub fn into_count(self) -> DomainResult<u64> {
        match self {
            QueryOutcome::Count(n) => Ok(n),
            other => Err(other.mismatch("count")),
        }
    }

    pub fn into_exists(self) -> DomainResult<bool> {
        match self {
            QueryOutcome::Exists(b) => Ok(b),
            other => Err(other.mismatch("exists")),
        }
    }

    pub fn into_affected(self) -> DomainResult<u64> {
        match self {
            QueryOutcome::Affected(n) => Ok(n),
            other => Err(other.mismatch("affected")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_check_the_shape() {
        let outcome: QueryOutcome<String> = QueryOutcome::Count(3);
        let err = outcome.into_list().unwrap_err();
        match err {
            DomainError::TypeMismatch { expected, found } => {
                assert_eq!(expected, "list");
                assert_eq!(found, "count");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn scalars_convert_each_value() {
        let outcome: QueryOutcome<()> =
            QueryOutcome::Scalars(vec![Value::from("member1"), Value::from("member2")]);
        let names: Vec<String> = outcome.into_scalars().unwrap();
        assert_eq!(names, ["member1", "member2"]);

        let outcome: QueryOutcome<()> = QueryOutcome::Scalars(vec![Value::from("x")]);
        assert!(outcome.into_scalars::<i64>().is_err());
    }

    #[test]
    fn tuples_map_positionally() {
        let outcome: QueryOutcome<()> = QueryOutcome::Tuples(vec![vec![
            Value::Int(1),
            Value::from("member1"),
            Value::Null,
        ]]);
        let rows: Vec<(i64, String, Option<String>)> = outcome.into_dtos().unwrap();
        assert_eq!(rows, [(1, "member1".to_string(), None)]);
    }
}
