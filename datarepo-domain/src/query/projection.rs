use crate::error::{DomainError, DomainResult};
use crate::value::{FromValue, Value};

/// 按位置从投影列构造 DTO
///
/// `ARITY` 在仓储构建时与查询选择的列数比对，不一致即为配置错误。
/// 通常由 `#[projection]` 宏生成。
pub trait FromTuple: Sized {
    const ARITY: usize;

    fn from_tuple(values: Vec<Value>) -> DomainResult<Self>;
}

/// 校验列数（运行期兜底）
pub fn expect_arity(type_name: &str, arity: usize, values: &[Value]) -> DomainResult<()> {
    if values.len() != arity {
        return Err(DomainError::TypeMismatch {
            expected: format!("{type_name} with {arity} column(s)"),
            found: format!("{} column(s)", values.len()),
        });
    }
    Ok(())
}

macro_rules! tuple_impl {
    ($n:expr; $($t:ident),+) => {
        impl<$($t: FromValue),+> FromTuple for ($($t,)+) {
            const ARITY: usize = $n;

            fn from_tuple(values: Vec<Value>) -> DomainResult<Self> {
                expect_arity("tuple", $n, &values)?;
                let mut it = values.into_iter();
                Ok(($($t::from_value(it.next().unwrap_or_default())?,)+))
            }
        }
    };
}

tuple_impl!(1; A);
tuple_impl!(2; A, B);
tuple_impl!(3; A, B, C);
tuple_impl!(4; A, B, C, D);
