//! 动态值（Value）
//!
//! 查询条件的操作数、排序键、投影列与批量更新赋值都以 `Value` 表达，
//! 从而让查询引擎与具体实体类型解耦。
//!
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 字段取值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 比较两个值；`Null` 与任意值、或类型不兼容时返回 `None`。
    ///
    /// 整数与浮点数按数值比较。
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// 值相等（数值跨类型比较）
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_eq(y))
            }
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    /// 数值相加，用于 `set x = x + n` 形式的批量更新
    pub fn checked_add(&self, other: &Value) -> DomainResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| DomainError::invalid_value("integer overflow")),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (a, b) => Err(DomainError::TypeMismatch {
                expected: "numeric".to_string(),
                found: format!("{} + {}", a.type_name(), b.type_name()),
            }),
        }
    }

    /// 文本小写化（忽略大小写比较时使用）
    pub fn lowercase(&self) -> Value {
        match self {
            Value::Text(s) => Value::Text(s.to_lowercase()),
            Value::List(items) => Value::List(items.iter().map(Value::lowercase).collect()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// 转换为 `Value`
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// 从 `Value` 还原
pub trait FromValue: Sized {
    fn from_value(value: Value) -> DomainResult<Self>;
}

fn mismatch(expected: &str, found: &Value) -> DomainError {
    DomainError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> DomainResult<Self> {
        Ok(value)
    }
}

macro_rules! int_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::Int(self as i64)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> DomainResult<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| {
                            DomainError::invalid_value(format!(
                                "{i} out of range for {}",
                                stringify!($ty)
                            ))
                        }),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    v.into_value()
                }
            }
        )*
    };
}

int_value!(i8, i16, i32, i64, u8, u16, u32, usize);

impl IntoValue for u64 {
    fn into_value(self) -> Value {
        Value::Int(i64::try_from(self).unwrap_or(i64::MAX))
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Int(i) => u64::try_from(i)
                .map_err(|_| DomainError::invalid_value(format!("{i} out of range for u64"))),
            other => Err(mismatch("u64", &other)),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        v.into_value()
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl IntoValue for DateTime<Utc> {
    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            Value::Text(s) => Ok(DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc)),
            other => Err(mismatch("DateTime<Utc>", &other)),
        }
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl IntoValue for NaiveDateTime {
    fn into_value(self) -> Value {
        Value::Timestamp(self.and_utc())
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> DomainResult<Self> {
        DateTime::<Utc>::from_value(value).map(|t| t.naive_utc())
    }
}

impl IntoValue for uuid::Uuid {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Text(s) => Ok(uuid::Uuid::parse_str(&s)?),
            other => Err(mismatch("Uuid", &other)),
        }
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        v.into_value()
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: IntoValue> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        v.into_value()
    }
}
