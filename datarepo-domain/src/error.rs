//! 领域层统一错误定义
//!
//! 覆盖仓储装配（配置错误）、查询结果基数、并发冲突与持久化透传等最小必要集合。
//! 配置错误只应在仓储构建阶段出现，属于不可恢复的致命错误；
//! 持久化错误保留原始原因（`source`），本层不做任何隐式重试。
//!
use std::error::Error as StdError;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 装配/配置（启动期致命） ---
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    // --- 查询结果 ---
    #[error("non unique result: expected at most {expected}, found {actual}")]
    NonUniqueResult { expected: usize, actual: usize },
    #[error("no result: {reason}")]
    NoResult { reason: String },

    // --- 并发 ---
    #[error("concurrency conflict: {reason}")]
    ConcurrencyConflict { reason: String },

    // --- 调用参数与取值 ---
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },
    #[error("unknown field: entity={entity}, path={path}")]
    UnknownField { entity: String, path: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },

    // --- 持久化透传 ---
    #[error("persistence error: {reason}")]
    Persistence {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        DomainError::Configuration {
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        DomainError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn invalid_value(reason: impl Into<String>) -> Self {
        DomainError::InvalidValue {
            reason: reason.into(),
        }
    }

    /// 包装底层存储错误，保留原始原因链
    pub fn persistence<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DomainError::Persistence {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 是否为启动期配置错误
    pub fn is_configuration(&self) -> bool {
        matches!(self, DomainError::Configuration { .. })
    }
}

// ---- Cross-crate conversions for infrastructure convenience ----

impl From<figment::Error> for DomainError {
    fn from(err: figment::Error) -> Self {
        DomainError::Configuration {
            reason: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for DomainError {
    fn from(err: chrono::ParseError) -> Self {
        DomainError::InvalidValue {
            reason: err.to_string(),
        }
    }
}

impl From<uuid::Error> for DomainError {
    fn from(err: uuid::Error) -> Self {
        DomainError::InvalidValue {
            reason: err.to_string(),
        }
    }
}

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound {
                reason: "row not found".to_string(),
            },
            other => DomainError::persistence("database error", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_keeps_source() {
        let io = std::io::Error::other("disk gone");
        let err = DomainError::persistence("write failed", io);
        assert_eq!(err.to_string(), "persistence error: write failed");
        let source = err.source().expect("source attached");
        assert_eq!(source.to_string(), "disk gone");
    }

    #[test]
    fn configuration_errors_are_flagged() {
        assert!(DomainError::configuration("bad").is_configuration());
        assert!(!DomainError::invalid_argument("bad").is_configuration());
    }
}
