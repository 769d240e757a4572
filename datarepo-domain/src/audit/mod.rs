//! 审计（Auditing）
//!
//! 以组合代替继承：实体内嵌一个 [`AuditMetadata`] 值，
//! 由 [`AuditingHandler`] 在首次持久化与每次更新前填充。
//!
//! - 首次持久化：`created_at = updated_at = now`，记录操作主体；
//! - 更新：仅刷新 `updated_at` 与 `last_modified_by`，`created_*` 保持不变。
//!
mod clock;
mod handler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use handler::{AuditorAware, AuditingHandler, FixedAuditor};

use crate::error::DomainResult;
use crate::record::{Record, read_only_field, unknown_field};
use crate::value::{IntoValue, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 审计字段路径（持久化列名）
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const CREATED_BY: &str = "created_by";
pub const LAST_MODIFIED_BY: &str = "last_modified_by";

/// 审计元数据；首次持久化前全部为空
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    created_by: Option<String>,
    last_modified_by: Option<String>,
}

impl AuditMetadata {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn last_modified_by(&self) -> Option<&str> {
        self.last_modified_by.as_deref()
    }

    /// 未持久化过（`created_at` 为空）
    pub fn is_new(&self) -> bool {
        self.created_at.is_none()
    }

    pub(crate) fn mark_created(&mut self, now: DateTime<Utc>, principal: Option<String>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
        self.created_by = principal.clone();
        self.last_modified_by = principal;
    }

    pub(crate) fn mark_modified(&mut self, now: DateTime<Utc>, principal: Option<String>) {
        // 时钟回拨时保持单调
        let next = match self.updated_at {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.updated_at = Some(next);
        self.last_modified_by = principal;
    }
}

impl Record for AuditMetadata {
    fn has_path(path: &str) -> bool {
        matches!(path, CREATED_AT | UPDATED_AT | CREATED_BY | LAST_MODIFIED_BY)
    }

    fn field(&self, path: &str) -> Option<Value> {
        match path {
            CREATED_AT => Some(self.created_at.into_value()),
            UPDATED_AT => Some(self.updated_at.into_value()),
            CREATED_BY => Some(self.created_by.clone().into_value()),
            LAST_MODIFIED_BY => Some(self.last_modified_by.clone().into_value()),
            _ => None,
        }
    }

    fn set_field(&mut self, path: &str, _value: Value) -> DomainResult<()> {
        if Self::has_path(path) {
            Err(read_only_field("AuditMetadata", path))
        } else {
            Err(unknown_field("AuditMetadata", path))
        }
    }
}
