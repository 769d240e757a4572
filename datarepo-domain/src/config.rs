//! 仓储配置
//!
//! 加载顺序（后者覆盖前者）：内置默认值 → TOML 文件 → `DATAREPO_` 前缀的环境变量。
//!
use crate::error::{DomainError, DomainResult};
use crate::paging::PageRequest;
use bon::Builder;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 查询方法的查找策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryLookupStrategy {
    /// 显式查询 → 命名查询 → 方法名派生
    #[default]
    CreateIfNotFound,
    /// 只接受显式查询或命名查询
    UseDeclaredQuery,
    /// 总是由方法名派生
    Create,
}

/// 仓储工厂配置
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// 自定义实现的命名后缀：`{Repository}{postfix}`
    #[builder(into, default = "Impl".to_string())]
    impl_postfix: String,
    #[builder(default = 20)]
    default_page_size: u64,
    /// 超过该值的页大小会被截断
    #[builder(default = 2000)]
    max_page_size: u64,
    /// 悲观锁等待超时（毫秒）
    #[builder(default = 5000)]
    lock_timeout_ms: u64,
    #[builder(default)]
    query_lookup: QueryLookupStrategy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RepositoryConfig {
    /// 从 TOML 文件与环境变量加载；文件不存在时仅使用默认值与环境变量
    pub fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("DATAREPO_"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(DomainError::configuration("page sizes must be greater than zero"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(DomainError::configuration(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.impl_postfix.is_empty() {
            return Err(DomainError::configuration("impl_postfix must not be empty"));
        }
        Ok(())
    }

    pub fn impl_postfix(&self) -> &str {
        &self.impl_postfix
    }

    pub fn default_page_size(&self) -> u64 {
        self.default_page_size
    }

    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn query_lookup(&self) -> QueryLookupStrategy {
        self.query_lookup
    }

    /// 使用默认页大小的分页请求
    pub fn page(&self, page: u64) -> DomainResult<PageRequest> {
        PageRequest::of(page, self.default_page_size)
    }

    /// 将超出上限的页大小截断为 `max_page_size`
    pub fn clamp(&self, request: &PageRequest) -> DomainResult<PageRequest> {
        if request.page_size() > self.max_page_size {
            tracing::debug!(
                requested = request.page_size(),
                max = self.max_page_size,
                "page size clamped"
            );
            return request.with_size(self.max_page_size);
        }
        Ok(request.clone())
    }
}
