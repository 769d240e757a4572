use super::composed::{Repository, Route};
use super::custom::{CustomRegistry, CustomRepository};
use super::definition::RepositoryDefinition;
use crate::audit::{AuditingHandler, Clock};
use crate::config::RepositoryConfig;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::persist::{AssociationFetcher, DataSource};
use crate::query::{CompileContext, MethodKey, compile};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 仓储工厂
///
/// 构建时完成全部查询方法的编译与校验，任何配置错误都会使构建失败；
/// 构建出的仓储只读地持有分派表。
pub struct RepositoryFactory {
    config: RepositoryConfig,
    auditing: AuditingHandler,
    customs: CustomRegistry,
}

impl Default for RepositoryFactory {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

impl RepositoryFactory {
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            config,
            auditing: AuditingHandler::default(),
            customs: CustomRegistry::new(),
        }
    }

    /// 替换审计时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.auditing = AuditingHandler::new(clock);
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// 注册自定义实现；名称应为 `仓储名 + impl_postfix`
    pub fn register_custom<E: Entity>(
        &self,
        name: impl Into<String>,
        custom: Arc<dyn CustomRepository<E>>,
    ) -> DomainResult<()> {
        self.customs.register(name, custom)
    }

    pub fn build<E: Entity>(
        &self,
        definition: RepositoryDefinition<E>,
        source: Arc<dyn DataSource<E>>,
    ) -> DomainResult<Repository<E>> {
        let repository = definition.name().to_string();
        let fail = |reason: String| DomainError::configuration(format!("{repository}: {reason}"));

        // 自定义实现
        let impl_name = format!("{repository}{}", self.config.impl_postfix());
        let custom = self.customs.lookup::<E>(&impl_name)?;
        let custom_methods: Vec<MethodKey> =
            custom.as_ref().map(|c| c.methods()).unwrap_or_default();
        if let Some(interface) = definition.custom_interface() {
            if custom.is_none() {
                return Err(fail(format!(
                    "custom interface {} declared but no implementation named '{impl_name}' is registered",
                    interface.name()
                )));
            }
            if let Some(missing) = interface
                .methods()
                .iter()
                .find(|m| !custom_methods.contains(*m))
            {
                return Err(fail(format!(
                    "'{impl_name}' does not implement {}.{missing}",
                    interface.name()
                )));
            }
        }

        // 关联抓取器
        let mut fetchers: HashMap<String, Arc<dyn AssociationFetcher<E>>> = HashMap::new();
        for fetcher in definition.fetchers() {
            let path = fetcher.path().to_string();
            if fetchers.insert(path.clone(), fetcher.clone()).is_some() {
                return Err(fail(format!("duplicate association fetcher for '{path}'")));
            }
        }
        let fetchable: HashSet<String> = fetchers.keys().cloned().collect();

        let ctx = CompileContext {
            named_queries: definition.named_queries(),
            named_graphs: definition.named_graphs(),
            fetchable: &fetchable,
            lookup: self.config.query_lookup(),
        };

        let mut routes: HashMap<MethodKey, Route> = HashMap::new();
        for method in definition.methods() {
            let key = method.key();
            if routes.contains_key(&key) {
                return Err(fail(format!("method {key} declared more than once")));
            }
            let compiled = compile::<E>(method, &ctx)?;
            routes.insert(key, Route::Generated(Arc::new(compiled)));
        }

        for key in custom_methods {
            if routes.insert(key.clone(), Route::Custom).is_some() {
                tracing::debug!(
                    repository = %repository,
                    method = %key,
                    implementation = %impl_name,
                    "custom implementation overrides generated query"
                );
            }
        }

        tracing::debug!(
            repository = %repository,
            entity = E::TYPE,
            methods = routes.len(),
            custom = custom.is_some(),
            fetchers = fetchers.len(),
            "repository composed"
        );

        Ok(Repository::new(
            repository,
            source,
            routes,
            custom,
            fetchers,
            self.auditing.clone(),
            self.config.clone(),
        ))
    }
}
