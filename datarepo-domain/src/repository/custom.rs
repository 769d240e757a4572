//! 自定义仓储实现
//!
//! 自定义实现按名称注册（仓储名 + 后缀，默认 `MemberRepositoryImpl`），
//! 组合时其方法覆盖同名同元数的生成方法。
//!
use super::outcome::QueryOutcome;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::persist::{DataSource, Session};
use crate::query::{Args, MethodKey};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

/// 自定义方法的执行上下文
pub struct CustomContext<'a, E: Entity> {
    session: &'a Session,
    source: &'a dyn DataSource<E>,
}

impl<'a, E: Entity> CustomContext<'a, E> {
    pub fn new(session: &'a Session, source: &'a dyn DataSource<E>) -> Self {
        Self { session, source }
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    pub fn source(&self) -> &'a dyn DataSource<E> {
        self.source
    }
}

#[async_trait]
pub trait CustomRepository<E: Entity>: Send + Sync {
    /// 提供的方法（名称 + 元数）
    fn methods(&self) -> Vec<MethodKey>;

    async fn invoke(
        &self,
        ctx: CustomContext<'_, E>,
        method: &MethodKey,
        args: Args,
    ) -> DomainResult<QueryOutcome<E>>;
}

/// 仓储声明的自定义接口
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomInterface {
    name: String,
    methods: Vec<MethodKey>,
}

impl CustomInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.methods.push(MethodKey::new(name, arity));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[MethodKey] {
        &self.methods
    }
}

type ErasedCustom = Arc<dyn Any + Send + Sync>;

/// 自定义实现注册表
/// - 以实现名为键，记录实体类型用于装配期校验
/// - 值为类型擦除后的 `Arc<dyn CustomRepository<E>>`
#[derive(Default)]
pub struct CustomRegistry {
    impls: DashMap<String, (TypeId, &'static str, ErasedCustom)>,
}

impl CustomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Entity>(
        &self,
        name: impl Into<String>,
        custom: Arc<dyn CustomRepository<E>>,
    ) -> DomainResult<()> {
        match self.impls.entry(name.into()) {
            Entry::Occupied(entry) => Err(DomainError::configuration(format!(
                "custom implementation '{}' already registered",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                let erased: ErasedCustom = Arc::new(custom);
                entry.insert((TypeId::of::<E>(), type_name::<E>(), erased));
                Ok(())
            }
        }
    }

    /// 查找实现；名称存在但实体类型不符时为配置错误
    pub fn lookup<E: Entity>(
        &self,
        name: &str,
    ) -> DomainResult<Option<Arc<dyn CustomRepository<E>>>> {
        let Some(entry) = self.impls.get(name) else {
            return Ok(None);
        };
        let (type_id, registered_for, erased) = entry.value();
        let found = (*type_id == TypeId::of::<E>())
            .then(|| erased.downcast_ref::<Arc<dyn CustomRepository<E>>>())
            .flatten();
        match found {
            Some(custom) => Ok(Some(custom.clone())),
            None => Err(DomainError::configuration(format!(
                "custom implementation '{name}' is registered for {registered_for}, not {}",
                type_name::<E>()
            ))),
        }
    }

    /// 已注册的实现名
    pub fn names(&self) -> Vec<String> {
        self.impls.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datarepo_macros::entity;

    #[entity]
    #[derive(Clone)]
    struct Member {
        username: String,
    }

    #[entity]
    #[derive(Clone)]
    struct Team {
        name: String,
    }

    struct MemberRepositoryImpl;

    #[async_trait]
    impl CustomRepository<Member> for MemberRepositoryImpl {
        fn methods(&self) -> Vec<MethodKey> {
            vec![MethodKey::new("findMemberCustom", 0)]
        }

        async fn invoke(
            &self,
            _ctx: CustomContext<'_, Member>,
            _method: &MethodKey,
            _args: Args,
        ) -> DomainResult<QueryOutcome<Member>> {
            Ok(QueryOutcome::List(Vec::new()))
        }
    }

    #[test]
    fn registers_once_per_name() {
        let registry = CustomRegistry::new();
        registry
            .register::<Member>("MemberRepositoryImpl", Arc::new(MemberRepositoryImpl))
            .unwrap();
        let err = registry
            .register::<Member>("MemberRepositoryImpl", Arc::new(MemberRepositoryImpl))
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(registry.names(), ["MemberRepositoryImpl"]);
    }

    #[test]
    fn concurrent_registrations_keep_the_first() {
        let registry = CustomRegistry::new();
        let accepted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        registry.register::<Member>(
                            "MemberRepositoryImpl",
                            Arc::new(MemberRepositoryImpl),
                        )
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(Result::is_ok)
                .count()
        });
        assert_eq!(accepted, 1);
        assert_eq!(registry.names().len(), 1);
    }

    #[test]
    fn lookup_checks_entity_type() {
        let registry = CustomRegistry::new();
        registry
            .register::<Member>("MemberRepositoryImpl", Arc::new(MemberRepositoryImpl))
            .unwrap();

        let custom = registry.lookup::<Member>("MemberRepositoryImpl").unwrap().unwrap();
        assert_eq!(custom.methods(), [MethodKey::new("findMemberCustom", 0)]);

        assert!(registry.lookup::<Member>("TeamRepositoryImpl").unwrap().is_none());
        let err = registry.lookup::<Team>("MemberRepositoryImpl").err().unwrap();
        assert!(err.is_configuration());
    }
}
