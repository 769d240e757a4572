use super::custom::CustomInterface;
use crate::entity::Entity;
use crate::persist::AssociationFetcher;
use crate::query::{QueryMethod, QuerySpec};
use std::collections::HashMap;
use std::sync::Arc;

/// 仓储声明
///
/// ```ignore
/// let definition = RepositoryDefinition::<Member>::new("MemberRepository")
///     .method(QueryMethod::list("findByUsernameAndAgeGreaterThan").param("username").param("age"))
///     .named_query("Member.findByUsername", QuerySpec::select().filter(Clause::eq("username", Operand::named("username"))))
///     .entity_graph("Member.all", ["team"])
///     .fetcher(ManyToOne::new("team", teams, |m: &mut Member| &mut m.team))
///     .custom(CustomInterface::new("MemberRepositoryCustom").method("findMemberCustom", 0));
/// ```
pub struct RepositoryDefinition<E: Entity> {
    name: String,
    methods: Vec<QueryMethod>,
    named_queries: HashMap<String, QuerySpec>,
    named_graphs: HashMap<String, Vec<String>>,
    custom: Option<CustomInterface>,
    fetchers: Vec<Arc<dyn AssociationFetcher<E>>>,
}

impl<E: Entity> RepositoryDefinition<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            named_queries: HashMap::new(),
            named_graphs: HashMap::new(),
            custom: None,
            fetchers: Vec::new(),
        }
    }

    pub fn method(mut self, method: QueryMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// 命名查询，按 `"{实体}.{方法}"` 约定与方法关联
    pub fn named_query(mut self, name: impl Into<String>, spec: QuerySpec) -> Self {
        self.named_queries.insert(name.into(), spec);
        self
    }

    /// 命名实体图：一组需要抓取的关联路径
    pub fn entity_graph<I, P>(mut self, name: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.named_graphs
            .insert(name.into(), paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn custom(mut self, interface: CustomInterface) -> Self {
        self.custom = Some(interface);
        self
    }

    pub fn fetcher<F>(mut self, fetcher: F) -> Self
    where
        F: AssociationFetcher<E> + 'static,
    {
        self.fetchers.push(Arc::new(fetcher));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[QueryMethod] {
        &self.methods
    }

    pub fn named_queries(&self) -> &HashMap<String, QuerySpec> {
        &self.named_queries
    }

    pub fn named_graphs(&self) -> &HashMap<String, Vec<String>> {
        &self.named_graphs
    }

    pub fn custom_interface(&self) -> Option<&CustomInterface> {
        self.custom.as_ref()
    }

    pub fn fetchers(&self) -> &[Arc<dyn AssociationFetcher<E>>] {
        &self.fetchers
    }
}
