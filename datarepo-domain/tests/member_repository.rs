use anyhow::Result as AnyResult;
use async_trait::async_trait;
use datarepo_domain::audit::AuditMetadata;
use datarepo_domain::config::RepositoryConfig;
use datarepo_domain::entity::{Entity, Reference};
use datarepo_domain::error::{DomainError, DomainResult};
use datarepo_domain::paging::{Direction, PageRequest, Sort};
use datarepo_domain::persist::{
    DataSource, InMemoryDataSource, ManyToOne, Session, SessionContext, Window,
};
use datarepo_domain::query::{Args, Clause, LockMode, MethodKey, Operand, QueryMethod, QuerySpec};
use datarepo_domain::repository::{
    CrudRepository, CustomContext, CustomInterface, CustomRepository, Origin, QueryOutcome,
    Repository, RepositoryDefinition, RepositoryFactory, SpecificationExecutor,
};
use datarepo_domain::specification::{MatchAll, spec_fn};
use datarepo_macros::{entity, projection};
use std::sync::Arc;

#[entity(name = "Team")]
struct Team {
    name: String,
}

#[entity(audit = true)]
struct Member {
    username: String,
    age: i32,
    #[field(association)]
    team: Reference<Team>,
}

#[projection]
struct MemberDto {
    id: i64,
    username: String,
    team_name: Option<String>,
}

fn member(username: &str, age: i32, team: Option<&Team>) -> Member {
    Member {
        id: None,
        audit: AuditMetadata::default(),
        username: username.to_string(),
        age,
        team: team.map(Reference::of).unwrap_or_default(),
    }
}

fn team(name: &str) -> Team {
    Team {
        id: None,
        name: name.to_string(),
    }
}

/// 自定义实现：按用户名升序返回全部成员
struct MemberRepositoryImpl;

#[async_trait]
impl CustomRepository<Member> for MemberRepositoryImpl {
    fn methods(&self) -> Vec<MethodKey> {
        vec![MethodKey::new("findMemberCustom", 0)]
    }

    async fn invoke(
        &self,
        ctx: CustomContext<'_, Member>,
        method: &MethodKey,
        _args: Args,
    ) -> DomainResult<QueryOutcome<Member>> {
        match method.name() {
            "findMemberCustom" => {
                let rows = ctx
                    .source()
                    .select(
                        &MatchAll,
                        &Sort::by(Direction::Asc, ["username"]),
                        Window::all(),
                    )
                    .await?;
                Ok(QueryOutcome::List(ctx.session().merge(rows)))
            }
            other => Err(DomainError::invalid_argument(format!("unexpected method {other}"))),
        }
    }
}

fn member_definition(teams: Arc<dyn DataSource<Team>>) -> RepositoryDefinition<Member> {
    RepositoryDefinition::new("MemberRepository")
        .fetcher(ManyToOne::new("team", teams, |m: &mut Member| &mut m.team))
        .named_query(
            "Member.findByUsername",
            QuerySpec::select().filter(Clause::eq("username", Operand::named("username"))),
        )
        .entity_graph("Member.all", ["team"])
        .custom(CustomInterface::new("MemberRepositoryCustom").method("findMemberCustom", 0))
        // 方法名派生
        .method(
            QueryMethod::list("findByUsernameAndAgeGreaterThan")
                .param("username")
                .param("age"),
        )
        .method(QueryMethod::list("findTop3HelloBy"))
        .method(QueryMethod::list("findByUsernameIgnoreCase").param("username"))
        .method(QueryMethod::list("findByAgeGreaterThan").param("age").sort())
        .method(QueryMethod::count("countByAgeGreaterThan").param("age"))
        .method(QueryMethod::exists("existsByUsername").param("username"))
        .method(QueryMethod::modifying("deleteByUsername").param("username"))
        // 命名查询
        .method(QueryMethod::list("findByUsername").param("username"))
        // 显式查询与投影
        .method(
            QueryMethod::list("findUser")
                .param("username")
                .param("age")
                .query(
                    QuerySpec::select()
                        .filter(Clause::eq("username", Operand::named("username")))
                        .and(Clause::eq("age", Operand::named("age"))),
                ),
        )
        .method(
            QueryMethod::list("findUsernameList")
                .query(QuerySpec::select().project("username"))
                .returning_scalar(),
        )
        .method(
            QueryMethod::list("findMemberDto")
                .query(QuerySpec::select().project_tuple(["id", "username", "team.name"]))
                .returning_dto::<MemberDto>(),
        )
        .method(
            QueryMethod::list("findByNames").param("names").query(
                QuerySpec::select().filter(Clause::is_in("username", Operand::named("names"))),
            ),
        )
        // 返回形态
        .method(QueryMethod::list("findListByUsername").param("username"))
        .method(QueryMethod::one("findMemberByUsername").param("username"))
        .method(QueryMethod::optional("findOptionalByUsername").param("username"))
        .method(
            QueryMethod::page("findByAge")
                .param("age")
                .pageable()
                .query(QuerySpec::select().filter(Clause::eq("age", Operand::named("age"))))
                .count_query(QuerySpec::count()),
        )
        .method(QueryMethod::slice("findSliceByAge").param("age").pageable())
        // 批量更新
        .method(
            QueryMethod::modifying("bulkAgePlus").param("age").query(
                QuerySpec::update()
                    .filter(Clause::gte("age", Operand::named("age")))
                    .increment("age", Operand::literal(1)),
            ),
        )
        // 抓取与实体图
        .method(QueryMethod::list("findMemberFetchJoin").query(QuerySpec::select().fetch("team")))
        .method(QueryMethod::list("findAll").entity_graph(["team"]))
        .method(
            QueryMethod::list("findEntityGraphByUsername")
                .param("username")
                .named_entity_graph("Member.all"),
        )
        // 查询提示与锁
        .method(QueryMethod::one("findReadOnlyByUsername").param("username").read_only())
        .method(
            QueryMethod::list("findLockByUsername")
                .param("username")
                .lock(LockMode::PessimisticWrite),
        )
        // 被自定义实现覆盖
        .method(QueryMethod::list("findMemberCustom").query(
            QuerySpec::select().filter(Clause::eq("username", Operand::literal("nobody"))),
        ))
}

struct Fixture {
    members: Arc<InMemoryDataSource<Member>>,
    teams: Arc<InMemoryDataSource<Team>>,
    repository: Repository<Member>,
    team_repository: Repository<Team>,
}

impl Fixture {
    fn new() -> DomainResult<Self> {
        Self::with_config(RepositoryConfig::default())
    }

    fn with_config(config: RepositoryConfig) -> DomainResult<Self> {
        let members = InMemoryDataSource::<Member>::shared();
        let teams = InMemoryDataSource::<Team>::shared();
        let member_source: Arc<dyn DataSource<Member>> = members.clone();
        let team_source: Arc<dyn DataSource<Team>> = teams.clone();

        let factory = RepositoryFactory::new(config);
        factory.register_custom::<Member>("MemberRepositoryImpl", Arc::new(MemberRepositoryImpl))?;
        let repository = factory.build(member_definition(team_source.clone()), member_source)?;
        let team_repository =
            factory.build(RepositoryDefinition::<Team>::new("TeamRepository"), team_source)?;
        Ok(Self {
            members,
            teams,
            repository,
            team_repository,
        })
    }

    /// teamA: member1(10), member2(20)；teamB: member3(30), member4(50), member5(60)
    async fn seed(&self) -> DomainResult<()> {
        let session = Session::anonymous();
        let team_a = self.team_repository.save(&session, team("teamA")).await?;
        let team_b = self.team_repository.save(&session, team("teamB")).await?;
        let rows = vec![
            member("member1", 10, Some(&team_a)),
            member("member2", 20, Some(&team_a)),
            member("member3", 30, Some(&team_b)),
            member("member4", 50, Some(&team_b)),
            member("member5", 60, Some(&team_b)),
        ];
        self.repository.save_all(&session, rows).await?;
        session.close();
        self.members.reset_stats();
        self.teams.reset_stats();
        Ok(())
    }
}

fn usernames(rows: &[Member]) -> Vec<&str> {
    rows.iter().map(|m| m.username.as_str()).collect()
}

#[tokio::test]
async fn crud_roundtrip_through_identity_map() -> AnyResult<()> {
    let fx = Fixture::new()?;
    let session = Session::anonymous();

    let saved = fx
        .repository
        .save(&session, member("memberA", 10, None))
        .await?;
    let id = *saved.id().expect("generated id");
    assert!(!saved.is_new());

    // 同一会话内重复读取由标识映射提供
    let found = fx.repository.get_by_id(&session, &id).await?;
    assert_eq!(found.username, "memberA");
    assert_eq!(fx.members.stats().lookups, 0);
    assert!(fx.repository.exists_by_id(&session, &id).await?);

    assert_eq!(fx.repository.count(&session).await?, 1);
    fx.repository.delete(&session, &found).await?;
    assert!(fx.repository.find_by_id(&session, &id).await?.is_none());
    assert!(matches!(
        fx.repository.get_by_id(&session, &id).await,
        Err(DomainError::NotFound { .. })
    ));
    // 删除不存在的标识不报错
    fx.repository.delete_by_id(&session, &id).await?;
    assert_eq!(fx.repository.count(&session).await?, 0);
    Ok(())
}

#[tokio::test]
async fn derived_queries_follow_method_names() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    let rows = repo
        .invoke(
            &session,
            "findByUsernameAndAgeGreaterThan",
            Args::new().value("member2").value(15),
        )
        .await?
        .into_list()?;
    assert_eq!(usernames(&rows), ["member2"]);

    let top = repo
        .invoke(&session, "findTop3HelloBy", Args::new())
        .await?
        .into_list()?;
    assert_eq!(top.len(), 3);

    let ignoring = repo
        .invoke(&session, "findByUsernameIgnoreCase", Args::new().value("MEMBER1"))
        .await?
        .into_list()?;
    assert_eq!(usernames(&ignoring), ["member1"]);

    let sorted = repo
        .invoke(
            &session,
            "findByAgeGreaterThan",
            Args::new().value(15).sort(Sort::by(Direction::Desc, ["age"])),
        )
        .await?
        .into_list()?;
    assert_eq!(usernames(&sorted), ["member5", "member4", "member3", "member2"]);

    assert_eq!(
        repo.invoke(&session, "countByAgeGreaterThan", Args::new().value(20))
            .await?
            .into_count()?,
        3
    );
    assert!(
        repo.invoke(&session, "existsByUsername", Args::new().value("member3"))
            .await?
            .into_exists()?
    );
    assert!(
        !repo
            .invoke(&session, "existsByUsername", Args::new().value("nobody"))
            .await?
            .into_exists()?
    );
    Ok(())
}

#[tokio::test]
async fn named_and_declared_queries_bind_by_name() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    let named = repo
        .invoke(&session, "findByUsername", Args::new().value("member1"))
        .await?
        .into_list()?;
    assert_eq!(usernames(&named), ["member1"]);
    assert_eq!(
        repo.compiled("findByUsername", 1).map(|q| q.source().to_string()),
        Some("named(Member.findByUsername)".to_string())
    );

    let declared = repo
        .invoke(&session, "findUser", Args::new().value("member3").value(30))
        .await?
        .into_list()?;
    assert_eq!(usernames(&declared), ["member3"]);

    let names = repo
        .invoke(&session, "findUsernameList", Args::new())
        .await?
        .into_scalars::<String>()?;
    assert_eq!(names, ["member1", "member2", "member3", "member4", "member5"]);

    let in_list = repo
        .invoke(
            &session,
            "findByNames",
            Args::new().value(vec!["member1", "member4"]),
        )
        .await?
        .into_list()?;
    assert_eq!(usernames(&in_list), ["member1", "member4"]);
    Ok(())
}

#[tokio::test]
async fn dto_projection_reads_association_columns() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();

    let dtos = fx
        .repository
        .invoke(&session, "findMemberDto", Args::new())
        .await?
        .into_dtos::<MemberDto>()?;
    assert_eq!(dtos.len(), 5);
    assert_eq!(dtos[0].username, "member1");
    assert_eq!(dtos[0].team_name.as_deref(), Some("teamA"));
    assert_eq!(dtos[4].team_name.as_deref(), Some("teamB"));
    assert!(dtos.iter().all(|d| d.id > 0));
    // 投影中的关联列一次批量读取
    assert_eq!(fx.teams.stats().batch_lookups, 1);
    Ok(())
}

#[tokio::test]
async fn return_shapes_enforce_multiplicity() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    let one = repo
        .invoke(&session, "findMemberByUsername", Args::new().value("member1"))
        .await?
        .into_one()?;
    assert_eq!(one.age, 10);

    let absent = repo
        .invoke(&session, "findOptionalByUsername", Args::new().value("nobody"))
        .await?
        .into_optional()?;
    assert!(absent.is_none());

    let missing = repo
        .invoke(&session, "findMemberByUsername", Args::new().value("nobody"))
        .await;
    assert!(matches!(missing, Err(DomainError::NoResult { .. })));

    let empty = repo
        .invoke(&session, "findListByUsername", Args::new().value("nobody"))
        .await?
        .into_list()?;
    assert!(empty.is_empty());

    // 重名后单值查询报 NonUniqueResult
    repo.save(&session, member("member1", 99, None)).await?;
    let duplicate = repo
        .invoke(&session, "findOptionalByUsername", Args::new().value("member1"))
        .await;
    assert!(matches!(
        duplicate,
        Err(DomainError::NonUniqueResult {
            expected: 1,
            actual: 2
        })
    ));
    Ok(())
}

#[tokio::test]
async fn call_time_argument_errors() -> AnyResult<()> {
    let fx = Fixture::new()?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    let unknown = repo.invoke(&session, "findByNickname", Args::new().value("x")).await;
    assert!(matches!(unknown, Err(DomainError::NotFound { .. })));

    // 元数不同视为另一个方法
    let arity = repo.invoke(&session, "findByUsername", Args::new()).await;
    assert!(matches!(arity, Err(DomainError::NotFound { .. })));

    let wrong_kind = repo
        .invoke(
            &session,
            "findByAge",
            Args::new().value(10).value(20),
        )
        .await;
    assert!(matches!(wrong_kind, Err(DomainError::InvalidArgument { .. })));

    let shape = repo
        .invoke(&session, "findListByUsername", Args::new().value("member1"))
        .await?
        .into_one();
    assert!(matches!(shape, Err(DomainError::TypeMismatch { .. })));
    Ok(())
}

#[tokio::test]
async fn page_with_count_query() -> AnyResult<()> {
    let fx = Fixture::new()?;
    let session = Session::anonymous();
    for i in 1..=5 {
        fx.repository
            .save(&session, member(&format!("member{i}"), 10, None))
            .await?;
    }

    let request = PageRequest::of_sorted(0, 3, Sort::by(Direction::Desc, ["username"]))?;
    let page = fx
        .repository
        .invoke(&session, "findByAge", Args::new().value(10).page(request))
        .await?
        .into_page()?;

    assert_eq!(page.content().len(), 3);
    assert_eq!(page.total_elements(), 5);
    assert_eq!(page.number(), 0);
    assert_eq!(page.total_pages(), 2);
    assert!(page.is_first());
    assert!(page.has_next());
    assert_eq!(usernames(page.content()), ["member5", "member4", "member3"]);

    let next = page.next_request().expect("second page");
    let last = fx
        .repository
        .invoke(&session, "findByAge", Args::new().value(10).page(next))
        .await?
        .into_page()?;
    assert_eq!(usernames(last.content()), ["member2", "member1"]);
    assert!(last.is_last());

    let json = serde_json::to_value(page.map(|m| m.username))?;
    assert_eq!(json["totalElements"], 5);
    assert_eq!(json["content"][0], "member5");
    assert_eq!(json["hasNext"], true);
    Ok(())
}

#[tokio::test]
async fn slice_skips_counting() -> AnyResult<()> {
    let fx = Fixture::new()?;
    let session = Session::anonymous();
    for i in 1..=5 {
        fx.repository
            .save(&session, member(&format!("member{i}"), 10, None))
            .await?;
    }
    fx.members.reset_stats();

    let request = PageRequest::of_sorted(0, 3, Sort::by(Direction::Desc, ["username"]))?;
    let slice = fx
        .repository
        .invoke(&session, "findSliceByAge", Args::new().value(10).page(request))
        .await?
        .into_slice()?;
    assert_eq!(slice.content().len(), 3);
    assert!(slice.has_next());
    assert_eq!(fx.members.stats().counts, 0);

    let json = serde_json::to_value(slice.map(|m| m.age))?;
    assert!(json["totalElements"].is_null());
    Ok(())
}

#[tokio::test]
async fn bulk_update_clears_identity_map() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    let before = repo
        .invoke(&session, "findMemberByUsername", Args::new().value("member5"))
        .await?
        .into_one()?;
    assert_eq!(before.age, 60);
    assert!(session.managed_count() > 0);

    let affected = repo
        .invoke(&session, "bulkAgePlus", Args::new().value(20))
        .await?
        .into_affected()?;
    assert_eq!(affected, 4);
    assert_eq!(session.managed_count(), 0);

    let after = repo
        .get_by_id(&session, before.id().expect("saved"))
        .await?;
    assert_eq!(after.age, 61);

    // 未匹配的 member1 保持原值
    let all = repo
        .find_all_sorted(&session, &Sort::by(Direction::Asc, ["username"]))
        .await?;
    let ages: Vec<i32> = all.iter().map(|m| m.age).collect();
    assert_eq!(ages, [10, 21, 31, 51, 61]);
    Ok(())
}

#[tokio::test]
async fn derived_delete_removes_and_detaches() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    let target = repo
        .invoke(&session, "findMemberByUsername", Args::new().value("member2"))
        .await?
        .into_one()?;
    let id = *target.id().expect("saved");
    assert!(session.contains::<Member>(&id));

    let removed = repo
        .invoke(&session, "deleteByUsername", Args::new().value("member2"))
        .await?
        .into_affected()?;
    assert_eq!(removed, 1);
    assert!(!session.contains::<Member>(&id));
    assert_eq!(repo.count(&session).await?, 4);
    Ok(())
}

#[tokio::test]
async fn fetch_join_loads_teams_in_one_round_trip() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    // 未声明抓取的查询只持有外键
    let plain = repo
        .invoke(&session, "findListByUsername", Args::new().value("member1"))
        .await?
        .into_list()?;
    assert!(!plain[0].team.is_loaded());
    assert!(plain[0].team.id().is_some());
    session.clear();

    let rows = repo
        .invoke(&session, "findMemberFetchJoin", Args::new())
        .await?
        .into_list()?;
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|m| m.team.is_loaded()));
    assert_eq!(
        rows[2].team.get().map(|t| t.name.as_str()),
        Some("teamB")
    );
    let stats = fx.teams.stats();
    assert_eq!(stats.batch_lookups, 1);
    assert_eq!(stats.lookups, 0);
    Ok(())
}

#[tokio::test]
async fn entity_graphs_and_find_all_override() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    // findAll 声明了实体图，CrudRepository::find_all 经由它执行
    let all = repo.find_all(&session).await?;
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|m| m.team.is_loaded()));

    let session = Session::anonymous();
    let graph = repo
        .invoke(&session, "findEntityGraphByUsername", Args::new().value("member4"))
        .await?
        .into_list()?;
    assert_eq!(
        graph[0].team.get().map(|t| t.name.as_str()),
        Some("teamB")
    );

    // 内置排序查询不经过覆盖
    let sorted = repo
        .find_all_sorted(&session, &Sort::by(Direction::Desc, ["age"]))
        .await?;
    assert_eq!(sorted[0].username, "member5");
    Ok(())
}

#[tokio::test]
async fn read_only_results_stay_unmanaged() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();

    let member = fx
        .repository
        .invoke(&session, "findReadOnlyByUsername", Args::new().value("member1"))
        .await?
        .into_one()?;
    assert_eq!(session.managed_count(), 0);

    // 未受管，按标识读取需要访问数据源
    fx.repository
        .find_by_id(&session, member.id().expect("saved"))
        .await?;
    assert_eq!(fx.members.stats().lookups, 1);
    Ok(())
}

#[tokio::test]
async fn pessimistic_lock_conflict_times_out() -> AnyResult<()> {
    let config = RepositoryConfig::builder().lock_timeout_ms(50).build();
    let fx = Fixture::with_config(config)?;
    fx.seed().await?;

    let holder = Session::anonymous();
    let locked = fx
        .repository
        .invoke(&holder, "findLockByUsername", Args::new().value("member1"))
        .await?
        .into_list()?;
    assert_eq!(locked.len(), 1);
    assert_eq!(holder.held_locks(), 1);

    let contender = Session::anonymous();
    let conflict = fx
        .repository
        .invoke(&contender, "findLockByUsername", Args::new().value("member1"))
        .await;
    assert!(matches!(conflict, Err(DomainError::ConcurrencyConflict { .. })));

    // 同一会话重复加锁不阻塞
    fx.repository
        .invoke(&holder, "findLockByUsername", Args::new().value("member1"))
        .await?;
    assert_eq!(holder.held_locks(), 1);

    holder.close();
    let relocked = fx
        .repository
        .invoke(&contender, "findLockByUsername", Args::new().value("member1"))
        .await?
        .into_list()?;
    assert_eq!(relocked.len(), 1);
    Ok(())
}

#[tokio::test]
async fn writes_wait_for_the_lock_holder() -> AnyResult<()> {
    let config = RepositoryConfig::builder().lock_timeout_ms(50).build();
    let fx = Fixture::with_config(config)?;
    fx.seed().await?;
    let repo = &fx.repository;

    let holder = Session::anonymous();
    let mut locked = repo
        .invoke(&holder, "findLockByUsername", Args::new().value("member1"))
        .await?
        .into_list()?;
    let mut row = locked.remove(0);
    let id = *row.id().expect("saved");

    let writer = Session::anonymous();
    let mut changed = row.clone();
    changed.age = 99;
    let saved = repo.save(&writer, changed).await;
    assert!(matches!(saved, Err(DomainError::ConcurrencyConflict { .. })));
    let deleted = repo.delete_by_id(&writer, &id).await;
    assert!(matches!(deleted, Err(DomainError::ConcurrencyConflict { .. })));
    let bulk = repo
        .invoke(&writer, "bulkAgePlus", Args::new().value(0))
        .await;
    assert!(matches!(bulk, Err(DomainError::ConcurrencyConflict { .. })));

    let stored: Vec<i32> = fx
        .members
        .select(&MatchAll, &Sort::by(Direction::Asc, ["username"]), Window::all())
        .await?
        .iter()
        .map(|m| m.age)
        .collect();
    assert_eq!(stored, [10, 20, 30, 50, 60]);

    // 持有者自己的写入不受影响
    row.age = 11;
    assert_eq!(repo.save(&holder, row).await?.age, 11);

    holder.close();
    repo.delete_by_id(&writer, &id).await?;
    assert_eq!(repo.count(&writer).await?, 4);
    Ok(())
}

#[tokio::test]
async fn custom_implementation_overrides_generated_method() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();

    assert_eq!(
        fx.repository.resolve("findMemberCustom", 0),
        Some(Origin::Custom)
    );
    assert_eq!(
        fx.repository.resolve("findByUsername", 1),
        Some(Origin::Generated)
    );
    assert!(fx.repository.compiled("findMemberCustom", 0).is_none());

    // 生成的版本只会匹配 "nobody"，自定义版本返回全部
    let rows = fx
        .repository
        .invoke(&session, "findMemberCustom", Args::new())
        .await?
        .into_list()?;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].username, "member1");
    Ok(())
}

#[tokio::test]
async fn specification_executor_accepts_closures() -> AnyResult<()> {
    let fx = Fixture::new()?;
    fx.seed().await?;
    let session = Session::anonymous();
    let repo = &fx.repository;

    let adults = spec_fn(|m: &Member| m.age >= 20);
    let rows = repo
        .find_all_matching(&session, &adults, &Sort::by(Direction::Asc, ["age"]))
        .await?;
    assert_eq!(usernames(&rows), ["member2", "member3", "member4", "member5"]);

    assert_eq!(repo.count_matching(&session, &adults).await?, 4);
    assert!(
        !repo
            .exists_matching(&session, &spec_fn(|m: &Member| m.age > 100))
            .await?
    );

    let page = repo
        .find_page_matching(&session, &adults, &PageRequest::of(1, 3)?)
        .await?;
    assert_eq!(page.total_elements(), 4);
    assert_eq!(usernames(page.content()), ["member5"]);
    Ok(())
}

#[tokio::test]
async fn audit_fields_follow_the_session_principal() -> AnyResult<()> {
    let fx = Fixture::new()?;
    let admin = Session::new(SessionContext::builder().principal("admin").build());

    let saved = fx
        .repository
        .save(&admin, member("member1", 10, None))
        .await?;
    let audit = saved.audit().expect("audited entity");
    assert_eq!(audit.created_by(), Some("admin"));
    assert_eq!(audit.created_at(), audit.updated_at());
    let created = audit.created_at();

    let editor = Session::new(SessionContext::builder().principal("editor").build());
    let mut changed = saved.clone();
    changed.age = 11;
    let updated = fx.repository.save(&editor, changed).await?;
    let audit = updated.audit().expect("audited entity");
    assert_eq!(audit.created_at(), created);
    assert_eq!(audit.created_by(), Some("admin"));
    assert_eq!(audit.last_modified_by(), Some("editor"));
    assert!(audit.updated_at() >= created);
    Ok(())
}
