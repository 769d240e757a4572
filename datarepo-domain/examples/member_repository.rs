/// 成员仓储示例
/// 演示派生查询、分页、抓取关联、批量更新与自定义实现覆盖；
/// 通过 `RUST_LOG=datarepo_domain=trace` 观察查询编译与执行日志
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use datarepo_domain::config::RepositoryConfig;
use datarepo_domain::entity::Reference;
use datarepo_domain::error::DomainResult;
use datarepo_domain::paging::{Direction, PageRequest, Sort};
use datarepo_domain::persist::{
    DataSource, InMemoryDataSource, ManyToOne, Session, SessionContext, Window,
};
use datarepo_domain::query::{Args, Clause, MethodKey, Operand, QueryMethod, QuerySpec};
use datarepo_domain::repository::{
    CrudRepository, CustomContext, CustomInterface, CustomRepository, QueryOutcome,
    RepositoryDefinition, RepositoryFactory,
};
use datarepo_domain::specification::spec_fn;
use datarepo_macros::{entity, projection};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// 实体与投影
// ============================================================================

#[entity(name = "Team")]
struct Team {
    name: String,
}

#[entity]
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

// ============================================================================
// 自定义实现：年龄不小于 20 的成员
// ============================================================================

struct MemberRepositoryImpl;

#[async_trait]
impl CustomRepository<Member> for MemberRepositoryImpl {
    fn methods(&self) -> Vec<MethodKey> {
        vec![MethodKey::new("findMemberCustom", 0)]
    }

    async fn invoke(
        &self,
        ctx: CustomContext<'_, Member>,
        _method: &MethodKey,
        _args: Args,
    ) -> DomainResult<QueryOutcome<Member>> {
        let adults = spec_fn(|m: &Member| m.age >= 20);
        let rows = ctx
            .source()
            .select(&adults, &Sort::by(Direction::Asc, ["age"]), Window::all())
            .await?;
        Ok(QueryOutcome::List(ctx.session().merge(rows)))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,datarepo_domain=debug")),
        )
        .init();

    // 默认值 → datarepo.toml（可缺省）→ DATAREPO_* 环境变量
    let config = RepositoryConfig::load("datarepo.toml")?;
    let factory = RepositoryFactory::new(config);
    factory.register_custom::<Member>("MemberRepositoryImpl", Arc::new(MemberRepositoryImpl))?;

    let teams = InMemoryDataSource::<Team>::shared();
    let members = InMemoryDataSource::<Member>::shared();
    let team_source: Arc<dyn DataSource<Team>> = teams.clone();
    let member_source: Arc<dyn DataSource<Member>> = members.clone();

    let team_repository =
        factory.build(RepositoryDefinition::<Team>::new("TeamRepository"), team_source.clone())?;
    let definition = RepositoryDefinition::<Member>::new("MemberRepository")
        .fetcher(ManyToOne::new("team", team_source, |m: &mut Member| &mut m.team))
        .custom(CustomInterface::new("MemberRepositoryCustom").method("findMemberCustom", 0))
        .method(QueryMethod::list("findByUsernameAndAgeGreaterThan").param("username").param("age"))
        .method(QueryMethod::page("findByAge").param("age").pageable())
        .method(
            QueryMethod::list("findMemberDto")
                .query(QuerySpec::select().project_tuple(["id", "username", "team.name"]))
                .returning_dto::<MemberDto>(),
        )
        .method(QueryMethod::list("findMemberFetchJoin").query(QuerySpec::select().fetch("team")))
        .method(
            QueryMethod::modifying("bulkAgePlus").param("age").query(
                QuerySpec::update()
                    .filter(Clause::gte("age", Operand::named("age")))
                    .increment("age", Operand::literal(1)),
            ),
        );
    let repository = factory.build(definition, member_source)?;

    let session = Session::new(SessionContext::builder().principal("admin").build());
    let team_a = team_repository
        .save(&session, Team { id: None, name: "teamA".into() })
        .await?;
    let team_b = team_repository
        .save(&session, Team { id: None, name: "teamB".into() })
        .await?;
    for (i, age) in [10, 20, 30, 50, 60].into_iter().enumerate() {
        let team = if i < 2 { &team_a } else { &team_b };
        repository
            .save(
                &session,
                Member {
                    id: None,
                    username: format!("member{}", i + 1),
                    age,
                    team: Reference::of(team),
                },
            )
            .await?;
    }
    session.close();

    let session = Session::new(SessionContext::builder().principal("admin").build());

    let found = repository
        .invoke(
            &session,
            "findByUsernameAndAgeGreaterThan",
            Args::new().value("member3").value(15),
        )
        .await?
        .into_list()?;
    println!("derived query: {found:?}");

    let request = PageRequest::of_sorted(0, 3, Sort::by(Direction::Desc, ["username"]))?;
    let page = repository
        .invoke(&session, "findByAge", Args::new().value(10).page(request))
        .await?
        .into_page()?;
    println!(
        "page: {}",
        serde_json::to_string(&page.map(|m| m.username))?
    );

    let dtos = repository
        .invoke(&session, "findMemberDto", Args::new())
        .await?
        .into_dtos::<MemberDto>()?;
    println!("dtos: {dtos:?}");

    teams.reset_stats();
    let joined = repository
        .invoke(&session, "findMemberFetchJoin", Args::new())
        .await?
        .into_list()?;
    println!(
        "fetch join loaded {} members with {} team round trip(s)",
        joined.len(),
        teams.stats().batch_lookups
    );

    let affected = repository
        .invoke(&session, "bulkAgePlus", Args::new().value(20))
        .await?
        .into_affected()?;
    println!(
        "bulk update affected {affected} rows, {} still managed",
        session.managed_count()
    );

    let custom = repository
        .invoke(&session, "findMemberCustom", Args::new())
        .await?
        .into_list()?;
    println!("custom: {:?}", custom.iter().map(|m| (&m.username, m.age)).collect::<Vec<_>>());

    println!("member source stats: {:?}", members.stats());
    session.close();
    Ok(())
}
