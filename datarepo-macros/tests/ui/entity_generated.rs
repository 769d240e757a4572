use datarepo_domain::entity::{Entity, KeyStrategy, Reference};
use datarepo_domain::record::Record;
use datarepo_domain::value::Value;
use datarepo_macros::entity;

#[entity(name = "Team")]
struct Team {
    name: String,
}

#[entity(audit = true)]
#[derive(Clone)]
struct Member {
    username: String,
    age: i32,
    #[field(association)]
    team: Reference<Team>,
    #[field(skip)]
    scratch: Vec<u8>,
}

fn main() {
    assert_eq!(Member::TYPE, "Member");
    assert_eq!(Member::KEY_STRATEGY, KeyStrategy::Generated);
    assert!(Member::has_path("team.name"));
    assert!(Member::has_path("created_at"));
    assert!(!Member::has_path("scratch"));

    let team = Team {
        id: Some(7),
        name: "teamA".into(),
    };
    let mut member = Member {
        id: None,
        audit: Default::default(),
        username: "member1".into(),
        age: 10,
        team: Reference::of(&team),
        scratch: Vec::new(),
    };
    assert!(member.is_new());
    assert_eq!(member.field("team"), Some(Value::Int(7)));
    assert_eq!(member.field("team.name"), Some(Value::Text("teamA".into())));

    member.set_field("age", Value::Int(11)).unwrap();
    assert_eq!(member.age, 11);
    assert!(member.set_field("scratch", Value::Null).is_err());

    member.set_id(1);
    assert!(!member.is_new());
    let _ = format!("{member:?}");
}
