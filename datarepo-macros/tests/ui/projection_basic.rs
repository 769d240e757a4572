use datarepo_domain::query::FromTuple;
use datarepo_domain::value::Value;
use datarepo_macros::projection;

#[projection]
struct MemberDto {
    id: i64,
    username: String,
    team_name: Option<String>,
}

#[projection]
struct UsernameOnly(String);

fn main() {
    assert_eq!(MemberDto::ARITY, 3);
    let dto = MemberDto::from_tuple(vec![
        Value::Int(1),
        Value::Text("member1".into()),
        Value::Null,
    ])
    .unwrap();
    assert_eq!(dto.id, 1);
    assert_eq!(dto.username, "member1");
    assert!(dto.team_name.is_none());
    let _ = dto.clone();

    assert!(MemberDto::from_tuple(vec![Value::Int(1)]).is_err());
    assert_eq!(UsernameOnly::ARITY, 1);
}
