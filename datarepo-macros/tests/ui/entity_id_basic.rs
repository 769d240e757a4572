use datarepo_domain::value::{FromValue, IntoValue, Value};
use datarepo_macros::entity_id;
use uuid::Uuid;

#[entity_id]
struct UserId(Uuid);

#[entity_id(debug = false)]
struct ProfileId(String);

impl std::fmt::Debug for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProfileId(..)")
    }
}

fn main() {
    let id = UserId::new(Uuid::new_v4());
    let _ = format!("{:?}", id); // 默认启用 Debug

    let pid: ProfileId = "p-1".parse().unwrap();
    assert_eq!(pid.to_string(), "p-1");
    let _ = format!("{:?}", pid); // 手写 Debug 可编译说明未自动派生

    let value = pid.clone().into_value();
    assert_eq!(value, Value::Text("p-1".into()));
    assert!(ProfileId::from_value(value).unwrap() == pid);
}
