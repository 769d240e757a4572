//! 方法名派生查询
//!
//! 将 `findTop3ByUsernameAndAgeGreaterThanOrderByAgeDesc` 这样的方法名
//! 解析为 [`QuerySpec`]，操作数按条件出现顺序绑定为位置参数。
//!
//! - 前缀：`find|read|get|query|search|stream|count|exists|delete|remove`；
//! - 主体（前缀与 `By` 之间）：识别 `Distinct`、`Top<N>`/`First<N>`，其余单词忽略；
//! - 谓词：先按 `Or` 再按 `And` 切分，末尾关键字决定运算符；
//! - 排序：谓词部分中的 `OrderBy` 之后，无条件时写作 `findAllByOrderByAge`；
//! - 属性：驼峰转下划线，不存在时按大写边界拆分为关联路径，`_` 强制拆分。
//!
use super::criteria::{Clause, Operand, Operator};
use super::spec::QuerySpec;
use crate::error::{DomainError, DomainResult};
use crate::paging::{Direction, Order};
use crate::record::Record;
use regex::Regex;
use std::sync::LazyLock;

static PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(find|read|get|query|search|stream|count|exists|delete|remove)([A-Z0-9_].*)?$")
        .expect("prefix regex is valid")
});

static WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_|[A-Z][^A-Z_]*|[^A-Z_]+").expect("word regex is valid"));

static LIMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Top|First)(\d*)$").expect("limit regex is valid"));

/// 方法名是否以可派生的前缀开头
pub fn is_derivable(method: &str) -> bool {
    PREFIX.is_match(method)
}

/// 由方法名派生查询；属性路径以 `E::has_path` 校验
pub fn derive_query<E: Record>(entity: &str, method: &str) -> DomainResult<QuerySpec> {
    let caps = PREFIX.captures(method).ok_or_else(|| {
        DomainError::configuration(format!(
            "no query can be derived from method name '{method}' on {entity}"
        ))
    })?;
    let prefix = caps.get(1).map_or("", |m| m.as_str());
    let rest = caps.get(2).map_or("", |m| m.as_str());
    let words: Vec<&str> = WORDS.find_iter(rest).map(|m| m.as_str()).collect();

    // 主体止于第一个 `By`，`OrderBy` 只在谓词部分识别
    let (subject_words, body) = match words.iter().position(|w| *w == "By") {
        Some(at) => (&words[..at], &words[at + 1..]),
        None => (&words[..], &[][..]),
    };
    let (predicate_words, order_words) = match find_pair(body, "Order", "By") {
        Some(at) => (&body[..at], Some(&body[at + 2..])),
        None => (body, None),
    };

    let mut spec = match prefix {
        "count" => QuerySpec::count(),
        "exists" => QuerySpec::exists(),
        "delete" | "remove" => QuerySpec::delete(),
        _ => QuerySpec::select(),
    };

    for word in subject_words {
        if *word == "Distinct" {
            spec = spec.distinct();
        } else if let Some(c) = LIMIT.captures(word) {
            let digits = c.get(1).map_or("", |m| m.as_str());
            let n = if digits.is_empty() {
                1
            } else {
                digits.parse::<u64>().map_err(|e| {
                    DomainError::configuration(format!("invalid limit in '{method}': {e}"))
                })?
            };
            if n == 0 {
                return Err(DomainError::configuration(format!(
                    "limit in '{method}' must be greater than zero"
                )));
            }
            spec = spec.limit(n);
        }
    }

    let mut param = 0usize;
    let (predicate_words, all_ignore_case) = strip_all_ignore_case(predicate_words);
    for (gi, group) in split_on(predicate_words, "Or").into_iter().enumerate() {
        for (pi, part) in split_on(group, "And").into_iter().enumerate() {
            let mut clause = parse_part::<E>(entity, method, part, &mut param)?;
            if all_ignore_case && clause.operator().arity() > 0 {
                clause = clause.ignoring_case();
            }
            spec = if gi > 0 && pi == 0 {
                spec.or(clause)
            } else {
                spec.and(clause)
            };
        }
    }

    if let Some(words) = order_words {
        for order in parse_order::<E>(entity, method, words)? {
            spec = spec.order_by(order);
        }
    }

    Ok(spec)
}

fn find_pair(words: &[&str], first: &str, second: &str) -> Option<usize> {
    words
        .windows(2)
        .position(|w| w[0] == first && w[1] == second)
}

fn strip_all_ignore_case<'a, 'b>(words: &'a [&'b str]) -> (&'a [&'b str], bool) {
    match words {
        [head @ .., "All", "Ignore" | "Ignoring", "Case"] => (head, true),
        _ => (words, false),
    }
}

/// 按分隔单词切分；空输入返回空列表
fn split_on<'a, 'b>(words: &'a [&'b str], sep: &str) -> Vec<&'a [&'b str]> {
    if words.is_empty() {
        return Vec::new();
    }
    words.split(|w| *w == sep).collect()
}

fn keyword(s: &str) -> Option<Operator> {
    let op = match s {
        "IsNotNull" | "NotNull" => Operator::IsNotNull,
        "IsNull" | "Null" => Operator::IsNull,
        "IsLessThanEqual" | "LessThanEqual" => Operator::Lte,
        "IsLessThan" | "LessThan" | "IsBefore" | "Before" => Operator::Lt,
        "IsGreaterThanEqual" | "GreaterThanEqual" => Operator::Gte,
        "IsGreaterThan" | "GreaterThan" | "IsAfter" | "After" => Operator::Gt,
        "IsBetween" | "Between" => Operator::Between,
        "IsNotIn" | "NotIn" => Operator::NotIn,
        "IsIn" | "In" => Operator::In,
        "IsNotLike" | "NotLike" => Operator::NotLike,
        "IsLike" | "Like" => Operator::Like,
        "IsStartingWith" | "StartingWith" | "StartsWith" => Operator::StartsWith,
        "IsEndingWith" | "EndingWith" | "EndsWith" => Operator::EndsWith,
        "IsNotContaining" | "NotContaining" => Operator::NotContains,
        "IsContaining" | "Containing" | "Contains" => Operator::Contains,
        "IsTrue" | "True" => Operator::IsTrue,
        "IsFalse" | "False" => Operator::IsFalse,
        "IsNot" | "Not" => Operator::NotEq,
        "Is" | "Equals" | "IsEquals" => Operator::Eq,
        _ => return None,
    };
    Some(op)
}

fn parse_part<E: Record>(
    entity: &str,
    method: &str,
    part: &[&str],
    param: &mut usize,
) -> DomainResult<Clause> {
    let (mut words, ignore_case) = match part {
        [head @ .., "Ignore" | "Ignoring", "Case"] => (head, true),
        _ => (part, false),
    };

    let mut operator = Operator::Eq;
    let longest = words.len().saturating_sub(1).min(4);
    for k in (1..=longest).rev() {
        let suffix: String = words[words.len() - k..].concat();
        if let Some(op) = keyword(&suffix) {
            operator = op;
            words = &words[..words.len() - k];
            break;
        }
    }

    if words.is_empty() {
        return Err(DomainError::configuration(format!(
            "missing property in predicate of '{method}'"
        )));
    }
    let path = resolve_property::<E>(words).ok_or_else(|| {
        DomainError::configuration(format!(
            "no property '{}' found for type {entity} (method '{method}')",
            words.concat()
        ))
    })?;

    let operands = (0..operator.arity())
        .map(|_| {
            let op = Operand::positional(*param);
            *param += 1;
            op
        })
        .collect();
    let clause = Clause::new(path, operator, operands);
    Ok(if ignore_case {
        clause.ignoring_case()
    } else {
        clause
    })
}

fn parse_order<E: Record>(entity: &str, method: &str, words: &[&str]) -> DomainResult<Vec<Order>> {
    let mut orders = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    for word in words {
        let direction = match *word {
            "Asc" => Direction::Asc,
            "Desc" => Direction::Desc,
            other => {
                pending.push(other);
                continue;
            }
        };
        orders.push(Order::new(direction, order_property::<E>(entity, method, &pending)?));
        pending.clear();
    }
    if !pending.is_empty() {
        orders.push(Order::asc(order_property::<E>(entity, method, &pending)?));
    }
    if orders.is_empty() {
        return Err(DomainError::configuration(format!(
            "empty OrderBy clause in '{method}'"
        )));
    }
    Ok(orders)
}

fn order_property<E: Record>(entity: &str, method: &str, words: &[&str]) -> DomainResult<String> {
    if words.is_empty() {
        return Err(DomainError::configuration(format!(
            "missing property in OrderBy of '{method}'"
        )));
    }
    resolve_property::<E>(words).ok_or_else(|| {
        DomainError::configuration(format!(
            "no property '{}' found for type {entity} (OrderBy of '{method}')",
            words.concat()
        ))
    })
}

fn snake(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// 解析属性路径：`_` 显式分段；否则先整体匹配，再从右向左尝试拆分为关联路径
fn resolve_property<E: Record>(words: &[&str]) -> Option<String> {
    if words.contains(&"_") {
        let path = words
            .split(|w| *w == "_")
            .filter(|seg| !seg.is_empty())
            .map(snake)
            .collect::<Vec<_>>()
            .join(".");
        return E::has_path(&path).then_some(path);
    }
    candidates(words).into_iter().find(|p| E::has_path(p))
}

fn candidates(words: &[&str]) -> Vec<String> {
    let mut out = vec![snake(words)];
    for i in (1..words.len()).rev() {
        let head = snake(&words[..i]);
        for tail in candidates(&words[i..]) {
            out.push(format!("{head}.{tail}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::criteria::Conjunction;
    use crate::query::spec::Subject;
    use crate::value::Value;

    struct Member;

    impl Record for Member {
        fn has_path(path: &str) -> bool {
            matches!(
                path,
                "id" | "username"
                    | "age"
                    | "created_at"
                    | "active"
                    | "team"
                    | "team.id"
                    | "team.name"
            )
        }
        fn field(&self, _path: &str) -> Option<Value> {
            None
        }
        fn set_field(&mut self, _path: &str, _value: Value) -> DomainResult<()> {
            Ok(())
        }
    }

    fn derive(method: &str) -> QuerySpec {
        derive_query::<Member>("Member", method).unwrap()
    }

    #[test]
    fn and_with_greater_than_binds_positionally() {
        let spec = derive("findByUsernameAndAgeGreaterThan");
        assert_eq!(spec.subject(), Subject::Find);
        let clauses = spec.clauses();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].path(), "username");
        assert_eq!(clauses[0].operator(), Operator::Eq);
        assert_eq!(clauses[0].operands(), &[Operand::positional(0)]);
        assert_eq!(clauses[1].path(), "age");
        assert_eq!(clauses[1].operator(), Operator::Gt);
        assert_eq!(clauses[1].operands(), &[Operand::positional(1)]);
    }

    #[test]
    fn filler_words_in_subject_are_ignored() {
        let spec = derive("findTop3HelloBy");
        assert_eq!(spec.max_results(), Some(3));
        assert!(spec.clauses().is_empty());

        let first = derive("findFirstByUsername");
        assert_eq!(first.max_results(), Some(1));

        let all = derive("findAll");
        assert!(all.clauses().is_empty());
        assert_eq!(all.max_results(), None);

        let dto = derive("findMemberByUsername");
        assert_eq!(dto.clauses()[0].path(), "username");

        // 主体中的 Order 不是排序子句
        let order = derive("findOrderByUsername");
        assert_eq!(order.clauses().len(), 1);
        assert_eq!(order.clauses()[0].path(), "username");
        assert!(order.order().is_unsorted());
    }

    #[test]
    fn order_by_without_conditions() {
        let spec = derive("findAllByOrderByAgeDesc");
        assert!(spec.clauses().is_empty());
        assert_eq!(spec.order().orders()[0].property(), "age");
        assert_eq!(spec.order().orders()[0].direction(), Direction::Desc);
    }

    #[test]
    fn or_groups_and_keywords() {
        let spec = derive("findDistinctByAgeBetweenOrUsernameIsNullOrActiveTrue");
        assert!(spec.is_distinct());
        let c = spec.clauses();
        assert_eq!(c[0].operator(), Operator::Between);
        assert_eq!(c[0].operands().len(), 2);
        assert_eq!(c[1].operator(), Operator::IsNull);
        assert_eq!(c[1].conjunction(), Conjunction::Or);
        assert!(c[1].operands().is_empty());
        assert_eq!(c[2].operator(), Operator::IsTrue);
    }

    #[test]
    fn association_paths_are_resolved() {
        let spec = derive("findByTeamName");
        assert_eq!(spec.clauses()[0].path(), "team.name");

        let explicit = derive("findByTeam_Name");
        assert_eq!(explicit.clauses()[0].path(), "team.name");

        let snake = derive("findByCreatedAtAfter");
        assert_eq!(snake.clauses()[0].path(), "created_at");
        assert_eq!(snake.clauses()[0].operator(), Operator::Gt);
    }

    #[test]
    fn ignore_case_and_order_by() {
        let spec = derive("findByUsernameIgnoreCaseOrderByAgeDescUsername");
        assert!(spec.clauses()[0].is_ignore_case());
        let orders = spec.order().orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].property(), "age");
        assert_eq!(orders[0].direction(), Direction::Desc);
        assert_eq!(orders[1].property(), "username");
        assert_eq!(orders[1].direction(), Direction::Asc);

        let all = derive("findByUsernameAndTeamNameAllIgnoreCase");
        assert!(all.clauses().iter().all(|c| c.is_ignore_case()));
    }

    #[test]
    fn subjects_follow_prefix() {
        assert_eq!(derive("countByAge").subject(), Subject::Count);
        assert_eq!(derive("existsByUsername").subject(), Subject::Exists);
        assert_eq!(derive("deleteByAgeLessThan").subject(), Subject::Delete);
        assert_eq!(derive("removeByAge").subject(), Subject::Delete);
        assert_eq!(derive("readByAgeIn").clauses()[0].operator(), Operator::In);
        assert_eq!(derive("getByAgeNotIn").clauses()[0].operator(), Operator::NotIn);
    }

    #[test]
    fn unknown_properties_and_prefixes_are_configuration_errors() {
        let err = derive_query::<Member>("Member", "findByNickname").unwrap_err();
        assert!(err.is_configuration());
        let err = derive_query::<Member>("Member", "fetchByUsername").unwrap_err();
        assert!(err.is_configuration());
        let err = derive_query::<Member>("Member", "findTop0By").unwrap_err();
        assert!(err.is_configuration());
        assert!(is_derivable("findAll"));
        assert!(!is_derivable("bulkAgePlus"));
    }
}
