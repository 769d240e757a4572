//! 谓词求值
//!
//! 将已绑定（只含字面量）的条件列表编译为“AND 组的 OR”结构，
//! 并作为 [`Specification`] 在记录上求值。与 SQL 一致，`NULL` 参与的比较一律为假。
//!
use super::criteria::{Clause, Conjunction, Operator};
use crate::error::{DomainError, DomainResult};
use crate::record::Record;
use crate::specification::Specification;
use crate::value::Value;
use std::cmp::Ordering;

static NULL: Value = Value::Null;

/// 单个已绑定条件
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    path: String,
    operator: Operator,
    operands: Vec<Value>,
    ignore_case: bool,
}

impl Condition {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn test<R: Record + ?Sized>(&self, record: &R) -> bool {
        let mut value = record.field(&self.path).unwrap_or(Value::Null);
        match self.operator {
            Operator::IsNull => return value.is_null(),
            Operator::IsNotNull => return !value.is_null(),
            Operator::IsTrue => return value == Value::Bool(true),
            Operator::IsFalse => return value == Value::Bool(false),
            _ => {}
        }
        if value.is_null() {
            return false;
        }

        let lowered;
        let operands: &[Value] = if self.ignore_case {
            value = value.lowercase();
            lowered = self.operands.iter().map(Value::lowercase).collect::<Vec<_>>();
            &lowered
        } else {
            &self.operands
        };
        let first = operands.first().unwrap_or(&NULL);

        match self.operator {
            Operator::Eq => value.loosely_eq(first),
            Operator::NotEq => !first.is_null() && !value.loosely_eq(first),
            Operator::Lt => value.compare(first) == Some(Ordering::Less),
            Operator::Lte => matches!(value.compare(first), Some(Ordering::Less | Ordering::Equal)),
            Operator::Gt => value.compare(first) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                value.compare(first),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Between => {
                let high = operands.get(1).unwrap_or(&NULL);
                matches!(
                    value.compare(first),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(value.compare(high), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::In => in_list(&value, first),
            Operator::NotIn => !first.is_null() && !in_list(&value, first),
            Operator::Like => text_op(&value, first, like),
            Operator::NotLike => !first.is_null() && !text_op(&value, first, like),
            Operator::StartsWith => text_op(&value, first, |v, p| v.starts_with(p)),
            Operator::EndsWith => text_op(&value, first, |v, p| v.ends_with(p)),
            Operator::Contains => contains(&value, first),
            Operator::NotContains => !first.is_null() && !contains(&value, first),
            // 一元运算符已在上方返回
            Operator::IsNull | Operator::IsNotNull | Operator::IsTrue | Operator::IsFalse => false,
        }
    }
}

fn in_list(value: &Value, candidates: &Value) -> bool {
    match candidates {
        Value::List(items) => items.iter().any(|c| value.loosely_eq(c)),
        Value::Null => false,
        single => value.loosely_eq(single),
    }
}

fn text_op(value: &Value, pattern: &Value, f: impl Fn(&str, &str) -> bool) -> bool {
    match (value.as_text(), pattern.as_text()) {
        (Some(v), Some(p)) => f(v, p),
        _ => false,
    }
}

fn contains(value: &Value, needle: &Value) -> bool {
    match value {
        Value::List(items) => items.iter().any(|i| i.loosely_eq(needle)),
        _ => text_op(value, needle, |v, p| v.contains(p)),
    }
}

/// SQL `LIKE`：`%` 匹配任意长度，`_` 匹配单个字符
pub fn like(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    // dp[j]：pattern 前 j 个字符能否匹配 text 的当前前缀
    let mut dp = vec![false; p.len() + 1];
    dp[0] = true;
    for j in 1..=p.len() {
        dp[j] = dp[j - 1] && p[j - 1] == '%';
    }
    for &c in &t {
        let mut prev_diag = dp[0];
        dp[0] = false;
        for j in 1..=p.len() {
            let keep = dp[j];
            dp[j] = match p[j - 1] {
                '%' => dp[j - 1] || dp[j],
                '_' => prev_diag,
                pc => prev_diag && pc == c,
            };
            prev_diag = keep;
        }
    }
    dp[p.len()]
}

/// 已绑定谓词：外层 OR，内层 AND；空谓词匹配所有记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    groups: Vec<Vec<Condition>>,
}

impl Predicate {
    pub fn always() -> Self {
        Self::default()
    }

    /// 由已绑定条件构建；仍含参数占位的条件会被拒绝
    pub fn from_clauses(clauses: &[Clause]) -> DomainResult<Self> {
        let mut groups: Vec<Vec<Condition>> = Vec::new();
        for clause in clauses {
            let operands = clause
                .operands()
                .iter()
                .map(|op| {
                    op.as_literal().cloned().ok_or_else(|| {
                        DomainError::invalid_argument(format!(
                            "unbound operand {op} in condition on '{}'",
                            clause.path()
                        ))
                    })
                })
                .collect::<DomainResult<Vec<_>>>()?;
            if operands.len() != clause.operator().arity() {
                return Err(DomainError::invalid_argument(format!(
                    "operator '{}' on '{}' expects {} operand(s), got {}",
                    clause.operator().symbol(),
                    clause.path(),
                    clause.operator().arity(),
                    operands.len()
                )));
            }
            let condition = Condition {
                path: clause.path().to_string(),
                operator: clause.operator(),
                operands,
                ignore_case: clause.is_ignore_case(),
            };
            match (clause.conjunction(), groups.last_mut()) {
                (Conjunction::And, Some(group)) => group.push(condition),
                _ => groups.push(vec![condition]),
            }
        }
        Ok(Self { groups })
    }

    pub fn is_always(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[Vec<Condition>] {
        &self.groups
    }

    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.groups.is_empty()
            || self
                .groups
                .iter()
                .any(|group| group.iter().all(|c| c.test(record)))
    }
}

impl<E: Record> Specification<E> for Predicate {
    fn is_satisfied_by(&self, candidate: &E) -> bool {
        self.matches(candidate)
    }
}
