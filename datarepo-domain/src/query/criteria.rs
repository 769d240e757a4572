use crate::value::Value;
use std::fmt;

/// 条件运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Between,
    In,
    NotIn,
    Like,
    NotLike,
    StartsWith,
    EndsWith,
    Contains,
    NotContains,
    IsNull,
    IsNotNull,
    IsTrue,
    IsFalse,
}

impl Operator {
    /// 运算符消耗的参数个数
    pub fn arity(&self) -> usize {
        match self {
            Operator::Between => 2,
            Operator::IsNull | Operator::IsNotNull | Operator::IsTrue | Operator::IsFalse => 0,
            _ => 1,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Like => "like",
            Operator::NotLike => "not like",
            Operator::StartsWith => "starts with",
            Operator::EndsWith => "ends with",
            Operator::Contains => "contains",
            Operator::NotContains => "not contains",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
            Operator::IsTrue => "is true",
            Operator::IsFalse => "is false",
        }
    }
}

/// 条件与前一条件的连接方式；`And` 优先级高于 `Or`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

/// 条件操作数
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// 字面量
    Literal(Value),
    /// 第 n 个值参数（从 0 开始，不计分页/排序参数）
    Positional(usize),
    /// 命名参数 `:name`
    Named(String),
}

impl Operand {
    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    pub fn positional(index: usize) -> Self {
        Operand::Positional(index)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Operand::Named(name.into())
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Operand::Literal(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Positional(i) => write!(f, "?{i}"),
            Operand::Named(n) => write!(f, ":{n}"),
        }
    }
}

/// 单个查询条件：`path operator operands`
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    path: String,
    operator: Operator,
    operands: Vec<Operand>,
    conjunction: Conjunction,
    ignore_case: bool,
}

impl Clause {
    pub fn new(path: impl Into<String>, operator: Operator, operands: Vec<Operand>) -> Self {
        Self {
            path: path.into(),
            operator,
            operands,
            conjunction: Conjunction::And,
            ignore_case: false,
        }
    }

    pub fn eq(path: impl Into<String>, operand: Operand) -> Self {
        Self::new(path, Operator::Eq, vec![operand])
    }

    pub fn not_eq(path: impl Into<String>, operand: Operand) -> Self {
        Self::new(path, Operator::NotEq, vec![operand])
    }

    pub fn lt(path: impl Into<String>, operand: Operand) -> Self {
        Self::new(path, Operator::Lt, vec![operand])
    }

    pub fn lte(path: impl Into<String>, operand: Operand) -> Self {
        Self::new(path, Operator::Lte, vec![operand])
    }

    pub fn gt(path: impl Into<String>, operand: Operand) -> Self {
        Self::new(path, Operator::Gt, vec![operand])
    }

    pub fn gte(path: impl Into<String>, operand: Operand) -> Self {
        Self::new(path, Operator::Gte, vec![operand])
    }

    pub fn between(path: impl Into<String>, low: Operand, high: Operand) -> Self {
        Self::new(path, Operator::Between, vec![low, high])
    }

    pub fn is_in(path: impl Into<String>, operand: Operand) -> Self {
        Self::new(path, Operator::In, vec![operand])
    }

    pub fn like(path: impl Into<String>, operand: Operand) -> Self {
        Self::new(path, Operator::Like, vec![operand])
    }

    pub fn is_null(path: impl Into<String>) -> Self {
        Self::new(path, Operator::IsNull, vec![])
    }

    pub fn is_not_null(path: impl Into<String>) -> Self {
        Self::new(path, Operator::IsNotNull, vec![])
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub(crate) fn joined_by(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = conjunction;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub(crate) fn operands_mut(&mut self) -> &mut [Operand] {
        &mut self.operands
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    pub fn is_ignore_case(&self) -> bool {
        self.ignore_case
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.operator.symbol())?;
        match self.operands.as_slice() {
            [] => Ok(()),
            [one] => write!(f, " {one}"),
            [low, high] => write!(f, " {low} and {high}"),
            many => {
                for op in many {
                    write!(f, " {op}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_matches_operator_kind() {
        assert_eq!(Operator::Between.arity(), 2);
        assert_eq!(Operator::IsNull.arity(), 0);
        assert_eq!(Operator::In.arity(), 1);
    }

    #[test]
    fn clause_renders_readably() {
        let c = Clause::between("age", Operand::positional(0), Operand::named("max"));
        assert_eq!(c.to_string(), "age between ?0 and :max");
        assert_eq!(Clause::is_null("team").to_string(), "team is null");
    }
}
