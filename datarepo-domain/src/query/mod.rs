//! 查询（query）
//!
//! - `criteria`/`spec`：显式查询结构与构建器；
//! - `method_name`：由方法名派生查询；
//! - `method`/`compiler`：查询方法声明及其在仓储构建期的编译与校验；
//! - `predicate`：绑定后的条件求值；
//! - `projection`：按位置映射到 DTO。
//!
mod compiler;
mod criteria;
mod method;
mod method_name;
mod predicate;
mod projection;
mod spec;

pub use compiler::{CompileContext, CompiledQuery, QuerySource, compile};
pub use criteria::{Clause, Conjunction, Operand, Operator};
pub use method::{Arg, Args, MethodKey, ParamDecl, ParamKind, QueryMethod, ResultKind, ReturnShape};
pub use method_name::{derive_query, is_derivable};
pub use predicate::{Condition, Predicate, like};
pub use projection::{FromTuple, expect_arity};
pub use spec::{AssignKind, Assignment, LockMode, Projection, QuerySpec, Subject};
