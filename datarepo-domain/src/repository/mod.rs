//! 仓储（repository）
//!
//! - `crud`：通用 CRUD 与规约查询接口；
//! - `definition`/`factory`：仓储声明与装配（查询编译、自定义实现组合）；
//! - `composed`：装配结果，按 `(方法名, 元数)` 分派；
//! - `custom`：自定义实现协议与注册表；
//! - `outcome`：查询方法结果及其取值。
//!
mod composed;
mod crud;
mod custom;
mod definition;
mod factory;
mod outcome;

pub use composed::{Origin, Repository};
pub use crud::{CrudRepository, SpecificationExecutor};
pub use custom::{CustomContext, CustomInterface, CustomRegistry, CustomRepository};
pub use definition::RepositoryDefinition;
pub use factory::RepositoryFactory;
pub use outcome::QueryOutcome;
