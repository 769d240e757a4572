//! 通用仓储基础库（datarepo-domain）
//!
//! 与具体 ORM 无关的仓储抽象：
//! - 实体与审计元数据建模（`entity`、`audit`），基于路径的字段访问（`record`、`value`）
//! - 由方法名派生查询、显式查询与命名查询（`query`）
//! - 分页与排序（`paging`）
//! - 会话、数据源协议与关联抓取（`persist`）
//! - CRUD/规约接口与仓储组合（`repository`）
//! - 配置（`config`）与统一错误（`error`）
//!
//! 典型用法：
//! 1. 用 `#[entity]` 定义实体，并为其提供 `DataSource` 实现（或使用 `InMemoryDataSource`）；
//! 2. 以 `RepositoryDefinition` 声明查询方法、命名查询、实体图与自定义接口；
//! 3. 通过 `RepositoryFactory::build` 装配仓储，所有配置错误在此处暴露；
//! 4. 在 `Session` 内调用 CRUD 操作或 `Repository::invoke`。
//!
pub mod audit;
pub mod config;
pub mod entity;
pub mod error;
pub mod paging;
pub mod persist;
pub mod query;
pub mod record;
pub mod repository;
pub mod specification;
pub mod value;

// 允许在本 crate 内部通过 ::datarepo_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::datarepo_domain 路径。
extern crate self as datarepo_domain;
