//! 持久化（persist）
//!
//! 仓储与存储之间的协议及其配套设施：
//! - 数据源协议与窗口、行锁（`DataSource`/`Window`/`RowLock`）；
//! - 基于内存的参考实现，附访问计数（`InMemoryDataSource`）；
//! - 会话：标识映射与行锁持有（`Session`）；
//! - 关联抓取（`AssociationFetcher`/`ManyToOne`）与分页执行（`paginator`）。
//!
//! 具体存储后端（如 Postgres）由上层实现 `DataSource` 并注入。
//!
mod data_source;
mod fetch;
mod in_memory;
pub mod paginator;
mod unit_of_work;

pub use data_source::{DataSource, RowLock, Window};
pub use fetch::{AssociationFetcher, ManyToOne};
pub use in_memory::{DataSourceStats, InMemoryDataSource};
pub use unit_of_work::{Session, SessionContext};
