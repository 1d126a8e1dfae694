//! viewsync - 缓存旁路一致性引擎
//!
//! 在 Redis 缓存和 SQL 数据库之间维护文章数据的一致性：
//! 读取走 Cache-Aside，浏览数先写入 HyperLogLog 近似计数器，
//! 再由周期调度器对账到数据库。

pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod keys;
pub mod manager;
pub mod model;
pub mod response;
pub mod serialization;
pub mod service;
pub mod sync;
pub mod telemetry;

// Re-export commonly used items
pub use cache::{ArticleCache, CacheTtl, PageLookup};
pub use config::Config;
pub use error::{Error, Result};
pub use manager::ViewSyncManager;
pub use model::{Article, ArticlePage, ArticleStatus, ArticleSummary};
pub use service::{ArticleService, ReconcileReport, ViewReconciler};
pub use sync::{Scheduler, SchedulerConfig, Task, TaskContext};

/// viewsync 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
