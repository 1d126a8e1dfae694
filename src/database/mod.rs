//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 数据源模块
//!
//! 定义文章数据的权威来源接口，以及基于 SeaORM 的实现。

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::model::{Article, ArticlePage, ArticleSummary};
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

pub mod entity;
pub mod schema;
pub mod source;

pub use schema::ensure_schema;
pub use source::SeaOrmArticleSource;

/// 文章数据源接口
///
/// 数据库是浏览数和文章内容的唯一权威来源，缓存中的一切都可以由它重建。
/// 列表与排行查询只返回公开且未软删除的文章。
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// 所有公开且未删除文章的ID
    async fn list_public_ids(&self) -> Result<Vec<i64>>;

    /// 分页查询文章摘要
    ///
    /// # 参数
    ///
    /// * `page` - 页码（从1开始）
    /// * `page_size` - 每页条数
    ///
    /// # 返回值
    ///
    /// 返回按ID升序的当前页，以及同一可见性条件下的总数
    async fn find_page(&self, page: u64, page_size: u64) -> Result<ArticlePage>;

    /// 按浏览数降序取前 `limit` 篇，浏览数相同按ID升序
    async fn find_popular(&self, limit: u64) -> Result<Vec<ArticleSummary>>;

    /// 按ID读取完整文章
    ///
    /// 不应用可见性过滤，私有或已删除的文章也可以通过直接链接读取。
    /// 不存在时返回 `Error::ArticleNotFound`。
    async fn find_by_id(&self, id: i64) -> Result<Article>;

    /// 批量按ID读取，结果按ID升序，不存在的ID被忽略
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>>;

    /// 浏览数原子增加 `delta`
    async fn increment_views(&self, id: i64, delta: u64) -> Result<()>;

    /// 在单个事务中批量增加浏览数，任一失败则整体回滚
    async fn increment_views_batch(&self, deltas: &HashMap<i64, u64>) -> Result<()>;
}

/// 按配置建立数据库连接池
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(config.url.expose_secret().to_string());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let conn = Database::connect(opt).await?;
    info!(
        "database connected ({:?}), pool max={}",
        conn.get_database_backend(),
        config.max_connections
    );

    if config.auto_migrate {
        ensure_schema(&conn).await?;
    }
    Ok(conn)
}
