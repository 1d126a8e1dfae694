//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和设置。

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sea_orm::{ActiveValue::Set, EntityTrait};
use secrecy::SecretString;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use viewsync::backend::{CacheEntry, CacheStore, MemoryStore};
use viewsync::cache::{ArticleCache, CacheTtl};
use viewsync::config::DatabaseConfig;
use viewsync::database::{self, entity, ArticleSource, SeaOrmArticleSource};
use viewsync::model::{Article, ArticlePage, ArticleStatus, ArticleSummary};
use viewsync::service::{ArticleService, ServiceLimits};
use viewsync::sync::BackfillPool;
use viewsync::{Error, Result};

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 检查Redis是否可用（`REDIS_URL`，默认本地6379）
pub async fn is_redis_available() -> bool {
    let url = redis_url();
    let client = match redis::Client::open(url.as_str()) {
        Ok(c) => c,
        Err(_) => return false,
    };

    matches!(
        tokio::time::timeout(
            Duration::from_secs(1),
            client.get_multiplexed_async_connection(),
        )
        .await,
        Ok(Ok(_))
    )
}

pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// 建立内存 SQLite 数据源并建表
///
/// 内存库每个连接各自独立，连接池必须限制为单连接
pub async fn memory_source() -> SeaOrmArticleSource {
    let config = DatabaseConfig {
        url: SecretString::new("sqlite::memory:".to_string().into()),
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 5,
        auto_migrate: true,
    };
    let conn = database::connect(&config)
        .await
        .expect("failed to open in-memory sqlite");
    SeaOrmArticleSource::new(conn)
}

/// 插入一篇文章
pub async fn insert_article(
    source: &SeaOrmArticleSource,
    id: i64,
    views: i64,
    status: ArticleStatus,
    is_delete: bool,
) {
    let now = Utc::now();
    let model = entity::ActiveModel {
        id: Set(id),
        created_at: Set(now),
        updated_at: Set(now),
        title: Set(format!("article {}", id)),
        description: Set(format!("description of {}", id)),
        content: Set(format!("body of article {}", id)),
        author_name: Set("kirky".to_string()),
        views: Set(views),
        tags: Set("rust,cache".to_string()),
        cover: Set(String::new()),
        status: Set(status),
        is_delete: Set(is_delete),
    };
    entity::Entity::insert(model)
        .exec(source.connection())
        .await
        .expect("failed to insert article");
}

/// 插入ID为 1..=n 的公开文章，浏览数均为0
pub async fn seed_public(source: &SeaOrmArticleSource, n: i64) {
    for id in 1..=n {
        insert_article(source, id, 0, ArticleStatus::Public, false).await;
    }
}

pub async fn views_of(source: &SeaOrmArticleSource, id: i64) -> u64 {
    source.find_by_id(id).await.expect("article exists").views
}

pub fn test_ttl() -> CacheTtl {
    CacheTtl {
        content: 3600,
        viewer: 43200,
    }
}

/// 组装测试用编排服务
pub fn build_service(
    store: Arc<dyn CacheStore>,
    source: Arc<dyn ArticleSource>,
) -> ArticleService {
    ArticleService::new(
        ArticleCache::new(store, test_ttl()),
        source,
        Arc::new(BackfillPool::new(2, 64)),
        ServiceLimits::default(),
    )
}

/// 统计调用次数并可注入故障的数据源
pub struct CountingSource {
    inner: Arc<dyn ArticleSource>,
    pub reads: AtomicUsize,
    pub increments: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_list_ids: AtomicBool,
    pub fail_increment_for: Mutex<HashSet<i64>>,
}

impl CountingSource {
    pub fn new(inner: Arc<dyn ArticleSource>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            reads: AtomicUsize::new(0),
            increments: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_list_ids: AtomicBool::new(false),
            fail_increment_for: Mutex::new(HashSet::new()),
        })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Backend("injected source failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleSource for CountingSource {
    async fn list_public_ids(&self) -> Result<Vec<i64>> {
        if self.fail_list_ids.load(Ordering::SeqCst) {
            return Err(Error::Backend("injected list failure".to_string()));
        }
        self.inner.list_public_ids().await
    }

    async fn find_page(&self, page: u64, page_size: u64) -> Result<ArticlePage> {
        self.read()?;
        self.inner.find_page(page, page_size).await
    }

    async fn find_popular(&self, limit: u64) -> Result<Vec<ArticleSummary>> {
        self.read()?;
        self.inner.find_popular(limit).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Article> {
        self.read()?;
        self.inner.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>> {
        self.read()?;
        self.inner.find_by_ids(ids).await
    }

    async fn increment_views(&self, id: i64, delta: u64) -> Result<()> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        if self.fail_increment_for.lock().contains(&id) {
            return Err(Error::Backend(format!("injected increment failure for {}", id)));
        }
        self.inner.increment_views(id, delta).await
    }

    async fn increment_views_batch(&self, deltas: &HashMap<i64, u64>) -> Result<()> {
        self.inner.increment_views_batch(deltas).await
    }
}

/// 统计调用次数并可注入故障的缓存后端
pub struct CountingStore {
    inner: MemoryStore,
    pub gets: AtomicUsize,
    pub batches: AtomicUsize,
    pub entries_written: AtomicUsize,
    pub viewer_adds: AtomicUsize,
    /// 所有操作都失败
    pub fail_all: AtomicBool,
    /// 只有写入（批量写）失败
    pub fail_writes: AtomicBool,
    /// 只有估计值读取失败
    pub fail_estimates: AtomicBool,
    /// 删除这些键时失败
    pub fail_deletes_for: Mutex<HashSet<String>>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::default(),
            gets: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
            entries_written: AtomicUsize::new(0),
            viewer_adds: AtomicUsize::new(0),
            fail_all: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_estimates: AtomicBool::new(false),
            fail_deletes_for: Mutex::new(HashSet::new()),
        })
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn viewer_adds(&self) -> usize {
        self.viewer_adds.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Error::Backend("injected cache failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get(key).await
    }

    async fn set_many(&self, entries: Vec<CacheEntry>) -> Result<()> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.entries_written
            .fetch_add(entries.len(), Ordering::SeqCst);
        self.check()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Backend("injected write failure".to_string()));
        }
        self.inner.set_many(entries).await
    }

    async fn hll_add(&self, key: &str, member: &str, ttl: u64) -> Result<bool> {
        self.viewer_adds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.hll_add(key, member, ttl).await
    }

    async fn hll_count(&self, key: &str) -> Result<u64> {
        self.check()?;
        if self.fail_estimates.load(Ordering::SeqCst) {
            return Err(Error::Backend("injected estimate failure".to_string()));
        }
        self.inner.hll_count(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        if self.fail_deletes_for.lock().contains(key) {
            return Err(Error::Backend(format!("injected delete failure for {}", key)));
        }
        self.inner.delete(key).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        self.check()?;
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        self.check()?;
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.check()?;
        self.inner.set_members(key).await
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}
