//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了引擎管理器，负责组装缓存、数据源、回填工作池和对账调度器。

use crate::backend::{CacheStore, RedisStore};
use crate::cache::{ArticleCache, CacheTtl};
use crate::config::Config;
use crate::database::{self, ArticleSource, SeaOrmArticleSource};
use crate::error::{Error, Result};
use crate::service::{ArticleService, ServiceLimits, ViewReconciler};
use crate::sync::{BackfillPool, Scheduler, SchedulerConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// 引擎管理器
///
/// 持有编排服务和对账调度器，负责启动和优雅关闭
pub struct ViewSyncManager {
    config: Config,
    service: ArticleService,
    scheduler: Scheduler,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for ViewSyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewSyncManager")
            .field("service", &self.service)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl ViewSyncManager {
    /// 根据配置连接 Redis 和数据库并组装引擎
    ///
    /// # 参数
    ///
    /// * `config` - 引擎配置
    ///
    /// # 返回值
    ///
    /// 返回组装好的管理器（调度器尚未启动）或错误
    #[instrument(skip(config), level = "info")]
    pub async fn init(config: Config) -> Result<Self> {
        config.validate().map_err(Error::Configuration)?;

        let store = RedisStore::connect(&config.redis).await?;
        let conn = database::connect(&config.database).await?;

        Self::with_parts(
            config,
            Arc::new(store),
            Arc::new(SeaOrmArticleSource::new(conn)),
        )
    }

    /// 使用已有的缓存后端和数据源组装引擎，必须在 tokio 运行时内调用
    pub fn with_parts(
        config: Config,
        store: Arc<dyn CacheStore>,
        source: Arc<dyn ArticleSource>,
    ) -> Result<Self> {
        let cache = ArticleCache::new(
            store,
            CacheTtl {
                content: config.cache.content_ttl_secs,
                viewer: config.cache.viewer_ttl_secs,
            },
        );
        let pool = Arc::new(BackfillPool::new(
            config.backfill.workers,
            config.backfill.queue_capacity,
        ));
        let limits = ServiceLimits {
            max_page_size: config.cache.max_page_size,
            max_popular_limit: config.cache.max_popular_limit,
        };
        let service = ArticleService::new(cache, source, pool, limits);

        let scheduler = Scheduler::new(
            "view-reconcile",
            SchedulerConfig {
                interval: config.reconcile.interval(),
                timeout: config.reconcile.timeout(),
                run_on_start: config.reconcile.run_on_start,
            },
            Arc::new(ViewReconciler::new(service.clone())),
        )?;

        Ok(Self {
            config,
            service,
            scheduler,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &ArticleService {
        &self.service
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// 启动对账调度器
    pub fn start(&self) {
        self.scheduler.start(&self.shutdown);
    }

    /// 优雅关闭：停止调度，等待正在进行的对账结束，再排空回填队列
    pub async fn shutdown(&self) {
        info!("shutting down view sync engine");
        self.scheduler.stop();
        self.scheduler.wait_idle().await;
        self.service.pool().shutdown().await;
        self.shutdown.cancel();
        info!(stats = ?self.scheduler.stats(), "view sync engine stopped");
    }
}
