//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了文章一致性编排服务。
//!
//! 读取先查缓存，未命中时回源并回填；缓存故障时直接回源且不回填。
//! 浏览计数先写入近似计数器，由周期对账任务汇总到数据库。

pub mod reconcile;

use crate::cache::{ArticleCache, PageLookup};
use crate::database::ArticleSource;
use crate::error::{Error, Result};
use crate::model::{Article, ArticlePage, ArticleSummary};
use crate::sync::BackfillPool;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub use reconcile::{PendingViews, ReconcileReport, ViewReconciler};

/// 请求参数上限
#[derive(Debug, Clone, Copy)]
pub struct ServiceLimits {
    /// 分页大小上限
    pub max_page_size: u64,
    /// 热门文章数量上限
    pub max_popular_limit: u64,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            max_popular_limit: 100,
        }
    }
}

/// 文章一致性编排服务
///
/// 组合缓存适配器和数据源，可被多个请求与对账任务并发调用，可廉价克隆
#[derive(Clone)]
pub struct ArticleService {
    cache: ArticleCache,
    source: Arc<dyn ArticleSource>,
    pool: Arc<BackfillPool>,
    limits: ServiceLimits,
}

impl std::fmt::Debug for ArticleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleService")
            .field("cache", &self.cache)
            .field("pool", &self.pool)
            .field("limits", &self.limits)
            .finish()
    }
}

impl ArticleService {
    /// 创建编排服务
    ///
    /// # 参数
    ///
    /// * `cache` - 缓存适配器
    /// * `source` - 权威数据源
    /// * `pool` - 后台回填工作池
    /// * `limits` - 请求参数上限
    pub fn new(
        cache: ArticleCache,
        source: Arc<dyn ArticleSource>,
        pool: Arc<BackfillPool>,
        limits: ServiceLimits,
    ) -> Self {
        Self {
            cache,
            source,
            pool,
            limits,
        }
    }

    pub fn cache(&self) -> &ArticleCache {
        &self.cache
    }

    pub fn source(&self) -> &Arc<dyn ArticleSource> {
        &self.source
    }

    pub fn pool(&self) -> &Arc<BackfillPool> {
        &self.pool
    }

    /// 分页列出公开文章
    ///
    /// # 参数
    ///
    /// * `page` - 页码（从1开始）
    /// * `page_size` - 每页条数，不超过 `max_page_size`
    ///
    /// # 返回值
    ///
    /// 返回当前页摘要和总数；参数非法时返回 `Error::InvalidRequest`，
    /// 数据源故障时返回对应错误
    #[instrument(skip(self), level = "debug")]
    pub async fn list_articles(&self, page: u64, page_size: u64) -> Result<ArticlePage> {
        if page == 0 {
            return Err(Error::InvalidRequest("page must be at least 1".to_string()));
        }
        if page_size == 0 || page_size > self.limits.max_page_size {
            return Err(Error::InvalidRequest(format!(
                "page size must be between 1 and {}",
                self.limits.max_page_size
            )));
        }
        if (page - 1).checked_mul(page_size).is_none() {
            return Err(Error::InvalidRequest(format!("page {} is out of range", page)));
        }

        let repopulate = match self.cache.get_page(page, page_size).await {
            Ok(PageLookup::Hit(result)) => return Ok(result),
            Ok(PageLookup::Partial(_)) => {
                debug!(page, page_size, "page total missing, treating as miss");
                true
            }
            Ok(PageLookup::Miss) => true,
            Err(e) => {
                warn!(page, page_size, error = %e, "cache read failed, bypassing cache");
                false
            }
        };

        let result = self.source.find_page(page, page_size).await?;

        if repopulate {
            if let Err(e) = self.cache.set_page(page, page_size, &result).await {
                warn!(page, page_size, error = %e, "failed to backfill page cache");
            }
        }
        Ok(result)
    }

    /// 按浏览数列出热门文章
    ///
    /// 未命中时的缓存回填提交到工作池，不阻塞本次响应
    #[instrument(skip(self), level = "debug")]
    pub async fn popular_articles(&self, limit: u64) -> Result<Vec<ArticleSummary>> {
        if limit == 0 || limit > self.limits.max_popular_limit {
            return Err(Error::InvalidRequest(format!(
                "limit must be between 1 and {}",
                self.limits.max_popular_limit
            )));
        }

        let repopulate = match self.cache.get_popular(limit).await {
            Ok(Some(articles)) => return Ok(articles),
            Ok(None) => true,
            Err(e) => {
                warn!(limit, error = %e, "cache read failed, bypassing cache");
                false
            }
        };

        let articles = self.source.find_popular(limit).await?;

        if repopulate {
            let cache = self.cache.clone();
            let snapshot = articles.clone();
            self.pool.submit(format!("popular:{}", limit), async move {
                cache.set_popular(limit, &snapshot).await
            });
        }
        Ok(articles)
    }

    /// 读取单篇文章并记录一次访问
    ///
    /// # 参数
    ///
    /// * `id` - 文章ID
    /// * `viewer` - 访客标识（例如客户端IP）
    ///
    /// # 返回值
    ///
    /// 缓存命中时返回缓存副本，访问记录交给工作池；
    /// 未命中时回源，记录访问和回填缓存都在返回前尽力完成，失败只记录日志
    #[instrument(skip(self, viewer), level = "debug")]
    pub async fn get_article(&self, id: i64, viewer: &str) -> Result<Article> {
        match self.cache.get_article(id).await {
            Ok(Some(article)) => {
                let cache = self.cache.clone();
                let viewer = viewer.to_string();
                self.pool.submit(format!("viewer:{}", id), async move {
                    cache.record_viewer(id, &viewer).await
                });
                return Ok(article);
            }
            Ok(None) => {}
            Err(e) => warn!(id, error = %e, "cache read failed, falling back to source"),
        }

        let article = self.source.find_by_id(id).await?;

        if let Err(e) = self.cache.record_viewer(id, viewer).await {
            warn!(id, error = %e, "failed to record viewer");
        }
        if let Err(e) = self.cache.set_article(&article).await {
            warn!(id, error = %e, "failed to backfill article cache");
        }
        Ok(article)
    }
}
