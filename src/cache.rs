//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了文章缓存适配器（Cache-Aside 的缓存侧）。
//!
//! 读取有三种结果：命中返回反序列化后的数据；未命中返回 `Ok(None)`；
//! 传输或反序列化失败返回 `Err`。三者不会混淆，调用方据此决定回源方式。

use crate::backend::{CacheEntry, CacheStore};
use crate::error::{Error, Result};
use crate::keys;
use crate::model::{Article, ArticlePage, ArticleSummary};
use crate::serialization::{JsonSerializer, Serializer};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// 缓存过期策略
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    /// 内容类（文章、列表、总数、排行）过期时间（秒）
    pub content: u64,
    /// 访客去重数据过期时间（秒）
    pub viewer: u64,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            content: 3600,
            viewer: 12 * 3600,
        }
    }
}

/// 分页查询的缓存结果
#[derive(Debug, Clone, PartialEq)]
pub enum PageLookup {
    /// 列表和总数都命中
    Hit(ArticlePage),
    /// 列表命中但共享总数缺失，由调用方决定是否视为未命中
    Partial(Vec<ArticleSummary>),
    Miss,
}

/// 文章缓存适配器
///
/// 按语义键（ID、分页、热门、总数、访客集合）读写缓存服务，可廉价克隆
#[derive(Clone)]
pub struct ArticleCache {
    store: Arc<dyn CacheStore>,
    serializer: JsonSerializer,
    ttl: CacheTtl,
}

impl std::fmt::Debug for ArticleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleCache").field("ttl", &self.ttl).finish()
    }
}

impl ArticleCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: CacheTtl) -> Self {
        Self {
            store,
            serializer: JsonSerializer::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(self.serializer.deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn entry<T: Serialize>(&self, key: String, value: &T) -> Result<CacheEntry> {
        Ok(CacheEntry::new(
            key,
            self.serializer.serialize(value)?,
            self.ttl.content,
        ))
    }

    /// 按ID读取文章
    #[instrument(skip(self), level = "debug")]
    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        self.get_json(&keys::by_id_key(id)).await
    }

    #[instrument(skip(self, article), level = "debug", fields(id = article.id))]
    pub async fn set_article(&self, article: &Article) -> Result<()> {
        let entry = self.entry(keys::by_id_key(article.id), article)?;
        self.store.set_many(vec![entry]).await
    }

    /// 读取分页列表及其共享总数
    ///
    /// # 参数
    ///
    /// * `page` - 页码（从1开始）
    /// * `page_size` - 每页条数
    ///
    /// # 返回值
    ///
    /// 返回命中、部分命中（总数缺失）或未命中
    #[instrument(skip(self), level = "debug")]
    pub async fn get_page(&self, page: u64, page_size: u64) -> Result<PageLookup> {
        let articles: Vec<ArticleSummary> =
            match self.get_json(&keys::by_page_key(page, page_size)).await? {
                Some(articles) => articles,
                None => return Ok(PageLookup::Miss),
            };

        match self.get_json::<u64>(keys::total_key()).await? {
            Some(total) => Ok(PageLookup::Hit(ArticlePage { articles, total })),
            None => {
                debug!("page {}:{} cached but total missing", page, page_size);
                Ok(PageLookup::Partial(articles))
            }
        }
    }

    /// 写入分页列表和共享总数
    ///
    /// 两个键在同一批次中以相同 TTL 写入，保证同步过期
    #[instrument(skip(self, result), level = "debug", fields(count = result.articles.len()))]
    pub async fn set_page(&self, page: u64, page_size: u64, result: &ArticlePage) -> Result<()> {
        let entries = vec![
            self.entry(keys::by_page_key(page, page_size), &result.articles)?,
            self.entry(keys::total_key().to_string(), &result.total)?,
        ];
        self.store.set_many(entries).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get_popular(&self, limit: u64) -> Result<Option<Vec<ArticleSummary>>> {
        self.get_json(&keys::by_popular_key(limit)).await
    }

    #[instrument(skip(self, articles), level = "debug", fields(count = articles.len()))]
    pub async fn set_popular(&self, limit: u64, articles: &[ArticleSummary]) -> Result<()> {
        let entry = self.entry(keys::by_popular_key(limit), &articles)?;
        self.store.set_many(vec![entry]).await
    }

    /// 记录一次访问
    ///
    /// 同一访客标识在估计结构的生命周期内只计一次。
    /// 同时把文章ID记入活跃集合，活跃标记失败不影响计数本身。
    #[instrument(skip(self), level = "debug")]
    pub async fn record_viewer(&self, id: i64, viewer: &str) -> Result<()> {
        self.store
            .hll_add(&keys::viewer_key(id), viewer, self.ttl.viewer)
            .await?;

        if let Err(e) = self
            .store
            .set_add(keys::active_view_ids_key(), &id.to_string())
            .await
        {
            warn!(id, error = %e, "failed to mark article as having pending views");
        }
        Ok(())
    }

    /// 获取近似独立访客数
    #[instrument(skip(self), level = "debug")]
    pub async fn estimate_viewers(&self, id: i64) -> Result<u64> {
        self.store.hll_count(&keys::viewer_key(id)).await
    }

    /// 清空访客估计结构（对账成功读取后调用）
    #[instrument(skip(self), level = "debug")]
    pub async fn clear_viewers(&self, id: i64) -> Result<()> {
        self.store.delete(&keys::viewer_key(id)).await?;

        if let Err(e) = self
            .store
            .set_remove(keys::active_view_ids_key(), &id.to_string())
            .await
        {
            warn!(id, error = %e, "failed to unmark active article");
        }
        Ok(())
    }

    /// 列出带有未对账浏览的文章ID
    pub async fn pending_subjects(&self) -> Result<Vec<i64>> {
        let members = self.store.set_members(keys::active_view_ids_key()).await?;
        let mut ids = members
            .iter()
            .map(|m| {
                m.parse::<i64>()
                    .map_err(|e| Error::Serialization(format!("active id {:?}: {}", m, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        ids.sort_unstable();
        Ok(ids)
    }

    /// 检查缓存服务连接
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}
