//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内缓存后端，用于本地运行和测试。

use super::{CacheEntry, CacheStore};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

struct ViewerSet {
    members: HashSet<String>,
    expire_at: Instant,
}

/// 进程内缓存后端
///
/// 键值部分基于Moka，过期时间随值一起保存并在读取时检查；
/// 访客集合保存完整成员，因此计数是精确值
#[derive(Clone)]
pub struct MemoryStore {
    // 值: (数据, 过期时间)
    values: Cache<String, (Vec<u8>, Instant)>,
    viewers: std::sync::Arc<DashMap<String, ViewerSet>>,
    sets: std::sync::Arc<DashMap<String, HashSet<String>>>,
}

impl MemoryStore {
    /// 创建新的进程内后端
    ///
    /// # 参数
    ///
    /// * `capacity` - 键值缓存的最大条目数
    pub fn new(capacity: u64) -> Self {
        Self {
            values: Cache::builder().max_capacity(capacity).build(),
            viewers: Default::default(),
            sets: Default::default(),
        }
    }

    /// 清理所有已过期的访客集合
    ///
    /// # 返回值
    ///
    /// 返回被清理的集合数量
    pub fn purge_expired_viewers(&self) -> usize {
        let now = Instant::now();
        let before = self.viewers.len();
        self.viewers.retain(|_, set| now < set.expire_at);
        let purged = before.saturating_sub(self.viewers.len());
        if purged > 0 {
            debug!("memory purge: removed {} expired viewer sets", purged);
        }
        purged
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.values.get(key).await {
            Some((bytes, expire_at)) => {
                if Instant::now() >= expire_at {
                    self.values.remove(key).await;
                    debug!("memory get: key={}, expired=true, removed", key);
                    return Ok(None);
                }
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn set_many(&self, entries: Vec<CacheEntry>) -> Result<()> {
        let now = Instant::now();
        for entry in entries {
            let expire_at = now + Duration::from_secs(entry.ttl);
            self.values.insert(entry.key, (entry.value, expire_at)).await;
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn hll_add(&self, key: &str, member: &str, ttl: u64) -> Result<bool> {
        // 顺带回收其他已过期的键
        self.purge_expired_viewers();

        let now = Instant::now();
        let expire_at = now + Duration::from_secs(ttl);
        let mut set = self
            .viewers
            .entry(key.to_string())
            .or_insert_with(|| ViewerSet {
                members: HashSet::new(),
                expire_at,
            });
        if now >= set.expire_at {
            set.members.clear();
        }
        set.expire_at = expire_at;
        Ok(set.members.insert(member.to_string()))
    }

    #[instrument(skip(self), level = "debug")]
    async fn hll_count(&self, key: &str) -> Result<u64> {
        let now = Instant::now();
        if self
            .viewers
            .remove_if(key, |_, set| now >= set.expire_at)
            .is_some()
        {
            debug!("memory hll_count: key={}, expired=true, removed", key);
            return Ok(0);
        }
        Ok(self
            .viewers
            .get(key)
            .map(|set| set.members.len() as u64)
            .unwrap_or(0))
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.values.remove(key).await;
        self.viewers.remove(key);
        self.sets.remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        self.sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        if let Some(mut set) = self.sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
