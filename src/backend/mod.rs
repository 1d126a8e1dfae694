//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存服务后端接口，包括Redis和进程内实现。

pub mod memory;
pub mod redis_store;

use crate::error::Result;
use async_trait::async_trait;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// 批量写入的单个条目
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    /// 过期时间（秒）
    pub ttl: u64,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: u64) -> Self {
        Self {
            key: key.into(),
            value,
            ttl,
        }
    }
}

/// 缓存服务接口
///
/// 只包含一致性引擎实际依赖的命令：带 TTL 的键值读写、原子批量写、
/// 基数估计结构和普通集合。实现必须可被多个调用方并发使用。
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取键值，不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 原子地批量写入，所有条目要么一起写入要么都不写入
    async fn set_many(&self, entries: Vec<CacheEntry>) -> Result<()>;

    /// 向基数估计结构添加成员，并刷新其过期时间
    ///
    /// 返回估计值是否发生变化
    async fn hll_add(&self, key: &str, member: &str, ttl: u64) -> Result<bool>;

    /// 获取基数估计值，键不存在时为 0
    async fn hll_count(&self, key: &str) -> Result<u64>;

    /// 删除键
    async fn delete(&self, key: &str) -> Result<()>;

    async fn set_add(&self, key: &str, member: &str) -> Result<()>;

    async fn set_remove(&self, key: &str, member: &str) -> Result<()>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// 检查连接是否正常
    async fn ping(&self) -> Result<()>;
}
