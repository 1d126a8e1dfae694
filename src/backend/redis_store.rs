//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的缓存服务后端。

use super::{CacheEntry, CacheStore};
use crate::config::{RedisConfig, RedisMode};
use crate::error::{Error, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use secrecy::ExposeSecret;
use std::future::Future;
use tokio::time::{timeout, Duration};
use tracing::{debug, instrument};

/// Redis缓存后端
///
/// 所有命令共享同一个 `ConnectionManager`（内部自动重连），
/// 每条命令都受 `command_timeout_ms` 约束，超时按后端故障处理
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    command_timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl RedisStore {
    /// 根据配置建立连接
    ///
    /// # 参数
    ///
    /// * `config` - Redis配置
    ///
    /// # 返回值
    ///
    /// 返回新的RedisStore实例或错误
    #[instrument(skip(config), level = "info", fields(mode = ?config.mode))]
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let url = match config.mode {
            RedisMode::Standalone => standalone_url(config),
            RedisMode::Sentinel => sentinel_url(config)?,
        };

        let client = Client::open(url.as_str())?;
        let manager = timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        .map_err(|_| {
            Error::Timeout(format!(
                "Redis connection timed out after {}ms",
                config.connection_timeout_ms
            ))
        })??;

        debug!("Redis connection manager ready");
        Ok(Self::from_manager(manager, config.command_timeout_ms))
    }

    /// 使用已有的连接管理器创建实例
    pub fn from_manager(manager: ConnectionManager, command_timeout_ms: u64) -> Self {
        Self {
            manager,
            command_timeout: Duration::from_millis(command_timeout_ms),
        }
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.command_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout(format!(
                "Redis {} timed out after {}ms",
                op,
                self.command_timeout.as_millis()
            ))),
        }
    }
}

fn standalone_url(config: &RedisConfig) -> String {
    let raw = config.connection_string.expose_secret();
    if config.enable_tls && !raw.starts_with("rediss://") {
        raw.replace("redis://", "rediss://")
    } else {
        raw.to_string()
    }
}

// redis+sentinel://[:password@]host:port[,host:port]/master_name
fn sentinel_url(config: &RedisConfig) -> Result<String> {
    let sentinel = config.sentinel.as_ref().ok_or_else(|| {
        Error::Configuration("Sentinel configuration is missing".to_string())
    })?;

    let nodes: Vec<&str> = sentinel
        .nodes
        .iter()
        .map(|n| {
            n.trim_start_matches("redis://")
                .trim_start_matches("redis+sentinel://")
        })
        .collect();

    if nodes.is_empty() {
        return Err(Error::Configuration(
            "No sentinel nodes provided".to_string(),
        ));
    }

    let mut url = "redis+sentinel://".to_string();
    if let Some(password) = &config.password {
        url.push_str(&format!(":{}@", password.expose_secret()));
    }
    url.push_str(&nodes.join(","));
    url.push('/');
    url.push_str(&sentinel.master_name);
    Ok(url)
}

#[async_trait]
impl CacheStore for RedisStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        self.bounded("GET", conn.get::<_, Option<Vec<u8>>>(key))
            .await
    }

    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn set_many(&self, entries: Vec<CacheEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        // MULTI/EXEC 保证成对的键（例如分页列表和总数）同时写入、同步过期
        let mut pipe = redis::pipe();
        pipe.atomic();
        for entry in &entries {
            pipe.set_ex(&entry.key, entry.value.as_slice(), entry.ttl)
                .ignore();
        }

        let mut conn = self.manager.clone();
        self.bounded("MULTI SET", pipe.query_async::<()>(&mut conn))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn hll_add(&self, key: &str, member: &str, ttl: u64) -> Result<bool> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("PFADD")
            .arg(key)
            .arg(member)
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl)
            .ignore();

        let mut conn = self.manager.clone();
        let (changed,): (i64,) = self
            .bounded("PFADD", pipe.query_async(&mut conn))
            .await?;
        Ok(changed == 1)
    }

    #[instrument(skip(self), level = "debug")]
    async fn hll_count(&self, key: &str) -> Result<u64> {
        let mut conn = self.manager.clone();
        self.bounded(
            "PFCOUNT",
            redis::cmd("PFCOUNT").arg(key).query_async::<u64>(&mut conn),
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        self.bounded("DEL", conn.del::<_, ()>(key)).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        self.bounded("SADD", conn.sadd::<_, _, ()>(key, member))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        self.bounded("SREM", conn.srem::<_, _, ()>(key, member))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        self.bounded("SMEMBERS", conn.smembers::<_, Vec<String>>(key))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let response = self
            .bounded("PING", redis::cmd("PING").query_async::<String>(&mut conn))
            .await?;
        debug!("Redis ping response: {}", response);
        Ok(())
    }
}
