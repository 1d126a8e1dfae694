//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存一致性引擎的错误类型和处理机制。

use thiserror::Error;

/// 引擎错误类型枚举
///
/// 缓存未命中不是错误：读取接口以 `Ok(None)` 表示未命中，
/// 这里只包含真正的后端故障、参数错误和配置错误。
#[derive(Error, Debug)]
pub enum Error {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Sea-ORM数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// 文章不存在
    #[error("Article {0} not found")]
    ArticleNotFound(i64),

    /// 请求参数错误
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 后端错误
    #[error("Backend error: {0}")]
    Backend(String),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 是否为请求参数错误（调用方错误，而非后端故障）
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }
}

/// 操作结果类型别名
pub type Result<T> = std::result::Result<T, Error>;
