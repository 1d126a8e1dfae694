//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 文章缓存键命名规则。
//!
//! 键名会被持久化到 Redis 中并跨进程重启共享，必须逐字节保持不变。

/// 分页列表共享的总数键
pub const TOTAL_KEY: &str = "Article:Total";

/// 活跃浏览文章ID集合
pub const ACTIVE_VIEW_IDS_KEY: &str = "Article:View:ActiveIDs";

/// 浏览计数键的管理扫描模式（保留，注意小写的 `view`）
pub const VIEWER_SCAN_PATTERN: &str = "Article:view:UV:*";

pub fn total_key() -> &'static str {
    TOTAL_KEY
}

pub fn by_id_key(id: i64) -> String {
    format!("Article:ByID:{}", id)
}

pub fn by_page_key(page: u64, page_size: u64) -> String {
    format!("Article:ByPage:{}:{}", page, page_size)
}

pub fn by_popular_key(limit: u64) -> String {
    format!("Article:ByPopular:{}", limit)
}

pub fn active_view_ids_key() -> &'static str {
    ACTIVE_VIEW_IDS_KEY
}

/// 单篇文章的 HyperLogLog 访客键
pub fn viewer_key(id: i64) -> String {
    format!("Article:View:UV:{}", id)
}
