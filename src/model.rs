//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了文章领域模型，缓存与数据库共用同一套结构。

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 文章可见性状态
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// 公开
    #[default]
    #[sea_orm(num_value = 0)]
    Public,
    /// 私有
    #[sea_orm(num_value = 1)]
    Private,
}

/// 文章（带正文）
///
/// 由数据库持有，缓存中只保存带 TTL 的只读副本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 标题
    pub title: String,
    /// 描述
    pub desc: String,
    /// 正文
    pub content: String,
    /// 作者
    #[serde(rename = "authorName")]
    pub author_name: String,
    /// 浏览数
    pub views: u64,
    /// 标签（逗号分隔）
    pub tags: String,
    /// 封面
    pub cover: String,
    pub status: ArticleStatus,
    pub is_delete: bool,
}

impl Article {
    /// 拆分逗号分隔的标签，忽略空白项
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(&self.tags)
    }

    /// 是否对列表和排行查询可见
    pub fn is_listed(&self) -> bool {
        self.status == ArticleStatus::Public && !self.is_delete
    }

    /// 不含正文的摘要投影
    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            title: self.title.clone(),
            author_name: self.author_name.clone(),
            views: self.views,
            tags: self.tags.clone(),
            cover: self.cover.clone(),
        }
    }
}

/// 文章摘要，列表与排行使用，不传输正文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    #[serde(rename = "authorName")]
    pub author_name: String,
    pub views: u64,
    pub tags: String,
    pub cover: String,
}

impl ArticleSummary {
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(&self.tags)
    }
}

/// 分页结果：当前页摘要和满足可见性条件的总数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlePage {
    pub articles: Vec<ArticleSummary>,
    pub total: u64,
}

fn split_tags(tags: &str) -> Vec<&str> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}
