//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! `articles` 表的 SeaORM 实体定义。

use crate::model::{Article, ArticleStatus, ArticleSummary};
use sea_orm::entity::prelude::*;
use sea_orm::FromQueryResult;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub title: String,
    #[sea_orm(column_name = "desc")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub author_name: String,
    pub views: i64,
    pub tags: String,
    pub cover: String,
    pub status: ArticleStatus,
    pub is_delete: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Article {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            created_at: m.created_at,
            updated_at: m.updated_at,
            title: m.title,
            desc: m.description,
            content: m.content,
            author_name: m.author_name,
            views: m.views.max(0) as u64,
            tags: m.tags,
            cover: m.cover,
            status: m.status,
            is_delete: m.is_delete,
        }
    }
}

/// 摘要查询的行结构，只选择列表需要的列
#[derive(Debug, FromQueryResult)]
pub struct SummaryRow {
    pub id: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub title: String,
    pub author_name: String,
    pub views: i64,
    pub tags: String,
    pub cover: String,
}

impl From<SummaryRow> for ArticleSummary {
    fn from(r: SummaryRow) -> Self {
        Self {
            id: r.id,
            created_at: r.created_at,
            updated_at: r.updated_at,
            title: r.title,
            author_name: r.author_name,
            views: r.views.max(0) as u64,
            tags: r.tags,
            cover: r.cover,
        }
    }
}

/// 摘要查询选择的列
pub(crate) const SUMMARY_COLUMNS: [Column; 8] = [
    Column::Id,
    Column::CreatedAt,
    Column::UpdatedAt,
    Column::Title,
    Column::AuthorName,
    Column::Views,
    Column::Tags,
    Column::Cover,
];
