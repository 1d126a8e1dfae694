//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于 SeaORM 的文章数据源实现。

use super::entity::{Column, Entity, SummaryRow, SUMMARY_COLUMNS};
use super::ArticleSource;
use crate::error::{Error, Result};
use crate::model::{Article, ArticlePage, ArticleStatus, ArticleSummary};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, TransactionTrait,
};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// SeaORM 文章数据源
#[derive(Clone, Debug)]
pub struct SeaOrmArticleSource {
    conn: DatabaseConnection,
}

impl SeaOrmArticleSource {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// 底层连接，供建表和测试数据初始化使用
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}

fn visible() -> Select<Entity> {
    Entity::find()
        .filter(Column::Status.eq(ArticleStatus::Public))
        .filter(Column::IsDelete.eq(false))
}

fn to_delta(delta: u64) -> Result<i64> {
    i64::try_from(delta)
        .map_err(|_| Error::InvalidRequest(format!("view delta {} overflows", delta)))
}

async fn add_views<C: ConnectionTrait>(conn: &C, id: i64, delta: u64) -> Result<()> {
    let result = Entity::update_many()
        .col_expr(Column::Views, Expr::col(Column::Views).add(to_delta(delta)?))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::ArticleNotFound(id));
    }
    Ok(())
}

#[async_trait]
impl ArticleSource for SeaOrmArticleSource {
    #[instrument(skip(self), level = "debug")]
    async fn list_public_ids(&self) -> Result<Vec<i64>> {
        let ids = visible()
            .select_only()
            .column(Column::Id)
            .order_by_asc(Column::Id)
            .into_tuple::<i64>()
            .all(&self.conn)
            .await?;
        Ok(ids)
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_page(&self, page: u64, page_size: u64) -> Result<ArticlePage> {
        if page == 0 || page_size == 0 {
            return Err(Error::InvalidRequest(format!(
                "page ({}) and page size ({}) must be positive",
                page, page_size
            )));
        }

        let offset = (page - 1)
            .checked_mul(page_size)
            .filter(|offset| *offset <= i64::MAX as u64)
            .ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "page ({}) with page size ({}) is out of range",
                    page, page_size
                ))
            })?;

        let total = visible().count(&self.conn).await?;
        let rows = visible()
            .select_only()
            .columns(SUMMARY_COLUMNS)
            .order_by_asc(Column::Id)
            .offset(offset)
            .limit(page_size)
            .into_model::<SummaryRow>()
            .all(&self.conn)
            .await?;

        debug!(
            "find_page {}:{} -> {} rows, total {}",
            page,
            page_size,
            rows.len(),
            total
        );
        Ok(ArticlePage {
            articles: rows.into_iter().map(ArticleSummary::from).collect(),
            total,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_popular(&self, limit: u64) -> Result<Vec<ArticleSummary>> {
        let rows = visible()
            .select_only()
            .columns(SUMMARY_COLUMNS)
            .order_by_desc(Column::Views)
            .order_by_asc(Column::Id)
            .limit(limit)
            .into_model::<SummaryRow>()
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(ArticleSummary::from).collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_by_id(&self, id: i64) -> Result<Article> {
        Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(Article::from)
            .ok_or(Error::ArticleNotFound(id))
    }

    #[instrument(skip(self, ids), level = "debug", fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = Entity::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await?;
        Ok(models.into_iter().map(Article::from).collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn increment_views(&self, id: i64, delta: u64) -> Result<()> {
        add_views(&self.conn, id, delta).await
    }

    #[instrument(skip(self, deltas), level = "debug", fields(count = deltas.len()))]
    async fn increment_views_batch(&self, deltas: &HashMap<i64, u64>) -> Result<()> {
        if deltas.is_empty() {
            return Ok(());
        }

        let txn = self.conn.begin().await?;
        for (&id, &delta) in deltas {
            if let Err(e) = add_views(&txn, id, delta).await {
                warn!(id, error = %e, "batch view increment failed, rolling back");
                txn.rollback().await?;
                return Err(e);
            }
        }
        txn.commit().await?;
        Ok(())
    }
}
