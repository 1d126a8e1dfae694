//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了浏览数对账流程。
//!
//! 对每篇公开文章：读取近似访客数，为零或读取失败则跳过；否则先清空
//! 计数器再把估计值累加到数据库。清空与累加之间进程崩溃会丢失该文章
//! 本周期的浏览数，损失上限为一个对账间隔。

use super::ArticleService;
use crate::error::Result;
use crate::sync::{Task, TaskContext};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// 单次对账的结果统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// 参与对账的文章数
    pub subjects: usize,
    /// 实际检查过的文章数（取消时小于 `subjects`）
    pub scanned: usize,
    /// 成功累加浏览数的文章数
    pub updated: usize,
    /// 累加到数据库的浏览总数
    pub views_applied: u64,
    pub estimate_failures: usize,
    pub clear_failures: usize,
    pub increment_failures: usize,
    /// 已清空但未能写入数据库的浏览数
    pub views_lost: u64,
    /// 是否因取消或超时提前结束
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl ReconcileReport {
    pub fn failures(&self) -> usize {
        self.estimate_failures + self.clear_failures + self.increment_failures
    }
}

/// 带有未对账浏览的文章及其当前估计值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingViews {
    pub id: i64,
    pub estimate: u64,
}

impl ArticleService {
    /// 执行一次浏览数对账
    ///
    /// # 参数
    ///
    /// * `ctx` - 执行上下文，取消或超时后放弃剩余文章，已完成的累加保持生效
    ///
    /// # 返回值
    ///
    /// 返回对账统计；只有列出文章ID失败时返回错误，单篇文章的失败只计入统计
    #[instrument(skip(self, ctx), level = "info")]
    pub async fn reconcile_views(&self, ctx: &TaskContext) -> Result<ReconcileReport> {
        let started = Instant::now();
        let ids = self.source.list_public_ids().await?;
        let mut report = ReconcileReport {
            subjects: ids.len(),
            ..Default::default()
        };

        for id in ids {
            if ctx.is_cancelled() {
                warn!(
                    scanned = report.scanned,
                    remaining = report.subjects - report.scanned,
                    "reconciliation cancelled, abandoning remaining articles"
                );
                report.cancelled = true;
                break;
            }
            report.scanned += 1;

            let estimate = match self.cache.estimate_viewers(id).await {
                Ok(0) => continue,
                Ok(n) => n,
                Err(e) => {
                    report.estimate_failures += 1;
                    warn!(id, error = %e, "failed to read view estimate, skipping");
                    continue;
                }
            };

            if let Err(e) = self.cache.clear_viewers(id).await {
                report.clear_failures += 1;
                warn!(id, error = %e, "failed to clear view estimate, skipping");
                continue;
            }

            match self.source.increment_views(id, estimate).await {
                Ok(()) => {
                    report.updated += 1;
                    report.views_applied += estimate;
                    debug!(id, estimate, "views applied");
                }
                Err(e) => {
                    report.increment_failures += 1;
                    report.views_lost += estimate;
                    error!(id, estimate, error = %e, "failed to apply views, estimate lost");
                }
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            subjects = report.subjects,
            updated = report.updated,
            views_applied = report.views_applied,
            failures = report.failures(),
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "reconciliation finished"
        );
        Ok(report)
    }

    /// 列出带有未对账浏览的文章及其估计值
    pub async fn pending_views(&self) -> Result<Vec<PendingViews>> {
        let mut pending = Vec::new();
        for id in self.cache.pending_subjects().await? {
            let estimate = self.cache.estimate_viewers(id).await?;
            pending.push(PendingViews { id, estimate });
        }
        Ok(pending)
    }
}

/// 供调度器驱动的浏览数对账任务
#[derive(Debug, Clone)]
pub struct ViewReconciler {
    service: ArticleService,
}

impl ViewReconciler {
    pub fn new(service: ArticleService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Task for ViewReconciler {
    fn name(&self) -> &str {
        "view-reconciler"
    }

    async fn run(&self, ctx: TaskContext) -> Result<()> {
        self.service.reconcile_views(&ctx).await.map(|_| ())
    }
}
