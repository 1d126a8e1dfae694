//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存回填工作池。
//!
//! 回填是尽力而为的：队列满或已关闭时任务直接丢弃，任务失败或 panic
//! 只记录日志。固定数量的工作协程从有界队列中取任务执行，
//! 保证后台写入的并发量和内存占用有上限。

use crate::error::Result;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Job = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

struct QueuedJob {
    label: String,
    job: Job,
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    idle: Notify,
}

impl Counters {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// 回填工作池统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillStats {
    pub pending: usize,
    pub completed: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// 有界回填工作池
pub struct BackfillPool {
    sender: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for BackfillPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackfillPool")
            .field("stats", &self.stats())
            .finish()
    }
}

impl BackfillPool {
    /// 创建工作池并启动工作协程，必须在 tokio 运行时内调用
    ///
    /// # 参数
    ///
    /// * `workers` - 工作协程数量（至少为1）
    /// * `queue_capacity` - 等待队列容量（至少为1）
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<QueuedJob>(queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(Counters::default());

        let handles = (0..workers.max(1))
            .map(|worker_id| tokio::spawn(worker_loop(worker_id, rx.clone(), counters.clone())))
            .collect();

        debug!(workers, queue_capacity, "backfill pool started");
        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
            counters,
        }
    }

    /// 提交回填任务，不阻塞调用方
    ///
    /// # 返回值
    ///
    /// 任务入队返回 `true`；队列已满或已关闭时丢弃任务并返回 `false`
    pub fn submit<F>(&self, label: impl Into<String>, job: F) -> bool
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let label = label.into();
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(job = %label, "backfill pool is shut down, dropping job");
            return false;
        };

        self.counters.pending.fetch_add(1, Ordering::AcqRel);
        match tx.try_send(QueuedJob {
            label,
            job: Box::pin(job),
        }) {
            Ok(()) => true,
            Err(e) => {
                self.counters.finish_one();
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                let reason = match &e {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "queue closed",
                };
                let rejected = e.into_inner();
                warn!(job = %rejected.label, reason, "dropping backfill job");
                false
            }
        }
    }

    /// 已提交但尚未结束的任务数
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> BackfillStats {
        BackfillStats {
            pending: self.pending(),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// 等待所有已提交任务结束
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// 关闭队列，执行完剩余任务后等待所有工作协程退出
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let handles = std::mem::take(&mut *self.workers.lock());
        let count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "backfill worker terminated abnormally");
            }
        }
        if count > 0 {
            info!(workers = count, stats = ?self.stats(), "backfill pool shut down");
        }
    }
}

impl Drop for BackfillPool {
    fn drop(&mut self) {
        for handle in self.workers.get_mut().drain(..) {
            handle.abort();
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
    counters: Arc<Counters>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(QueuedJob { label, job }) = next else {
            break;
        };

        match AssertUnwindSafe(job).catch_unwind().await {
            Ok(Ok(())) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id, job = %label, "backfill done");
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker_id, job = %label, error = %e, "backfill failed");
            }
            Err(_) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker_id, job = %label, "backfill panicked");
            }
        }
        counters.finish_one();
    }
    debug!(worker_id, "backfill worker exited");
}
