//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了周期任务调度器。
//!
//! 调度器按固定间隔触发处理函数，保证同一时刻最多只有一次执行：
//! 上一次执行尚未结束时到达的触发会被丢弃（不排队）。每次执行都带有
//! 可取消的上下文，超时后上下文被取消，处理函数需要自行观察并退出。
//! 处理函数返回的错误和发生的 panic 都会被记录，不会终止调度循环。

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 可被调度器周期执行的任务
#[async_trait]
pub trait Task: Send + Sync {
    /// 任务名称，用于日志
    fn name(&self) -> &str;

    /// 执行一次任务
    ///
    /// # 参数
    ///
    /// * `ctx` - 本次执行的上下文，取消或超时后需要尽快返回
    async fn run(&self, ctx: TaskContext) -> Result<()>;
}

/// 单次执行的上下文
#[derive(Debug, Clone)]
pub struct TaskContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl TaskContext {
    pub fn new(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self { token, deadline }
    }

    /// 不受调度器管理的上下文（手动触发时使用）
    pub fn detached(timeout: Option<Duration>) -> Self {
        Self::new(CancellationToken::new(), timeout.map(|t| Instant::now() + t))
    }

    /// 是否已被取消或已超过截止时间
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// 等待取消或截止时间到达
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// 距截止时间的剩余时长，无截止时间时返回 `None`
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// 调度器配置
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// 触发间隔
    pub interval: Duration,
    /// 单次执行超时，零表示不限制
    pub timeout: Duration,
    /// 启动时立即执行一次
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            timeout: Duration::from_secs(300),
            run_on_start: true,
        }
    }
}

/// 调度器统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// 已开始的执行次数
    pub invocations: u64,
    /// 成功完成次数
    pub completed: u64,
    /// 处理函数返回错误的次数
    pub failures: u64,
    /// 处理函数 panic 的次数
    pub panics: u64,
    /// 超时被取消的次数
    pub timeouts: u64,
    /// 因上一次执行未结束而丢弃的触发次数
    pub skipped_ticks: u64,
}

struct Shared {
    name: String,
    config: SchedulerConfig,
    handler: Arc<dyn Task>,
    executing: AtomicBool,
    idle: Notify,
    invocations: AtomicU64,
    completed: AtomicU64,
    failures: AtomicU64,
    panics: AtomicU64,
    timeouts: AtomicU64,
    skipped_ticks: AtomicU64,
}

struct RunState {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

/// 执行中标记的守卫，无论执行如何结束都会释放标记
struct ExecutingGuard(Arc<Shared>);

impl Drop for ExecutingGuard {
    fn drop(&mut self) {
        self.0.executing.store(false, Ordering::Release);
        self.0.idle.notify_waiters();
    }
}

/// 周期任务调度器
pub struct Scheduler {
    shared: Arc<Shared>,
    state: Mutex<Option<RunState>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.shared.name)
            .field("config", &self.shared.config)
            .field("running", &self.is_running())
            .field("executing", &self.is_executing())
            .finish()
    }
}

impl Scheduler {
    /// 创建调度器（处于停止状态）
    ///
    /// # 参数
    ///
    /// * `name` - 调度器名称
    /// * `config` - 调度配置
    /// * `handler` - 被调度的任务
    ///
    /// # 返回值
    ///
    /// 间隔为零时返回配置错误
    pub fn new(
        name: impl Into<String>,
        config: SchedulerConfig,
        handler: Arc<dyn Task>,
    ) -> Result<Self> {
        let name = name.into();
        if config.interval.is_zero() {
            return Err(Error::Configuration(format!(
                "scheduler '{}' interval must be positive",
                name
            )));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                name,
                config,
                handler,
                executing: AtomicBool::new(false),
                idle: Notify::new(),
                invocations: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                panics: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
                skipped_ticks: AtomicU64::new(0),
            }),
            state: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// 启动调度循环
    ///
    /// 调度器的根令牌是 `parent` 的子令牌，父令牌取消时调度器随之停止。
    /// 已在运行时为空操作。
    pub fn start(&self, parent: &CancellationToken) {
        let mut state = self.state.lock();
        if state.as_ref().is_some_and(|s| !s.token.is_cancelled()) {
            info!(scheduler = %self.shared.name, "scheduler already running");
            return;
        }

        let token = parent.child_token();
        let handle = tokio::spawn(run_loop(self.shared.clone(), token.clone()));
        *state = Some(RunState {
            token,
            _handle: handle,
        });

        info!(
            scheduler = %self.shared.name,
            interval_secs = self.shared.config.interval.as_secs_f64(),
            timeout_secs = self.shared.config.timeout.as_secs_f64(),
            run_on_start = self.shared.config.run_on_start,
            "scheduler started"
        );
    }

    /// 停止调度循环并取消正在进行的执行
    ///
    /// 取消是协作式的，需要等待执行真正结束时使用 [`Scheduler::wait_idle`]。
    /// 未运行时为空操作。
    pub fn stop(&self) {
        match self.state.lock().take() {
            Some(state) if !state.token.is_cancelled() => {
                state.token.cancel();
                info!(scheduler = %self.shared.name, "scheduler stopped");
            }
            _ => info!(scheduler = %self.shared.name, "scheduler not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .is_some_and(|s| !s.token.is_cancelled())
    }

    /// 是否有执行正在进行
    pub fn is_executing(&self) -> bool {
        self.shared.executing.load(Ordering::Acquire)
    }

    /// 等待当前执行结束
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_executing() {
                return;
            }
            notified.await;
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        let s = &self.shared;
        SchedulerStats {
            invocations: s.invocations.load(Ordering::Relaxed),
            completed: s.completed.load(Ordering::Relaxed),
            failures: s.failures.load(Ordering::Relaxed),
            panics: s.panics.load(Ordering::Relaxed),
            timeouts: s.timeouts.load(Ordering::Relaxed),
            skipped_ticks: s.skipped_ticks.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(state) = self.state.get_mut().take() {
            state.token.cancel();
        }
    }
}

async fn run_loop(shared: Arc<Shared>, token: CancellationToken) {
    if shared.config.run_on_start {
        fire(&shared, &token);
    }

    let period = shared.config.interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => fire(&shared, &token),
        }
    }
    debug!(scheduler = %shared.name, "scheduler loop exited");
}

fn fire(shared: &Arc<Shared>, root: &CancellationToken) {
    if shared
        .executing
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        shared.skipped_ticks.fetch_add(1, Ordering::Relaxed);
        warn!(
            scheduler = %shared.name,
            "previous run still in progress, skipping this tick"
        );
        return;
    }

    let guard = ExecutingGuard(shared.clone());
    tokio::spawn(execute(guard, root.child_token()));
}

async fn execute(guard: ExecutingGuard, token: CancellationToken) {
    let shared = &guard.0;
    let run_id = shared.invocations.fetch_add(1, Ordering::Relaxed) + 1;
    let timeout = shared.config.timeout;
    let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
    let ctx = TaskContext::new(token.clone(), deadline);
    let started = Instant::now();

    debug!(scheduler = %shared.name, task = shared.handler.name(), run_id, "run started");

    let run = AssertUnwindSafe(shared.handler.run(ctx)).catch_unwind();
    tokio::pin!(run);

    let outcome = match deadline {
        Some(deadline) => {
            tokio::select! {
                out = &mut run => out,
                _ = sleep_until(deadline) => {
                    shared.timeouts.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        scheduler = %shared.name,
                        run_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "run exceeded timeout, cancelling"
                    );
                    token.cancel();
                    run.await
                }
            }
        }
        None => run.await,
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(Ok(())) => {
            shared.completed.fetch_add(1, Ordering::Relaxed);
            info!(scheduler = %shared.name, run_id, elapsed_ms, "run completed");
        }
        Ok(Err(e)) => {
            shared.failures.fetch_add(1, Ordering::Relaxed);
            error!(scheduler = %shared.name, run_id, elapsed_ms, error = %e, "run failed");
        }
        Err(panic) => {
            shared.panics.fetch_add(1, Ordering::Relaxed);
            let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!(scheduler = %shared.name, run_id, elapsed_ms, panic_msg = %panic_msg, "run panicked");
        }
    }
}
