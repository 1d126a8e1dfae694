//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了后台同步机制，包括周期调度器和缓存回填工作池。

pub mod backfill;
pub mod scheduler;

pub use backfill::{BackfillPool, BackfillStats};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats, Task, TaskContext};
