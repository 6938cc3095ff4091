//! 定时器服务模块
//! Timer Service Module
//!
//! 该模块实现了定时器调度引擎：双索引的定时器注册表、在最早截止时间之前
//! 高效睡眠的单一调度线程，以及把到期回调移交给工作线程池的执行移交层。
//!
//! This module implements the timer-scheduling engine: the dual-index timer
//! registry, the single dispatch thread that sleeps until the earliest
//! deadline, and the execution handoff that passes due callbacks to the
//! worker pool.

mod dispatch;
mod handoff;
pub mod record;
pub mod registry;
pub mod service;
pub mod stats;


pub use record::{TimerCallback, TimerId, TimerRecord};
pub use registry::TimerRegistry;
pub use service::TimerService;
pub use stats::TimerServiceStats;
