#![deny(clippy::expect_used, clippy::unwrap_used)]

//! An in-process timer service: schedule callbacks to run once or repeatedly
//! after a delay, executed on a bounded worker pool.
//! 进程内定时器服务：调度回调在延迟后执行一次或重复执行，由有界工作线程池执行。

pub mod config;
pub mod error;
pub mod pool;
pub mod timer;

#[cfg(test)]
mod testing;

pub use config::{Config, DispatchConfig, MissedTickPolicy, PoolConfig};
pub use error::{Error, Result};
pub use pool::{ThreadPool, TokioPool, WorkerPool};
pub use timer::{TimerId, TimerService, TimerServiceStats};
