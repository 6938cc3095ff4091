//! 工作线程池模块
//! Worker Pool Module
//!
//! 定时器服务从不在调度线程上执行回调，而是把到期的回调交给工作线程池。
//! 本模块定义了线程池接口，并提供两种实现：原生的有界线程池，以及基于
//! tokio 阻塞线程池的实现。
//!
//! The timer service never runs callbacks on its dispatch thread; due callbacks
//! are handed to a worker pool instead. This module defines the pool interface
//! and ships two implementations: a native bounded thread pool and one backed by
//! the tokio blocking pool.

mod thread_pool;
mod tokio_pool;


pub use thread_pool::ThreadPool;
pub use tokio_pool::TokioPool;

use crate::error::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// 提交给工作线程池的任务单元
/// A unit of work submitted to a worker pool
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// 串行键：共享同一个键的任务按提交顺序逐个执行
/// Serial key: jobs sharing a key run one at a time in submission order
pub type SerialKey = u64;

/// 工作线程池接口
/// Worker pool interface
///
/// `submit` must only enqueue; it must never wait for a job to complete, since
/// the dispatch loop calls it while holding the registry lock. Pools must be
/// restartable: `start` after `shutdown` brings them back to a working state.
pub trait WorkerPool: Send + Sync + 'static {
    /// 启动线程池（已启动时为空操作）
    /// Start the pool (no-op when already started)
    fn start(&self) -> Result<()>;

    /// 提交任务
    /// Submit a job
    fn submit(&self, job: Job) -> Result<()>;

    /// 以串行键提交任务
    /// Submit a job under a serial key
    ///
    /// Pools that cannot order jobs fall back to a plain `submit`.
    fn submit_serial(&self, key: SerialKey, job: Job) -> Result<()> {
        let _ = key;
        self.submit(job)
    }

    /// 关闭线程池，丢弃尚未开始的任务
    /// Shut the pool down, discarding jobs that have not started
    fn shutdown(&self);

    /// 排队中尚未开始的任务数
    /// Number of queued jobs that have not started
    fn queue_size(&self) -> usize;

    /// 当前存活的工作线程数
    /// Number of live worker threads
    fn thread_count(&self) -> usize;
}

/// Runs a job, containing any panic it raises.
pub(crate) fn run_job(job: Job, pool_name: &str) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        warn!(
            pool = pool_name,
            panic = panic_message(payload.as_ref()),
            "Job panicked on worker thread"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
