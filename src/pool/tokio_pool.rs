//! 基于 tokio 阻塞线程池的工作线程池
//! Worker pool backed by the tokio blocking pool
//!
//! 每次启动都会构建一个私有的 current-thread 运行时，任务通过 `spawn_blocking`
//! 在其阻塞线程池上执行，阻塞线程数上限即为配置的最大线程数。
//!
//! Every start builds a private current-thread runtime; jobs run on its blocking
//! pool through `spawn_blocking`, capped at the configured maximum thread count.

use super::{Job, WorkerPool, run_job};
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info};

/// tokio 阻塞线程池适配器
/// tokio blocking pool adapter
pub struct TokioPool {
    config: PoolConfig,
    runtime: Mutex<Option<Runtime>>,
    /// 已提交但尚未开始执行的任务数
    /// Jobs submitted but not yet started
    queued: Arc<AtomicUsize>,
    /// 存活的阻塞线程数
    /// Live blocking threads
    threads: Arc<AtomicUsize>,
}

impl TokioPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            runtime: Mutex::new(None),
            queued: Arc::new(AtomicUsize::new(0)),
            threads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_max_threads(max_threads: usize) -> Self {
        Self::new(PoolConfig::with_max_threads(max_threads))
    }

    fn build_runtime(&self) -> std::io::Result<Runtime> {
        let started = Arc::clone(&self.threads);
        let stopped = Arc::clone(&self.threads);
        Builder::new_current_thread()
            .max_blocking_threads(self.config.thread_limit())
            .thread_name(self.config.name.clone())
            .on_thread_start(move || {
                started.fetch_add(1, Ordering::Relaxed);
            })
            .on_thread_stop(move || {
                stopped.fetch_sub(1, Ordering::Relaxed);
            })
            .build()
    }
}

impl WorkerPool for TokioPool {
    fn start(&self) -> Result<()> {
        let mut runtime = self.runtime.lock();
        if runtime.is_some() {
            return Ok(());
        }
        *runtime = Some(self.build_runtime().map_err(Error::PoolStart)?);
        info!(
            pool = %self.config.name,
            max_threads = self.config.thread_limit(),
            "Tokio worker pool started"
        );
        Ok(())
    }

    fn submit(&self, job: Job) -> Result<()> {
        let runtime = self.runtime.lock();
        let runtime = runtime.as_ref().ok_or(Error::PoolStopped)?;

        self.queued.fetch_add(1, Ordering::Relaxed);
        let queued = Arc::clone(&self.queued);
        let name = self.config.name.clone();
        // Detached: completion is observed by the job itself.
        drop(runtime.spawn_blocking(move || {
            queued.fetch_sub(1, Ordering::Relaxed);
            run_job(job, &name);
        }));
        Ok(())
    }

    fn shutdown(&self) {
        let Some(runtime) = self.runtime.lock().take() else {
            return;
        };

        if Handle::try_current().is_ok() {
            // Blocking on shutdown is not allowed inside an async context.
            runtime.shutdown_background();
        } else {
            runtime.shutdown_timeout(self.config.shutdown_timeout);
        }

        let discarded = self.queued.swap(0, Ordering::Relaxed);
        if discarded > 0 {
            debug!(pool = %self.config.name, discarded, "Discarded queued jobs on shutdown");
        }
        info!(pool = %self.config.name, "Tokio worker pool stopped");
    }

    fn queue_size(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    fn thread_count(&self) -> usize {
        self.threads.load(Ordering::Relaxed)
    }
}

impl Drop for TokioPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
