//! 定时器服务：生命周期控制与公共接口
//! Timer service: lifecycle control and public interface
//!
//! `TimerService` 负责启动和停止调度线程与工作线程池，并向调用方提供
//! 调度、取消和观测接口。调用方只会拿到 `TimerId`，从不接触内部记录。
//!
//! `TimerService` starts and stops the dispatch thread and the worker pool, and
//! offers scheduling, cancellation and observability to callers. Callers only
//! ever hold a `TimerId`, never the internal record.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, trace, warn};

use super::dispatch::{self, Shared, deadline_after};
use super::handoff::Handoff;
use super::record::{TimerCallback, TimerId, TimerRecord};
use super::stats::TimerServiceStats;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pool::{ThreadPool, WorkerPool};

/// 启停状态
/// Start/stop state
#[derive(Debug, Default)]
struct Lifecycle {
    dispatcher: Option<JoinHandle<()>>,
    /// 停止流程进行中；此时 `dispatcher` 已被取走
    /// A stop is in progress; `dispatcher` has already been taken
    stopping: bool,
}

/// 定时器服务
/// Timer service
///
/// Callbacks always run on the worker pool, never on the dispatch thread or
/// on the caller's thread. A callback may schedule and cancel timers and may
/// call [`TimerService::stop`]; it must not call [`TimerService::start`].
pub struct TimerService<P: WorkerPool = ThreadPool> {
    config: Config,
    shared: Arc<Shared>,
    pool: Arc<P>,
    /// 调度线程句柄与停止标志；从不在 join 期间持有
    /// Dispatch thread handle and stop flag; never held across a join
    lifecycle: Mutex<Lifecycle>,
    stopped: Condvar,
}

impl TimerService<ThreadPool> {
    /// 创建使用最多 `max_threads` 个工作线程的服务（尚未启动）
    /// Create a service with at most `max_threads` workers (not yet started)
    pub fn new(max_threads: usize) -> Self {
        Self::with_config(Config::with_max_threads(max_threads))
    }

    pub fn with_config(config: Config) -> Self {
        let pool = ThreadPool::new(config.pool.clone());
        Self::with_pool(config, pool)
    }
}

impl Default for TimerService<ThreadPool> {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl<P: WorkerPool> TimerService<P> {
    /// 使用自定义工作线程池创建服务（尚未启动）
    /// Create a service on a custom worker pool (not yet started)
    pub fn with_pool(config: Config, pool: P) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::new()),
            pool: Arc::new(pool),
            lifecycle: Mutex::new(Lifecycle::default()),
            stopped: Condvar::new(),
        }
    }

    /// 启动服务；已运行时为空操作
    /// Start the service; a no-op when already running
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        while lifecycle.stopping {
            self.stopped.wait(&mut lifecycle);
        }
        if lifecycle.dispatcher.is_some() {
            return Ok(());
        }

        self.pool.start()?;
        {
            let mut state = self.shared.state.lock();
            state.running = true;
            state.stop_requested = false;
        }

        let shared = Arc::clone(&self.shared);
        let handoff = Handoff::new(
            Arc::clone(&self.pool),
            self.config.dispatch.serialize_repeating,
            Arc::clone(&self.shared.counters),
        );
        let policy = self.config.dispatch.missed_tick;
        let name = self.config.dispatch.thread_name.clone();

        match thread::Builder::new()
            .name(name.clone())
            .spawn(move || dispatch::run(shared, handoff, policy))
        {
            Ok(handle) => {
                lifecycle.dispatcher = Some(handle);
                info!(
                    max_threads = self.config.pool.thread_limit(),
                    missed_tick = ?policy,
                    "Timer service started"
                );
                Ok(())
            }
            Err(source) => {
                {
                    let mut state = self.shared.state.lock();
                    state.running = false;
                    state.registry.clear();
                }
                self.pool.shutdown();
                Err(Error::ThreadSpawn { name, source })
            }
        }
    }

    /// 停止服务；未运行时为空操作。尚未触发的定时器被丢弃。
    /// Stop the service; a no-op when not running. Pending timers are discarded.
    ///
    /// Only the first of several concurrent callers performs the shutdown; the
    /// others return immediately.
    pub fn stop(&self) -> Result<()> {
        let handle = {
            let mut lifecycle = self.lifecycle.lock();
            let Some(handle) = lifecycle.dispatcher.take() else {
                return Ok(());
            };
            lifecycle.stopping = true;
            handle
        };

        let discarded = {
            let mut state = self.shared.state.lock();
            state.running = false;
            state.stop_requested = true;
            let discarded = state.registry.clear();
            self.shared.wakeup.notify_all();
            discarded
        };
        if discarded > 0 {
            debug!(discarded, "Discarded pending timers on stop");
        }

        // A callback that calls `stop` meanwhile finds no dispatcher and returns,
        // so the worker running it can be joined.
        let joined = handle.join();
        self.pool.shutdown();
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.stopping = false;
            self.stopped.notify_all();
        }
        info!("Timer service stopped");

        joined.map_err(|_| Error::DispatchPanicked)
    }

    /// 调度一次性定时器
    /// Schedule a one-shot timer
    pub fn schedule_once<F>(&self, delay: Duration, callback: F) -> Result<TimerId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(delay, None, Arc::new(callback))
    }

    /// 调度重复定时器，首次执行无延迟
    /// Schedule a repeating timer whose first execution is due immediately
    pub fn schedule_repeating<F>(&self, interval: Duration, callback: F) -> Result<TimerId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule_repeating_with_delay(interval, Duration::ZERO, callback)
    }

    /// 调度重复定时器，首次执行在 `initial_delay` 之后
    /// Schedule a repeating timer whose first execution is due after `initial_delay`
    pub fn schedule_repeating_with_delay<F>(
        &self,
        interval: Duration,
        initial_delay: Duration,
        callback: F,
    ) -> Result<TimerId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if interval.is_zero() {
            return Err(Error::ZeroInterval);
        }
        self.schedule(initial_delay, Some(interval), Arc::new(callback))
    }

    fn schedule(
        &self,
        delay: Duration,
        interval: Option<Duration>,
        callback: TimerCallback,
    ) -> Result<TimerId> {
        let mut state = self.shared.state.lock();
        if !state.running {
            return Err(Error::NotRunning);
        }

        let id = self.shared.ids.next_id()?;
        let deadline = deadline_after(Instant::now(), delay);
        let record = match interval {
            Some(interval) => TimerRecord::repeating(id, deadline, interval, callback),
            None => TimerRecord::once(id, deadline, callback),
        };
        let earliest = state.registry.insert(record);
        drop(state);

        if earliest {
            self.shared.wakeup.notify_one();
        }
        self.shared.counters.record_scheduled();
        trace!(
            timer_id = %id,
            delay_ms = delay.as_millis(),
            interval = ?interval,
            "Timer scheduled"
        );
        Ok(id)
    }

    /// 取消定时器；未知ID（已触发、已取消或不存在）返回 false
    /// Cancel a timer; unknown IDs (fired, cancelled or never issued) return false
    ///
    /// Once this returns `true` the callback is never submitted again. A
    /// callback already running on the pool is not interrupted.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut state = self.shared.state.lock();
        let was_earliest = state.registry.is_earliest(id);
        let removed = state.registry.remove(id).is_some();
        drop(state);

        if removed {
            if was_earliest {
                self.shared.wakeup.notify_one();
            }
            self.shared.counters.record_cancelled(1);
            trace!(timer_id = %id, "Timer cancelled");
        }
        removed
    }

    /// 原子地取消所有定时器
    /// Cancel every timer atomically
    pub fn cancel_all(&self) {
        let cleared = self.shared.state.lock().registry.clear();
        if cleared > 0 {
            self.shared.wakeup.notify_one();
            self.shared.counters.record_cancelled(cleared as u64);
        }
        trace!(cleared, "All timers cancelled");
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// 当前注册的定时器数
    /// Number of currently registered timers
    pub fn active_timer_count(&self) -> usize {
        self.shared.state.lock().registry.len()
    }

    /// 工作线程池中排队的任务数
    /// Number of jobs queued in the worker pool
    pub fn pool_queue_size(&self) -> usize {
        self.pool.queue_size()
    }

    /// 工作线程池中的线程数
    /// Number of threads in the worker pool
    pub fn pool_thread_count(&self) -> usize {
        self.pool.thread_count()
    }

    pub fn stats(&self) -> TimerServiceStats {
        self.shared.counters.snapshot(
            self.active_timer_count(),
            self.pool.queue_size(),
            self.pool.thread_count(),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }
}

impl<P: WorkerPool> Drop for TimerService<P> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "Failed to stop timer service on drop");
        }
    }
}
