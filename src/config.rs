//! 定义了定时器服务和工作线程池的可配置参数。
//! Defines configurable parameters for the timer service and its worker pool.

use std::time::Duration;

/// A structure containing all configurable parameters for a timer service.
///
/// 包含定时器服务所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Worker pool parameters.
    /// 工作线程池参数。
    pub pool: PoolConfig,

    /// Dispatch loop parameters.
    /// 调度循环参数。
    pub dispatch: DispatchConfig,
}

impl Config {
    /// Default configuration with a worker pool capped at `max_threads`.
    /// 使用最多 `max_threads` 个线程的工作线程池的默认配置。
    pub fn with_max_threads(max_threads: usize) -> Self {
        Self {
            pool: PoolConfig::with_max_threads(max_threads),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Worker pool parameters.
///
/// 工作线程池参数。
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Prefix for worker thread names. Workers are named `{name}-{index}`.
    /// 工作线程名称前缀。线程命名为 `{name}-{index}`。
    pub name: String,
    /// The maximum number of worker threads. Values below 1 are treated as 1.
    /// 工作线程的最大数量。小于1的值按1处理。
    pub max_threads: usize,
    /// The number of workers spawned eagerly when the pool starts.
    /// 线程池启动时预先创建的工作线程数量。
    pub pre_alloc_threads: usize,
    /// How long a pool waits for running jobs when it is shut down.
    /// Only used by pools that cannot join their threads directly.
    ///
    /// 线程池关闭时等待运行中任务的时长。
    /// 仅用于无法直接 join 线程的线程池。
    pub shutdown_timeout: Duration,
}

impl PoolConfig {
    /// Default pool parameters with a custom thread cap.
    /// 使用自定义线程上限的默认线程池参数。
    pub fn with_max_threads(max_threads: usize) -> Self {
        Self {
            max_threads: max_threads.max(1),
            ..Self::default()
        }
    }

    /// The effective thread cap, never zero.
    pub fn thread_limit(&self) -> usize {
        self.max_threads.max(1)
    }

    /// The effective number of eagerly spawned workers, never above the cap.
    pub fn eager_threads(&self) -> usize {
        self.pre_alloc_threads.min(self.thread_limit())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "timer-worker".to_string(),
            max_threads: 4,
            pre_alloc_threads: 1,
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

/// How a repeating timer is rescheduled after the dispatch loop fell behind
/// by one or more whole intervals.
///
/// 调度循环落后一个或多个完整间隔后，重复定时器的重新调度方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissedTickPolicy {
    /// Keep the original grid. The next deadline is the first grid point after
    /// the current time; missed ticks are folded into the firing that just happened.
    ///
    /// 保持原有的时间网格。下一个截止时间是当前时间之后的第一个网格点；
    /// 错过的触发合并到刚刚发生的那次触发中。
    #[default]
    Skip,
    /// Shift the grid. The next deadline is one interval after the current time.
    ///
    /// 平移时间网格。下一个截止时间是当前时间之后的一个间隔。
    Delay,
}

/// Dispatch loop parameters.
///
/// 调度循环参数。
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Name of the dispatch thread.
    /// 调度线程名称。
    pub thread_name: String,
    /// Rescheduling rule for repeating timers that missed ticks.
    /// 错过触发的重复定时器的重新调度规则。
    pub missed_tick: MissedTickPolicy,
    /// Submit successive firings of one repeating timer under a shared serial
    /// key so they never overlap on pools that honour serial keys.
    ///
    /// 以同一个串行键提交同一重复定时器的连续触发，
    /// 使其在支持串行键的线程池上不会重叠执行。
    pub serialize_repeating: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            thread_name: "timer-dispatch".to_string(),
            missed_tick: MissedTickPolicy::Skip,
            serialize_repeating: true,
        }
    }
}
