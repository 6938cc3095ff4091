//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// The primary error type for the timer service library.
/// 定时器服务库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// A timer was scheduled while the service was not running.
    /// 在服务未运行时调度了定时器。
    #[error("Timer service is not running")]
    NotRunning,

    /// A repeating timer was requested with a zero interval.
    /// 请求了间隔为零的重复定时器。
    #[error("Repeating timer interval must be greater than zero")]
    ZeroInterval,

    /// The timer identity counter ran out of values.
    /// 定时器ID计数器已耗尽。
    #[error("Timer identity space exhausted")]
    IdSpaceExhausted,

    /// The operating system refused to create a thread.
    /// 操作系统拒绝创建线程。
    #[error("Failed to spawn thread `{name}`: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be started.
    /// 工作线程池无法启动。
    #[error("Failed to start worker pool: {0}")]
    PoolStart(#[source] std::io::Error),

    /// A job was submitted to a worker pool that is not running.
    /// 向未运行的工作线程池提交了任务。
    #[error("Worker pool is not running")]
    PoolStopped,

    /// The dispatch thread terminated by panicking.
    /// 调度线程因 panic 而终止。
    #[error("Timer dispatch thread panicked")]
    DispatchPanicked,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
