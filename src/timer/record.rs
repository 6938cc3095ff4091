//! 定时器记录
//! Timer record

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// 定时器回调，无参数调用，可能在任意工作线程上执行
/// Timer callback, invoked with no arguments on any worker thread
pub type TimerCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// 定时器ID，用于唯一标识一个已注册的定时器
/// Timer ID, uniquely identifies a registered timer
///
/// Zero is never a valid identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(NonZeroU64);

impl TimerId {
    /// 从原始值构造，0 返回 `None`
    /// Construct from a raw value; 0 yields `None`
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 单调递增的定时器ID生成器，从1开始，耗尽后不回绕
/// Monotonic timer ID generator, starting at 1; never wraps once exhausted
#[derive(Debug)]
pub(crate) struct TimerIdGenerator {
    next: AtomicU64,
}

impl TimerIdGenerator {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_id(&self) -> Result<TimerId> {
        let raw = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| raw.checked_add(1))
            .map_err(|_| Error::IdSpaceExhausted)?;
        TimerId::from_raw(raw).ok_or(Error::IdSpaceExhausted)
    }
}

/// 定时器记录：不可变的身份和可变的调度状态
/// Timer record: immutable identity plus mutable scheduling state
pub struct TimerRecord {
    id: TimerId,
    callback: TimerCallback,
    /// 下一次执行时间
    /// Next execution time
    pub(crate) deadline: Instant,
    /// `Some` 表示重复定时器
    /// `Some` means repeating
    interval: Option<Duration>,
    fire_count: u64,
    /// 已提交但尚未开始执行的触发
    /// Set while a submitted firing has not started running yet
    queued: Arc<AtomicBool>,
}

impl TimerRecord {
    pub fn once(id: TimerId, deadline: Instant, callback: TimerCallback) -> Self {
        Self {
            id,
            callback,
            deadline,
            interval: None,
            fire_count: 0,
            queued: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn repeating(
        id: TimerId,
        deadline: Instant,
        interval: Duration,
        callback: TimerCallback,
    ) -> Self {
        Self {
            id,
            callback,
            deadline,
            interval: Some(interval),
            fire_count: 0,
            queued: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn is_repeating(&self) -> bool {
        self.interval.is_some()
    }

    /// How many times this record has come due.
    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }

    /// Records one firing and returns a handle to the callback.
    pub(crate) fn fire(&mut self) -> TimerCallback {
        self.fire_count += 1;
        Arc::clone(&self.callback)
    }

    pub(crate) fn queued_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.queued)
    }
}

impl fmt::Debug for TimerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRecord")
            .field("id", &self.id)
            .field("deadline", &self.deadline)
            .field("interval", &self.interval)
            .field("fire_count", &self.fire_count)
            .finish_non_exhaustive()
    }
}
