//! 定时器服务统计信息
//! Timer service statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// 调度循环和调用方共享的无锁计数器
/// Lock-free counters shared by the dispatch loop and callers
#[derive(Debug, Default)]
pub(crate) struct TimerCounters {
    scheduled: AtomicU64,
    fired: AtomicU64,
    cancelled: AtomicU64,
    coalesced: AtomicU64,
    handoff_failures: AtomicU64,
}

impl TimerCounters {
    pub(crate) fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fired(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self, count: u64) {
        self.cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_coalesced(&self, ticks: u64) {
        if ticks > 0 {
            self.coalesced.fetch_add(ticks, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_handoff_failure(&self) {
        self.handoff_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        active_timers: usize,
        pool_queue_size: usize,
        pool_thread_count: usize,
    ) -> TimerServiceStats {
        TimerServiceStats {
            active_timers,
            scheduled_timers: self.scheduled.load(Ordering::Relaxed),
            fired_timers: self.fired.load(Ordering::Relaxed),
            cancelled_timers: self.cancelled.load(Ordering::Relaxed),
            coalesced_ticks: self.coalesced.load(Ordering::Relaxed),
            handoff_failures: self.handoff_failures.load(Ordering::Relaxed),
            pool_queue_size,
            pool_thread_count,
        }
    }
}

/// 定时器服务统计信息
/// Timer service statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerServiceStats {
    /// 当前注册的定时器数
    /// Number of currently registered timers
    pub active_timers: usize,
    /// 累计调度的定时器数
    /// Total timers scheduled
    pub scheduled_timers: u64,
    /// 累计交给线程池的触发次数
    /// Total firings handed to the pool
    pub fired_timers: u64,
    /// 累计取消的定时器数
    /// Total timers cancelled
    pub cancelled_timers: u64,
    /// 因调度落后而合并的触发次数
    /// Ticks folded away because the loop fell behind
    pub coalesced_ticks: u64,
    /// 提交到线程池失败的次数
    /// Failed submissions to the pool
    pub handoff_failures: u64,
    pub pool_queue_size: usize,
    pub pool_thread_count: usize,
}

impl std::fmt::Display for TimerServiceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimerServiceStats {{ active: {}, scheduled: {}, fired: {}, cancelled: {}, coalesced: {}, handoff_failures: {}, pool: {} queued / {} threads }}",
            self.active_timers,
            self.scheduled_timers,
            self.fired_timers,
            self.cancelled_timers,
            self.coalesced_ticks,
            self.handoff_failures,
            self.pool_queue_size,
            self.pool_thread_count
        )
    }
}
