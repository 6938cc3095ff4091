//! 执行移交：把到期回调提交给工作线程池
//! Execution handoff: submits due callbacks to the worker pool
//!
//! 串行化的重复定时器在池中最多只有一次尚未开始的触发；池繁忙时后续触发被
//! 合并，而不是在队列中堆积后连续执行。
//!
//! A serialized repeating timer has at most one not-yet-started firing in the
//! pool; while the pool is busy, further firings are coalesced instead of piling
//! up and then running back to back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{trace, warn};

use super::record::{TimerCallback, TimerId};
use super::stats::TimerCounters;
use crate::pool::WorkerPool;

/// 一次到期触发，等待提交
/// One due firing, waiting to be submitted
pub(crate) struct FiredTimer {
    pub(crate) id: TimerId,
    pub(crate) callback: TimerCallback,
    pub(crate) repeating: bool,
    pub(crate) queued: Arc<AtomicBool>,
}

/// 执行移交
/// Execution handoff
pub(crate) struct Handoff<P: WorkerPool> {
    pool: Arc<P>,
    serialize_repeating: bool,
    counters: Arc<TimerCounters>,
}

impl<P: WorkerPool> Handoff<P> {
    pub(crate) fn new(pool: Arc<P>, serialize_repeating: bool, counters: Arc<TimerCounters>) -> Self {
        Self {
            pool,
            serialize_repeating,
            counters,
        }
    }

    /// 提交一次触发，不等待执行完成
    /// Submit one firing without waiting for it to run
    pub(crate) fn submit(&self, fired: FiredTimer) {
        let FiredTimer {
            id,
            callback,
            repeating,
            queued,
        } = fired;
        let serial = repeating && self.serialize_repeating;
        if serial && queued.swap(true, Ordering::AcqRel) {
            self.counters.record_coalesced(1);
            trace!(timer_id = %id, "Previous firing still queued, coalesced");
            return;
        }

        let started = Arc::clone(&queued);
        let job = Box::new(move || {
            started.store(false, Ordering::Release);
            callback()
        });

        let result = if serial {
            self.pool.submit_serial(id.as_u64(), job)
        } else {
            self.pool.submit(job)
        };

        match result {
            Ok(()) => {
                self.counters.record_fired();
                trace!(timer_id = %id, repeating, "Timer callback handed to worker pool");
            }
            Err(err) => {
                queued.store(false, Ordering::Release);
                self.counters.record_handoff_failure();
                warn!(timer_id = %id, error = %err, "Failed to hand timer callback to worker pool");
            }
        }
    }
}
