//! 调度循环
//! Dispatch loop
//!
//! 一个专用线程在条件变量上睡眠到最早的截止时间，醒来后取出所有到期的
//! 定时器，重新调度重复定时器，并把回调交给工作线程池。新的最早定时器、
//! 取消最早的定时器以及停止请求都会通过同一个条件变量提前唤醒它。
//!
//! A dedicated thread sleeps on a condition variable until the earliest
//! deadline, then drains every due timer, reschedules repeating ones and hands
//! the callbacks to the worker pool. A new earliest timer, cancelling the
//! earliest timer and a stop request all wake it early through the same
//! condition variable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{info, trace};

use super::handoff::{FiredTimer, Handoff};
use super::record::TimerIdGenerator;
use super::registry::TimerRegistry;
use super::stats::TimerCounters;
use crate::config::MissedTickPolicy;
use crate::pool::WorkerPool;

/// Fallback horizon for delays that overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// 受服务锁保护的状态
/// State guarded by the service lock
#[derive(Debug, Default)]
pub(crate) struct DispatchState {
    pub(crate) registry: TimerRegistry,
    pub(crate) running: bool,
    pub(crate) stop_requested: bool,
}

/// 服务与调度线程共享的状态
/// State shared by the service and its dispatch thread
pub(crate) struct Shared {
    pub(crate) state: Mutex<DispatchState>,
    pub(crate) wakeup: Condvar,
    pub(crate) ids: TimerIdGenerator,
    pub(crate) counters: Arc<TimerCounters>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(DispatchState::default()),
            wakeup: Condvar::new(),
            ids: TimerIdGenerator::new(),
            counters: Arc::new(TimerCounters::default()),
        }
    }
}

/// `base + delay`, saturating at a far-future horizon instead of overflowing.
pub(crate) fn deadline_after(base: Instant, delay: Duration) -> Instant {
    base.checked_add(delay)
        .or_else(|| base.checked_add(FAR_FUTURE))
        .unwrap_or(base)
}

/// 计算重复定时器的下一个截止时间
/// Compute the next deadline of a repeating timer
///
/// The next deadline is derived from the previous deadline, not from the time
/// the timer actually fired, so lateness never accumulates into drift. Returns
/// the new deadline and the number of grid ticks in `(previous, now]` that were
/// coalesced into the current firing.
pub(crate) fn next_deadline(
    previous: Instant,
    interval: Duration,
    now: Instant,
    policy: MissedTickPolicy,
) -> (Instant, u64) {
    let on_grid = deadline_after(previous, interval);
    if on_grid > now {
        return (on_grid, 0);
    }

    let step = interval.as_nanos().max(1);
    let missed = now.saturating_duration_since(previous).as_nanos() / step;
    let coalesced = u64::try_from(missed).unwrap_or(u64::MAX);

    let next = match policy {
        MissedTickPolicy::Skip => {
            let offset = step.saturating_mul(missed.saturating_add(1));
            match u64::try_from(offset) {
                Ok(nanos) => deadline_after(previous, Duration::from_nanos(nanos)),
                Err(_) => deadline_after(now, interval),
            }
        }
        MissedTickPolicy::Delay => deadline_after(now, interval),
    };

    (next, coalesced)
}

/// 取出所有到期定时器，重新调度重复定时器并移交回调；返回触发数量
/// Drain every due timer, reschedule repeating ones and hand off the callbacks;
/// returns the number of firings
pub(crate) fn fire_due<P: WorkerPool>(
    registry: &mut TimerRegistry,
    now: Instant,
    policy: MissedTickPolicy,
    handoff: &Handoff<P>,
    counters: &TimerCounters,
) -> usize {
    let due = registry.drain_due(now);
    let fired_count = due.len();

    for mut record in due {
        let fired = FiredTimer {
            id: record.id(),
            callback: record.fire(),
            repeating: record.is_repeating(),
            queued: record.queued_flag(),
        };

        if let Some(interval) = record.interval() {
            let (next, coalesced) = next_deadline(record.deadline(), interval, now, policy);
            if coalesced > 0 {
                trace!(timer_id = %record.id(), coalesced, "Coalesced missed ticks");
            }
            counters.record_coalesced(coalesced);
            record.deadline = next;
            registry.insert(record);
        }

        handoff.submit(fired);
    }

    fired_count
}

/// 调度线程主循环
/// Dispatch thread main loop
pub(crate) fn run<P: WorkerPool>(shared: Arc<Shared>, handoff: Handoff<P>, policy: MissedTickPolicy) {
    info!("Timer dispatch loop started");

    let mut state = shared.state.lock();
    loop {
        if state.stop_requested {
            break;
        }

        // Re-evaluated after every wake, whatever its cause.
        let now = Instant::now();
        match state.registry.peek_earliest_deadline() {
            None => {
                shared.wakeup.wait(&mut state);
                continue;
            }
            Some(deadline) if deadline > now => {
                let _ = shared.wakeup.wait_until(&mut state, deadline);
                continue;
            }
            Some(_) => {}
        }

        let fired = fire_due(&mut state.registry, now, policy, &handoff, &shared.counters);
        trace!(fired, remaining = state.registry.len(), "Dispatched due timers");
    }

    info!("Timer dispatch loop stopped");
}
