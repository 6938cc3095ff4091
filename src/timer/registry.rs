//! 定时器注册表
//! Timer registry
//!
//! 注册表在同一组定时器记录上维护两个索引：按下一次执行时间排序的索引，
//! 以及按定时器ID查找的索引。它本身不加锁，总是在服务锁的保护下访问，
//! 因此两个索引的每次修改都在同一个临界区内完成。
//!
//! The registry keeps two indexes over the same set of timer records: one
//! ordered by next execution time and one keyed by timer ID. It is not
//! synchronised itself; it is always accessed under the service lock, so every
//! mutation touches both indexes inside one critical section.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use super::record::{TimerId, TimerRecord};

/// 双索引定时器注册表
/// Dual-index timer registry
#[derive(Debug, Default)]
pub struct TimerRegistry {
    /// 按 (截止时间, ID) 排序；相同截止时间按ID排序
    /// Ordered by (deadline, id); equal deadlines are ordered by id
    by_deadline: BTreeSet<(Instant, TimerId)>,
    /// ID 到记录的映射，拥有所有记录
    /// ID to record mapping, owns every record
    by_id: HashMap<TimerId, TimerRecord>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入记录，返回该记录是否成为最早的截止时间
    /// Insert a record; returns whether it is now the earliest deadline
    pub fn insert(&mut self, record: TimerRecord) -> bool {
        let key = (record.deadline(), record.id());
        if let Some(previous) = self.by_id.insert(record.id(), record) {
            // Same identity re-inserted: drop its stale ordering entry.
            self.by_deadline.remove(&(previous.deadline(), previous.id()));
        }
        self.by_deadline.insert(key);
        self.by_deadline.first() == Some(&key)
    }

    /// 按ID移除记录
    /// Remove a record by ID
    pub fn remove(&mut self, id: TimerId) -> Option<TimerRecord> {
        let record = self.by_id.remove(&id)?;
        self.by_deadline.remove(&(record.deadline(), id));
        Some(record)
    }

    /// 清空两个索引，返回被丢弃的记录数
    /// Clear both indexes; returns how many records were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.by_id.len();
        self.by_deadline.clear();
        self.by_id.clear();
        dropped
    }

    pub fn peek_earliest_deadline(&self) -> Option<Instant> {
        self.by_deadline.first().map(|&(deadline, _)| deadline)
    }

    /// Whether `id` is the record with the earliest deadline.
    pub fn is_earliest(&self, id: TimerId) -> bool {
        self.by_deadline
            .first()
            .is_some_and(|&(_, earliest)| earliest == id)
    }

    /// 移除并返回所有截止时间不晚于 `now` 的记录，按截止时间升序
    /// Remove and return every record due at or before `now`, in ascending deadline order
    pub fn drain_due(&mut self, now: Instant) -> Vec<TimerRecord> {
        let mut due = Vec::new();
        while let Some(&(deadline, id)) = self.by_deadline.first() {
            if deadline > now {
                break;
            }
            self.by_deadline.pop_first();
            if let Some(record) = self.by_id.remove(&id) {
                due.push(record);
            }
        }
        due
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
