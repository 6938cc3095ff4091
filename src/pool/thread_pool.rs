//! 有界工作线程池实现
//! Bounded worker thread pool implementation
//!
//! 启动时预先创建部分工作线程，提交任务时若可执行任务多于空闲线程则按需
//! 扩展，直到达到最大线程数。除了普通的先进先出队列外，还支持串行键：同一个
//! 键的任务逐个按提交顺序执行，不同键之间可以并行。
//!
//! Some workers are spawned when the pool starts; more are spawned on submit
//! whenever runnable jobs outnumber idle workers, up to the configured maximum.
//! Besides the plain FIFO queue the pool supports serial keys: jobs sharing a
//! key run one at a time in submission order, while different keys run in
//! parallel.

use super::{Job, SerialKey, WorkerPool, run_job};
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

/// 取出的待执行任务
/// Work taken off the queues
struct Work {
    job: Job,
    serial_key: Option<SerialKey>,
}

/// 线程池的共享可变状态
/// Shared mutable state of the pool
#[derive(Default)]
struct PoolState {
    running: bool,
    /// 每次关闭时递增；旧代的工作线程看到新代号后退出
    /// Bumped on every shutdown; workers of an older generation exit
    generation: u64,
    tasks: VecDeque<Job>,
    serial_tasks: HashMap<SerialKey, VecDeque<Job>>,
    /// 有待执行任务且当前没有任务在运行的串行键
    /// Serial keys with pending jobs and no job currently running
    ready_keys: VecDeque<SerialKey>,
    running_keys: HashSet<SerialKey>,
    threads: usize,
    idle: usize,
    next_thread_index: usize,
}

impl PoolState {
    /// Jobs a worker could pick up right now.
    fn runnable(&self) -> usize {
        self.tasks.len() + self.ready_keys.len()
    }

    fn queued(&self) -> usize {
        self.tasks.len() + self.serial_tasks.values().map(VecDeque::len).sum::<usize>()
    }

    fn next_work(&mut self) -> Option<Work> {
        if let Some(job) = self.tasks.pop_front() {
            return Some(Work {
                job,
                serial_key: None,
            });
        }

        while let Some(key) = self.ready_keys.pop_front() {
            let Some(job) = self.serial_tasks.get_mut(&key).and_then(VecDeque::pop_front) else {
                continue;
            };
            self.running_keys.insert(key);
            return Some(Work {
                job,
                serial_key: Some(key),
            });
        }

        None
    }

    /// Releases a serial key; returns true if more jobs are waiting under it.
    fn finish_serial(&mut self, key: SerialKey) -> bool {
        self.running_keys.remove(&key);
        let pending = self
            .serial_tasks
            .get(&key)
            .is_some_and(|queue| !queue.is_empty());
        if pending {
            self.ready_keys.push_back(key);
        } else {
            self.serial_tasks.remove(&key);
        }
        pending
    }

    fn discard_queued(&mut self) -> usize {
        let discarded = self.queued();
        self.tasks.clear();
        self.serial_tasks.clear();
        self.ready_keys.clear();
        self.running_keys.clear();
        discarded
    }
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
    signal: Condvar,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// 有界工作线程池
/// Bounded worker thread pool
pub struct ThreadPool {
    inner: Arc<PoolInner>,
}

impl ThreadPool {
    /// 创建新的线程池（尚未启动）
    /// Create a new pool (not yet started)
    pub fn new(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState::default()),
                signal: Condvar::new(),
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// 使用默认参数和指定最大线程数创建线程池
    /// Create a pool with default parameters and the given thread cap
    pub fn with_max_threads(max_threads: usize) -> Self {
        Self::new(PoolConfig::with_max_threads(max_threads))
    }

    /// 线程池名称
    /// Pool name
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// 在持有状态锁的情况下创建一个工作线程
    /// Spawn one worker while holding the state lock
    fn spawn_worker(&self, state: &mut MutexGuard<'_, PoolState>) -> Result<()> {
        let index = state.next_thread_index;
        let generation = state.generation;
        let name = format!("{}-{}", self.inner.config.name, index);
        let inner = Arc::clone(&self.inner);

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(inner, generation))
            .map_err(|source| Error::ThreadSpawn {
                name: name.clone(),
                source,
            })?;

        state.next_thread_index += 1;
        state.threads += 1;
        self.inner.workers.lock().push(handle);
        trace!(thread = %name, threads = state.threads, "Worker thread spawned");
        Ok(())
    }

    /// 可执行任务多于空闲线程时按需扩展
    /// Grow on demand when runnable jobs outnumber idle workers
    fn grow_if_needed(&self, state: &mut MutexGuard<'_, PoolState>) -> Result<()> {
        if state.runnable() <= state.idle || state.threads >= self.inner.config.thread_limit() {
            return Ok(());
        }

        match self.spawn_worker(state) {
            Ok(()) => Ok(()),
            // Existing workers will still drain the queue.
            Err(err) if state.threads > 0 => {
                warn!(pool = %self.inner.config.name, error = %err, "Failed to grow worker pool");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn enqueue(&self, job: Job, serial_key: Option<SerialKey>) -> Result<()> {
        let mut state = self.inner.state.lock();
        if !state.running {
            return Err(Error::PoolStopped);
        }

        match serial_key {
            None => state.tasks.push_back(job),
            Some(key) => {
                let queue = state.serial_tasks.entry(key).or_default();
                let was_empty = queue.is_empty();
                queue.push_back(job);
                // A busy key is re-queued by `finish_serial`.
                if was_empty && !state.running_keys.contains(&key) {
                    state.ready_keys.push_back(key);
                }
            }
        }

        if let Err(err) = self.grow_if_needed(&mut state) {
            // No worker could ever pick the job up.
            state.discard_queued();
            return Err(err);
        }
        self.inner.signal.notify_one();
        Ok(())
    }
}

impl WorkerPool for ThreadPool {
    fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.running {
            return Ok(());
        }
        state.running = true;

        for _ in 0..self.inner.config.eager_threads() {
            if let Err(err) = self.spawn_worker(&mut state) {
                state.running = false;
                state.generation += 1;
                self.inner.signal.notify_all();
                drop(state);
                join_workers(&self.inner);
                return Err(err);
            }
        }

        info!(
            pool = %self.inner.config.name,
            threads = state.threads,
            max_threads = self.inner.config.thread_limit(),
            "Worker pool started"
        );
        Ok(())
    }

    fn submit(&self, job: Job) -> Result<()> {
        self.enqueue(job, None)
    }

    fn submit_serial(&self, key: SerialKey, job: Job) -> Result<()> {
        self.enqueue(job, Some(key))
    }

    fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
            state.generation += 1;
            let discarded = state.discard_queued();
            if discarded > 0 {
                debug!(pool = %self.inner.config.name, discarded, "Discarded queued jobs on shutdown");
            }
            self.inner.signal.notify_all();
        }

        join_workers(&self.inner);
        info!(pool = %self.inner.config.name, "Worker pool stopped");
    }

    fn queue_size(&self) -> usize {
        self.inner.state.lock().queued()
    }

    fn thread_count(&self) -> usize {
        self.inner.state.lock().threads
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Joins every worker except the calling thread, which exits on its own once
/// its current job returns.
fn join_workers(inner: &PoolInner) {
    let workers = std::mem::take(&mut *inner.workers.lock());
    let current = thread::current().id();
    for handle in workers {
        if handle.thread().id() == current {
            continue;
        }
        if handle.join().is_err() {
            warn!(pool = %inner.config.name, "Worker thread terminated abnormally");
        }
    }
}

fn worker_loop(inner: Arc<PoolInner>, generation: u64) {
    let mut state = inner.state.lock();
    loop {
        if !state.running || state.generation != generation {
            break;
        }

        let Some(work) = state.next_work() else {
            state.idle += 1;
            inner.signal.wait(&mut state);
            state.idle -= 1;
            continue;
        };

        MutexGuard::unlocked(&mut state, || run_job(work.job, &inner.config.name));

        if let Some(key) = work.serial_key {
            if state.generation == generation && state.finish_serial(key) {
                inner.signal.notify_one();
            }
        }
    }
    state.threads -= 1;
}
