//! 测试辅助工具模块
//! Test utilities module

#![cfg(test)]

use crate::error::Result;
use crate::pool::{Job, SerialKey, WorkerPool};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A callback counter shared between a test and the callbacks it schedules.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns a callback that increments this counter.
    pub fn callback(&self) -> impl Fn() + Send + Sync + 'static {
        let inner = Arc::clone(&self.0);
        move || {
            inner.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Polls `condition` every few milliseconds until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

/// A worker pool that only records submissions; the test decides when jobs run.
#[derive(Default)]
pub struct ManualPool {
    pub jobs: Mutex<Vec<(Option<SerialKey>, Job)>>,
}

impl ManualPool {
    /// Runs every recorded job on the calling thread, returning how many ran.
    pub fn run_all(&self) -> usize {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        let count = jobs.len();
        for (_, job) in jobs {
            job();
        }
        count
    }

    pub fn serial_keys(&self) -> Vec<Option<SerialKey>> {
        self.jobs.lock().iter().map(|(key, _)| *key).collect()
    }
}

impl WorkerPool for ManualPool {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn submit(&self, job: Job) -> Result<()> {
        self.jobs.lock().push((None, job));
        Ok(())
    }

    fn submit_serial(&self, key: SerialKey, job: Job) -> Result<()> {
        self.jobs.lock().push((Some(key), job));
        Ok(())
    }

    fn shutdown(&self) {
        self.jobs.lock().clear();
    }

    fn queue_size(&self) -> usize {
        self.jobs.lock().len()
    }

    fn thread_count(&self) -> usize {
        0
    }
}
