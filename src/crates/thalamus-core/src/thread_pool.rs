//! Fixed-size worker pool for CPU-heavy per-frame offload.
//!
//! Heavy consumers (image pipelines, deflate, serialization) push jobs
//! from `ready` handlers. The pool makes no FIFO guarantee across
//! workers. Callers that prefer dropping frames over queueing check
//! [`ThreadPool::full`] before pushing.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    jobs: VecDeque<Job>,
    running: bool,
    threads: Vec<std::thread::JoinHandle<()>>,
}

struct PoolInner {
    name: String,
    state: Mutex<PoolState>,
    condition: Condvar,
    busy: AtomicUsize,
    num_threads: usize,
}

/// A named pool of OS worker threads.
#[derive(Clone)]
pub struct ThreadPool {
    inner: Arc<PoolInner>,
}

impl ThreadPool {
    /// Creates a stopped pool. `num_threads == 0` selects the hardware
    /// concurrency.
    pub fn new(name: impl Into<String>, num_threads: usize) -> Self {
        let num_threads = if num_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            num_threads
        };
        Self {
            inner: Arc::new(PoolInner {
                name: name.into(),
                state: Mutex::new(PoolState {
                    jobs: VecDeque::new(),
                    running: false,
                    threads: Vec::new(),
                }),
                condition: Condvar::new(),
                // Workers count as busy until started.
                busy: AtomicUsize::new(0),
                num_threads,
            }),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.inner.num_threads
    }

    pub fn start(&self) {
        let mut state = self.inner.state.lock();
        if state.running {
            return;
        }
        state.running = true;
        for i in 0..self.inner.num_threads {
            let inner = Arc::clone(&self.inner);
            let thread_name = format!("{}[{}]", self.inner.name, i);
            let handle = std::thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_target(inner))
                .expect("failed to spawn pool worker");
            state.threads.push(handle);
            tracing::trace!(thread = %thread_name, "started pool worker");
        }
    }

    pub fn stop(&self) {
        let threads = {
            let mut state = self.inner.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
            self.inner.condition.notify_all();
            std::mem::take(&mut state.threads)
        };
        for handle in threads {
            let _ = handle.join();
        }
        self.inner.state.lock().jobs.clear();
    }

    /// Enqueues a job. The caller is responsible for checking [`full`]
    /// first when frame-dropping behavior is wanted.
    ///
    /// [`full`]: ThreadPool::full
    pub fn push(&self, job: impl FnOnce() + Send + 'static) {
        let mut state = self.inner.state.lock();
        state.jobs.push_back(Box::new(job));
        self.inner.condition.notify_one();
    }

    /// True when every worker is currently occupied.
    pub fn full(&self) -> bool {
        self.inner.busy.load(Ordering::Relaxed) >= self.inner.num_threads
    }

    /// Number of idle workers.
    pub fn idle(&self) -> usize {
        self.inner
            .num_threads
            .saturating_sub(self.inner.busy.load(Ordering::Relaxed))
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            self.stop();
        }
    }
}

fn worker_target(inner: Arc<PoolInner>) {
    loop {
        let job = {
            let mut state = inner.state.lock();
            loop {
                if !state.running {
                    return;
                }
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                inner.condition.wait(&mut state);
            }
        };

        inner.busy.fetch_add(1, Ordering::Relaxed);
        job();
        inner.busy.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_jobs_run() {
        let pool = ThreadPool::new("test", 2);
        pool.start();
        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..16 {
            let counter = Arc::clone(&counter);
            pool.push(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) < 16 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 16);
        pool.stop();
    }

    #[test]
    fn test_full_and_idle() {
        let pool = ThreadPool::new("test", 1);
        pool.start();
        assert!(!pool.full());
        assert_eq!(pool.idle(), 1);

        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let gate2 = Arc::clone(&gate);
        pool.push(move || {
            let (lock, cvar) = &*gate2;
            let mut released = lock.lock();
            while !*released {
                cvar.wait(&mut released);
            }
        });

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !pool.full() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(pool.full());
        assert_eq!(pool.idle(), 0);

        {
            let (lock, cvar) = &*gate;
            *lock.lock() = true;
            cvar.notify_all();
        }
        pool.stop();
    }

    #[test]
    fn test_stop_drops_queued_jobs() {
        let pool = ThreadPool::new("test", 1);
        // Never started: queued jobs are discarded at stop.
        pool.push(|| panic!("should not run"));
        pool.stop();
    }
}
