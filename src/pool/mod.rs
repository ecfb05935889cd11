//! The bounded worker pool: pending-task queue, capacity bookkeeping,
//! on-demand thread growth, and shutdown.

mod worker;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::task::{Task, TaskInner};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use worker::ExecStats;

/// Snapshot of a pool's execution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks whose closure ran to completion (including panicked ones).
    pub tasks_executed: u64,
    /// Tasks whose closure panicked.
    pub tasks_panicked: u64,
}

/// Everything guarded by the pool mutex.
pub(crate) struct PoolState {
    pub queue: VecDeque<Arc<TaskInner>>,
    pub in_progress: usize,
    pub shutting_down: bool,
    pub workers: Vec<JoinHandle<()>>,
}

pub(crate) struct Shared {
    pub state: Mutex<PoolState>,
    pub available: Condvar,
    pub stats: ExecStats,
    /// Advisory live-worker count mirroring `state.workers.len()`.
    pub threads: AtomicUsize,
}

/// Growth policy: spawn a new worker only when every live worker is busy
/// and the thread cap has not been reached.
pub(crate) fn should_spawn(busy: usize, live: usize, max: usize) -> bool {
    busy == live && live < max
}

/// A bounded pool of worker threads executing [`Task`]s.
///
/// Worker threads are spawned lazily as demand appears, never exceeding
/// the configured `max_threads`. The pending queue is FIFO and hard-capped
/// at `max_queued`; a push against a full queue is rejected, never dropped
/// silently.
pub struct Pool {
    shared: Arc<Shared>,
    config: Config,
}

impl Pool {
    /// Create a pool with up to `max_threads` workers and default queue
    /// capacity. Fails with [`Error::InvalidArgument`] if `max_threads` is
    /// zero or above [`MAX_POOL_THREADS`](crate::config::MAX_POOL_THREADS).
    pub fn new(max_threads: usize) -> Result<Self> {
        Self::with_config(Config::builder().max_threads(max_threads).build()?)
    }

    /// Create a pool from a validated [`Config`].
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    in_progress: 0,
                    shutting_down: false,
                    workers: Vec::new(),
                }),
                available: Condvar::new(),
                stats: ExecStats::default(),
                threads: AtomicUsize::new(0),
            }),
            config,
        })
    }

    /// Enqueue a task for execution.
    ///
    /// The task transitions to `Queued`; if every live worker is busy and
    /// the thread cap allows, a new worker is spawned. A failed spawn is
    /// absorbed: the push still succeeds and the task waits for a worker.
    ///
    /// Fails with [`Error::TooManyTasks`] when the queue is at capacity
    /// and with [`Error::InvalidArgument`] when the task was already
    /// pushed or the pool has been shut down.
    pub fn push<T>(&self, task: &Task<T>) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.shutting_down {
            return Err(Error::invalid_argument("pool has been shut down"));
        }
        if state.queue.len() >= self.config.max_queued {
            return Err(Error::TooManyTasks);
        }

        let inner = task.inner();
        inner.mark_queued()?;
        state.queue.push_back(inner.clone());

        let live = state.workers.len();
        if should_spawn(state.in_progress, live, self.config.worker_threads()) {
            match self.spawn_worker(live) {
                Ok(handle) => {
                    state.workers.push(handle);
                    self.shared.threads.store(state.workers.len(), Ordering::Release);
                }
                // non-fatal: the task stays queued for an existing worker
                // or a later spawn attempt
                Err(err) => tracing::warn!(error = %err, "failed to spawn worker"),
            }
        }
        drop(state);

        self.shared.available.notify_one();
        Ok(())
    }

    fn spawn_worker(&self, id: usize) -> std::io::Result<JoinHandle<()>> {
        let name = format!("{}-{}", self.config.thread_name_prefix, id);
        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let shared = self.shared.clone();
        let handle = builder.spawn(move || worker::run(shared))?;
        tracing::debug!(worker = %name, "spawned worker");
        Ok(handle)
    }

    /// Current live worker count. Advisory: may be stale under concurrent
    /// growth. Never blocks.
    pub fn thread_count(&self) -> usize {
        self.shared.threads.load(Ordering::Acquire)
    }

    /// Number of tasks waiting in the queue. Advisory.
    pub fn queued_tasks(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Number of tasks currently being executed. Advisory.
    pub fn in_flight(&self) -> usize {
        self.shared.state.lock().in_progress
    }

    /// Execution counters accumulated over the pool's lifetime.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            tasks_executed: self.shared.stats.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: self.shared.stats.tasks_panicked.load(Ordering::Relaxed),
        }
    }

    /// Shut the pool down and join every worker thread.
    ///
    /// Never waits for outstanding work: fails with [`Error::HasTasks`]
    /// while any task is queued or in flight, leaving the pool untouched.
    /// The caller must join or detach everything first. Idempotent once it
    /// has succeeded.
    pub fn shutdown(&mut self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !state.queue.is_empty() || state.in_progress > 0 {
            return Err(Error::HasTasks);
        }
        state.shutting_down = true;
        let workers = std::mem::take(&mut state.workers);
        drop(state);

        self.shared.available.notify_all();
        for handle in workers {
            let _ = handle.join();
        }
        self.shared.threads.store(0, Ordering::Release);
        tracing::debug!("pool shut down");
        Ok(())
    }
}

impl Drop for Pool {
    /// Best-effort forced shutdown. Dropping a pool that still has queued
    /// tasks is a contract violation: the backlog is discarded unexecuted
    /// (and logged), while in-flight tasks complete because workers only
    /// observe the flag between tasks.
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if !state.queue.is_empty() || state.in_progress > 0 {
            tracing::warn!(
                queued = state.queue.len(),
                in_flight = state.in_progress,
                "pool dropped while busy; discarding queued tasks"
            );
            state.queue.clear();
        }
        state.shutting_down = true;
        let workers = std::mem::take(&mut state.workers);
        drop(state);

        self.shared.available.notify_all();
        for handle in workers {
            let _ = handle.join();
        }
        self.shared.threads.store(0, Ordering::Release);
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Pool")
            .field("max_threads", &self.config.worker_threads())
            .field("live_threads", &state.workers.len())
            .field("queued", &state.queue.len())
            .field("in_progress", &state.in_progress)
            .field("shutting_down", &state.shutting_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_spawn_policy() {
        // first push on an empty pool
        assert!(should_spawn(0, 0, 4));
        // all workers busy, below the cap
        assert!(should_spawn(2, 2, 4));
        // an idle worker exists
        assert!(!should_spawn(1, 2, 4));
        // cap reached
        assert!(!should_spawn(4, 4, 4));
        assert!(!should_spawn(0, 4, 4));
    }

    #[test]
    fn test_new_pool_rejects_bad_bounds() {
        assert!(Pool::new(0).is_err());
        assert!(Pool::new(crate::config::MAX_POOL_THREADS + 1).is_err());
    }

    #[test]
    fn test_fresh_pool_is_idle() {
        let mut pool = Pool::new(2).unwrap();
        assert_eq!(pool.thread_count(), 0);
        assert_eq!(pool.queued_tasks(), 0);
        assert_eq!(pool.in_flight(), 0);
        assert!(pool.shutdown().is_ok());
    }

    #[test]
    fn test_push_after_shutdown_fails() {
        let mut pool = Pool::new(1).unwrap();
        pool.shutdown().unwrap();

        let task = Task::new(|| ());
        assert!(matches!(pool.push(&task), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_double_push_fails() {
        let pool = Pool::new(1).unwrap();
        let task = Task::new(|| 1);
        pool.push(&task).unwrap();
        assert!(matches!(pool.push(&task), Err(Error::InvalidArgument(_))));
        task.join().unwrap();
    }
}
