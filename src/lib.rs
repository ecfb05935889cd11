//! corral - a bounded worker pool with per-task lifecycle control.
//!
//! Opaque units of work ([`Task`]) are executed on a capped set of worker
//! threads owned by a [`Pool`]. Workers are spawned on demand, one at a
//! time, only while every live worker is busy; the pending queue is
//! hard-capped and rejects overflow instead of growing.
//!
//! Each task can be observed without blocking, joined, joined with a
//! deadline, or detached so the pool disposes of it on completion.
//!
//! # Quick Start
//!
//! ```
//! use corral::{Pool, Task};
//!
//! let mut pool = Pool::new(4).unwrap();
//!
//! let task = Task::new(|| (0..100).sum::<i32>());
//! pool.push(&task).unwrap();
//!
//! assert_eq!(task.join().unwrap(), 4950);
//! pool.shutdown().unwrap();
//! ```
//!
//! # Guarantees
//!
//! - Live worker threads never exceed the configured `max_threads`.
//! - Queue and counter updates are linearizable under the pool's single
//!   mutex; two concurrent pushes never double-count one spawn decision.
//! - Task bodies run with no lock held; a long-running task cannot starve
//!   pushes or pool-state queries.
//! - Once a worker has dequeued a task it runs to completion; a timed join
//!   that elapses only stops waiting, never the task.
//! - Dequeue order is FIFO.

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod pool;
pub mod prelude;
pub mod task;

pub use config::{Config, ConfigBuilder, MAX_POOL_THREADS, MAX_QUEUED_TASKS};
pub use error::{Error, Result};
pub use pool::{Pool, PoolStats};
pub use task::{Task, TaskState};
