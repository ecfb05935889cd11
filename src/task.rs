//! Task handles and the task lifecycle state machine.
//!
//! A [`Task`] is a unit of deferred work: a closure, its eventual result,
//! and a small state machine coordinating the caller with the worker that
//! executes it. The handle is typed; internally the closure and result are
//! type-erased so a pool can queue heterogeneous tasks.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Observable lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Created but not yet pushed into a pool.
    Created = 0,
    /// Sitting in a pool's pending queue.
    Queued = 1,
    /// Being executed by a worker.
    Running = 2,
    /// Execution complete, result waiting to be joined.
    Finished = 3,
    /// Result taken (or forfeited); the task is eligible for deletion.
    Joined = 4,
    /// Released from the join protocol; the worker finalizes it.
    Detached = 5,
}

impl TaskState {
    fn from_u8(v: u8) -> TaskState {
        match v {
            0 => TaskState::Created,
            1 => TaskState::Queued,
            2 => TaskState::Running,
            3 => TaskState::Finished,
            4 => TaskState::Joined,
            _ => TaskState::Detached,
        }
    }
}

type ErasedFn = Box<dyn FnOnce() -> Box<dyn Any + Send> + Send>;

/// What the worker produced: a value, or the message of a caught panic.
pub(crate) enum TaskOutcome {
    Value(Box<dyn Any + Send>),
    Panicked(String),
}

struct TaskCore {
    func: Option<ErasedFn>,
    result: Option<TaskOutcome>,
}

/// Shared between the caller's [`Task`] handle and the pool queue.
///
/// `state` is atomic so `is_finished`/`is_running` never block; every
/// transition happens while `core` is locked, which is also the lock the
/// join condvar waits on.
pub(crate) struct TaskInner {
    state: AtomicU8,
    core: Mutex<TaskCore>,
    completed: Condvar,
}

impl TaskInner {
    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Pool-side transition to `Queued`, called under the pool lock.
    pub(crate) fn mark_queued(&self) -> Result<()> {
        let _core = self.core.lock();
        if self.state() != TaskState::Created {
            return Err(Error::invalid_argument("task was already pushed"));
        }
        self.set_state(TaskState::Queued);
        Ok(())
    }

    /// Worker-side start: take the closure, mark `Running` unless the
    /// caller detached while the task was queued.
    pub(crate) fn begin_run(&self) -> Option<ErasedFn> {
        let mut core = self.core.lock();
        if self.state() != TaskState::Detached {
            self.set_state(TaskState::Running);
        }
        core.func.take()
    }

    /// Worker-side completion. Detached tasks are finalized in place with
    /// no signal; everything else becomes `Finished` and wakes the joiner.
    pub(crate) fn complete(&self, outcome: TaskOutcome) {
        let mut core = self.core.lock();
        if self.state() == TaskState::Detached {
            self.set_state(TaskState::Joined);
            core.result = None;
            return;
        }
        core.result = Some(outcome);
        self.set_state(TaskState::Finished);
        drop(core);
        self.completed.notify_one();
    }
}

/// A unit of deferred work producing a `T`.
///
/// Create with [`Task::new`], hand to [`Pool::push`](crate::Pool::push),
/// then retrieve the result with [`join`](Task::join) or
/// [`timed_join`](Task::timed_join), or walk away with
/// [`detach`](Task::detach). Single-joiner contract: at most one thread
/// should join a given task.
pub struct Task<T> {
    inner: Arc<TaskInner>,
    _result: PhantomData<fn() -> T>,
}

impl<T> Task<T> {
    pub(crate) fn inner(&self) -> &Arc<TaskInner> {
        &self.inner
    }

    /// Current lifecycle state. Advisory: may be stale by the time the
    /// caller acts on it.
    pub fn state(&self) -> TaskState {
        self.inner.state()
    }

    /// Whether execution has completed and the result is waiting. Never
    /// blocks.
    pub fn is_finished(&self) -> bool {
        self.inner.state() == TaskState::Finished
    }

    /// Whether a worker is currently executing the task. Never blocks.
    pub fn is_running(&self) -> bool {
        self.inner.state() == TaskState::Running
    }
}

impl<T: Send + 'static> Task<T> {
    /// Create a task in the `Created` state. The closure captures its own
    /// argument; nothing runs until a pool worker picks the task up.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let func: ErasedFn = Box::new(move || Box::new(f()) as Box<dyn Any + Send>);
        Task {
            inner: Arc::new(TaskInner {
                state: AtomicU8::new(TaskState::Created as u8),
                core: Mutex::new(TaskCore {
                    func: Some(func),
                    result: None,
                }),
                completed: Condvar::new(),
            }),
            _result: PhantomData,
        }
    }

    /// Block until the task finishes and take its result.
    ///
    /// Fails with [`Error::TaskNotPushed`] if the task was never pushed,
    /// and with [`Error::TaskPanicked`] if the closure panicked. Timing
    /// out never happens here; see [`timed_join`](Task::timed_join).
    pub fn join(&self) -> Result<T> {
        match self.inner.state() {
            TaskState::Created => return Err(Error::TaskNotPushed),
            TaskState::Joined => {
                return Err(Error::invalid_argument("task was already joined"))
            }
            _ => {}
        }

        let mut core = self.inner.core.lock();
        while self.inner.state() != TaskState::Finished {
            if self.inner.state() == TaskState::Joined {
                return Err(Error::invalid_argument("task was already joined"));
            }
            self.inner.completed.wait(&mut core);
        }
        self.take_result(&mut core)
    }

    /// Like [`join`](Task::join), but gives up after `timeout`.
    ///
    /// A zero timeout polls once: [`Error::Timeout`] unless the task is
    /// already finished. Timing out does not cancel execution; the task
    /// keeps running and remains joinable afterwards.
    pub fn timed_join(&self, timeout: Duration) -> Result<T> {
        match self.inner.state() {
            TaskState::Created => return Err(Error::TaskNotPushed),
            TaskState::Joined => {
                return Err(Error::invalid_argument("task was already joined"))
            }
            _ => {}
        }

        let mut core = self.inner.core.lock();
        if timeout.is_zero() {
            if self.inner.state() != TaskState::Finished {
                return Err(Error::Timeout);
            }
            return self.take_result(&mut core);
        }

        let deadline = Instant::now() + timeout;
        while self.inner.state() != TaskState::Finished {
            if self.inner.state() == TaskState::Joined {
                return Err(Error::invalid_argument("task was already joined"));
            }
            let timed_out = self
                .inner
                .completed
                .wait_until(&mut core, deadline)
                .timed_out();
            if timed_out {
                if self.inner.state() == TaskState::Finished {
                    break;
                }
                return Err(Error::Timeout);
            }
        }
        self.take_result(&mut core)
    }

    /// Release the task from the join protocol and consume the handle.
    ///
    /// A finished task is finalized immediately, its result dropped. A
    /// queued or running task keeps executing; the worker disposes of it
    /// on completion. Fails with [`Error::TaskNotPushed`] if the task was
    /// never pushed.
    pub fn detach(self) -> Result<()> {
        let mut core = self.inner.core.lock();
        match self.inner.state() {
            TaskState::Created => Err(Error::TaskNotPushed),
            TaskState::Joined => Err(Error::invalid_argument("task was already joined")),
            TaskState::Finished => {
                core.result = None;
                self.inner.set_state(TaskState::Joined);
                Ok(())
            }
            _ => {
                self.inner.set_state(TaskState::Detached);
                Ok(())
            }
        }
    }

    /// Consume the handle and release the task's resources.
    ///
    /// Only `Created` and `Joined` tasks are deletable; anything still
    /// queued or running reports [`Error::TaskInPool`]. Memory itself is
    /// reference-counted, so a rejected delete leaves the task running to
    /// completion with its resources reclaimed once the pool is done with
    /// it.
    pub fn delete(self) -> Result<()> {
        let mut core = self.inner.core.lock();
        match self.inner.state() {
            TaskState::Created | TaskState::Joined => {
                core.func = None;
                core.result = None;
                Ok(())
            }
            _ => Err(Error::TaskInPool),
        }
    }

    fn take_result(&self, core: &mut MutexGuard<'_, TaskCore>) -> Result<T> {
        let outcome = core.result.take();
        self.inner.set_state(TaskState::Joined);
        match outcome {
            Some(TaskOutcome::Value(value)) => value
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| Error::invalid_argument("task result type mismatch")),
            Some(TaskOutcome::Panicked(msg)) => Err(Error::TaskPanicked(msg)),
            None => Err(Error::invalid_argument("task result was already taken")),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("state", &self.inner.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_created() {
        let task = Task::new(|| 42);
        assert_eq!(task.state(), TaskState::Created);
        assert!(!task.is_finished());
        assert!(!task.is_running());
    }

    #[test]
    fn test_join_before_push_fails() {
        let task = Task::new(|| 42);
        assert_eq!(task.join(), Err(Error::TaskNotPushed));
    }

    #[test]
    fn test_timed_join_before_push_fails() {
        let task = Task::new(|| 42);
        assert_eq!(
            task.timed_join(Duration::from_millis(10)),
            Err(Error::TaskNotPushed)
        );
    }

    #[test]
    fn test_detach_before_push_fails() {
        let task = Task::new(|| 42);
        assert_eq!(task.detach(), Err(Error::TaskNotPushed));
    }

    #[test]
    fn test_delete_created_task() {
        let task = Task::new(|| 42);
        assert!(task.delete().is_ok());
    }

    #[test]
    fn test_worker_protocol_on_inner() {
        let task = Task::new(|| 7usize);
        let inner = task.inner().clone();

        inner.mark_queued().unwrap();
        assert_eq!(task.state(), TaskState::Queued);
        assert!(inner.mark_queued().is_err());

        let func = inner.begin_run().unwrap();
        assert!(task.is_running());
        inner.complete(TaskOutcome::Value(func()));

        assert!(task.is_finished());
        assert_eq!(task.join().unwrap(), 7);
        assert_eq!(task.state(), TaskState::Joined);
    }

    #[test]
    fn test_detached_completion_drops_result() {
        let task = Task::new(|| "ignored".to_string());
        let inner = task.inner().clone();

        inner.mark_queued().unwrap();
        task.detach().unwrap();
        assert_eq!(inner.state(), TaskState::Detached);

        let func = inner.begin_run().unwrap();
        assert_eq!(inner.state(), TaskState::Detached);
        inner.complete(TaskOutcome::Value(func()));
        assert_eq!(inner.state(), TaskState::Joined);
    }
}
