// worker thread loop
use super::Shared;
use crate::task::{TaskInner, TaskOutcome};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// execution counters shared by all workers of a pool
#[derive(Debug, Default)]
pub(crate) struct ExecStats {
    pub tasks_executed: AtomicU64,
    pub tasks_panicked: AtomicU64,
}

/// Main loop of one worker thread.
///
/// Waits on the pool condvar while the queue is empty, exits when the pool
/// is shutting down, and otherwise pops the oldest task (FIFO) and runs it
/// with no lock held.
pub(crate) fn run(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.state.lock();
            while state.queue.is_empty() && !state.shutting_down {
                shared.available.wait(&mut state);
            }
            if state.shutting_down {
                break;
            }
            let task = state.queue.pop_front();
            if task.is_some() {
                state.in_progress += 1;
            }
            task
        };

        if let Some(task) = task {
            execute(&shared, task);
        }
    }

    tracing::debug!(
        worker = std::thread::current().name().unwrap_or("unnamed"),
        "worker exiting"
    );
}

fn execute(shared: &Shared, task: Arc<TaskInner>) {
    let outcome = match task.begin_run() {
        Some(func) => match catch_unwind(AssertUnwindSafe(func)) {
            Ok(value) => TaskOutcome::Value(value),
            Err(payload) => {
                let msg = panic_message(payload);
                tracing::warn!(message = %msg, "task panicked");
                shared.stats.tasks_panicked.fetch_add(1, Ordering::Relaxed);
                TaskOutcome::Panicked(msg)
            }
        },
        // the closure was already consumed; nothing left to do
        None => {
            shared.state.lock().in_progress -= 1;
            return;
        }
    };

    // Decrement before signaling completion so a joiner that wakes up can
    // immediately shut the pool down without observing stale in-flight work.
    shared.state.lock().in_progress -= 1;
    shared.stats.tasks_executed.fetch_add(1, Ordering::Relaxed);

    task.complete(outcome);
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
