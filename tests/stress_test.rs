//! Stress tests for the corral pool. Run with `--ignored`.

use corral::{Config, Error, Pool, Task};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
#[ignore] // Run with --ignored flag
fn stress_many_small_tasks() {
    let mut pool = Pool::new(8).unwrap();

    let tasks: Vec<_> = (0..10_000u64).map(|i| Task::new(move || i * 2)).collect();
    for task in &tasks {
        pool.push(task).unwrap();
    }

    let sum: u64 = tasks.iter().map(|t| t.join().unwrap()).sum();
    assert_eq!(sum, (0..10_000u64).map(|i| i * 2).sum::<u64>());

    assert!(pool.thread_count() <= 8);
    pool.shutdown().unwrap();
}

#[test]
#[ignore]
fn stress_detach_storm() {
    let mut pool = Pool::new(4).unwrap();
    let executed = Arc::new(AtomicUsize::new(0));

    for _ in 0..10_000 {
        let executed = executed.clone();
        let task = Task::new(move || {
            executed.fetch_add(1, Ordering::Relaxed);
        });
        match pool.push(&task) {
            Ok(()) => task.detach().unwrap(),
            // backlog outran the workers; drop the task and move on
            Err(Error::TooManyTasks) => {
                task.delete().unwrap();
            }
            Err(other) => panic!("unexpected push failure: {other}"),
        }
    }

    while pool.queued_tasks() > 0 || pool.in_flight() > 0 {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    assert!(executed.load(Ordering::Relaxed) > 0);
    pool.shutdown().unwrap();
}

#[test]
#[ignore]
fn stress_pool_churn() {
    for _ in 0..100 {
        let config = Config::builder()
            .max_threads(2)
            .max_queued(64)
            .build()
            .unwrap();
        let mut pool = Pool::with_config(config).unwrap();

        let tasks: Vec<_> = (0..32usize).map(|i| Task::new(move || i)).collect();
        for task in &tasks {
            pool.push(task).unwrap();
        }
        for (i, task) in tasks.iter().enumerate() {
            assert_eq!(task.join().unwrap(), i);
        }

        pool.shutdown().unwrap();
    }
}

#[test]
#[ignore]
fn stress_concurrent_pushers() {
    let pool = Arc::new(Pool::new(4).unwrap());
    let executed = Arc::new(AtomicUsize::new(0));

    let mut pushers = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let executed = executed.clone();
        pushers.push(std::thread::spawn(move || {
            for _ in 0..500 {
                let executed = executed.clone();
                let task = Task::new(move || {
                    executed.fetch_add(1, Ordering::Relaxed);
                });
                if pool.push(&task).is_ok() {
                    task.join().unwrap();
                } else {
                    task.delete().unwrap();
                }
            }
        }));
    }
    for pusher in pushers {
        pusher.join().unwrap();
    }

    assert!(pool.thread_count() <= 4);
    assert!(executed.load(Ordering::Relaxed) > 0);
}
