//! Cross-thread behavior of the executor, driven from a test-owned pump thread.

use core_executor::MainThreadExecutor;
use core_runtime::error::ToolError;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn pump_executor(timeout: Duration) -> Arc<MainThreadExecutor> {
    let executor = Arc::new(MainThreadExecutor::new(timeout));
    executor.bind_current_thread();
    executor
}

#[test]
fn every_job_runs_exactly_once_on_the_pump_thread() {
    const WORKERS: usize = 8;
    const JOBS_PER_WORKER: usize = 25;

    let executor = pump_executor(Duration::from_secs(5));
    let pump = thread::current().id();
    let runs: Arc<Mutex<HashMap<(usize, usize), usize>>> = Arc::new(Mutex::new(HashMap::new()));
    let finished = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let executor = Arc::clone(&executor);
            let runs = Arc::clone(&runs);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                for job in 0..JOBS_PER_WORKER {
                    let runs = Arc::clone(&runs);
                    let result = executor.submit(move || {
                        if thread::current().id() != pump {
                            return Err(ToolError::internal("ran off the pump thread"));
                        }
                        *runs.lock().entry((worker, job)).or_insert(0) += 1;
                        Ok(json!(job))
                    });
                    assert_eq!(result, Ok(json!(job)));
                }
                finished.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    while finished.load(Ordering::SeqCst) < WORKERS {
        executor.drain();
        thread::sleep(Duration::from_millis(1));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    let runs = runs.lock();
    assert_eq!(runs.len(), WORKERS * JOBS_PER_WORKER);
    assert!(runs.values().all(|count| *count == 1));
}

#[test]
fn jobs_queued_during_a_drain_run_in_the_next_drain() {
    let executor = pump_executor(Duration::from_secs(5));
    let order = Arc::new(Mutex::new(Vec::new()));

    // Queue three jobs from a foreign thread without waiting on them.
    thread::scope(|scope| {
        scope.spawn(|| {
            for label in ["a1", "a2", "a3"] {
                let order = Arc::clone(&order);
                let executor_for_job = Arc::clone(&executor);
                executor.run_or_enqueue(move || {
                    order.lock().push(label);
                    if label == "a1" {
                        // Enqueue from another thread while the drain is running.
                        let order = Arc::clone(&order);
                        thread::spawn(move || {
                            executor_for_job.run_or_enqueue(move || {
                                order.lock().push("b1");
                                Ok(Value::Null)
                            });
                        })
                        .join()
                        .unwrap();
                    }
                    Ok(Value::Null)
                });
            }
        });
    });

    assert_eq!(executor.drain(), 3);
    assert_eq!(*order.lock(), vec!["a1", "a2", "a3"]);
    assert_eq!(executor.pending(), 1);

    assert_eq!(executor.drain(), 1);
    assert_eq!(*order.lock(), vec!["a1", "a2", "a3", "b1"]);
}

#[test]
fn nested_submits_from_a_queued_job_do_not_deadlock() {
    let executor = pump_executor(Duration::from_secs(5));
    let worker_executor = Arc::clone(&executor);

    let worker = thread::spawn(move || {
        let level1 = Arc::clone(&worker_executor);
        worker_executor.submit(move || {
            let level2 = Arc::clone(&level1);
            let inner = level1.submit(move || level2.submit(|| Ok(json!(3))))?;
            Ok(json!({ "depth": inner }))
        })
    });

    while !worker.is_finished() {
        executor.drain();
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(worker.join().unwrap(), Ok(json!({ "depth": 3 })));
    assert_eq!(executor.pending(), 0);
}

#[test]
fn submits_after_shutdown_fail_without_queueing() {
    let executor = pump_executor(Duration::from_secs(5));
    executor.begin_shutdown();

    let results: Vec<_> = (0..4)
        .map(|_| {
            let executor = Arc::clone(&executor);
            thread::spawn(move || executor.submit(|| Ok(Value::Null)))
        })
        .map(|handle| handle.join().unwrap())
        .collect();

    for result in results {
        let err = result.unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.message, "Plugin is shutting down.");
    }
    assert_eq!(executor.pending(), 0);
}

#[test]
fn timed_out_job_still_runs_on_the_next_drain() {
    let executor = pump_executor(Duration::from_millis(50));
    let ran = Arc::new(AtomicBool::new(false));

    let worker = {
        let executor = Arc::clone(&executor);
        let ran = Arc::clone(&ran);
        thread::spawn(move || {
            executor.submit(move || {
                ran.store(true, Ordering::SeqCst);
                Ok(json!("late"))
            })
        })
    };

    let err = worker.join().unwrap().unwrap_err();
    assert!(err.is_internal());
    assert_eq!(err.message, "Timed out waiting for X-Plane main thread.");
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(executor.pending(), 1);

    assert_eq!(executor.drain(), 1);
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn job_errors_reach_the_waiter_unchanged() {
    let executor = pump_executor(Duration::from_secs(5));
    let worker = {
        let executor = Arc::clone(&executor);
        thread::spawn(move || {
            executor.submit(|| Err(ToolError::invalid_params("Object is in use by instance_id=1")))
        })
    };

    while !worker.is_finished() {
        executor.drain();
        thread::sleep(Duration::from_millis(1));
    }

    let err = worker.join().unwrap().unwrap_err();
    assert!(err.is_invalid_params());
    assert_eq!(err.message, "Object is in use by instance_id=1");
}
