//! Main-Thread Executor
//!
//! Marshals closures from request workers onto the single thread the host
//! allows to touch its state (the *pump thread*), and blocks the caller until
//! the closure has run there.
//!
//! ## Rules
//!
//! - A submit from the pump thread runs inline. Nested submits from inside a
//!   running job therefore never queue and never deadlock.
//! - A submit from any other thread is rejected once shutdown has begun,
//!   otherwise queued and waited on for at most the configured timeout.
//! - [`drain`](MainThreadExecutor::drain) swaps the whole queue out before
//!   running it: jobs queued during a drain land in the next one.
//! - A waiter that times out stops waiting, but its job still runs on a later
//!   drain and the result is dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use bridge_traits::host::HostApi;
use core_runtime::error::{ToolError, ToolResult};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::job::{self, Job, Task};

/// Asks the host to run the pump at its next opportunity.
pub trait PumpWaker: Send + Sync {
    /// Called from worker threads right after a job is queued.
    fn wake(&self);
}

/// [`PumpWaker`] backed by the host's cross-thread wake-up call.
pub struct HostWaker {
    host: Arc<dyn HostApi>,
}

impl HostWaker {
    /// `None` when the host cannot be woken from another thread.
    pub fn for_host(host: Arc<dyn HostApi>) -> Option<Self> {
        host.supports_cross_thread_wakeup()
            .then_some(Self { host })
    }
}

impl PumpWaker for HostWaker {
    fn wake(&self) {
        self.host.request_wakeup();
    }
}

pub struct MainThreadExecutor {
    queue: Mutex<VecDeque<Job>>,
    pump_thread: RwLock<Option<ThreadId>>,
    shutting_down: AtomicBool,
    timeout: Duration,
    waker: RwLock<Option<Arc<dyn PumpWaker>>>,
    next_job_id: AtomicU64,
}

impl MainThreadExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            pump_thread: RwLock::new(None),
            shutting_down: AtomicBool::new(false),
            timeout,
            waker: RwLock::new(None),
            next_job_id: AtomicU64::new(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record the calling thread as the pump thread.
    pub fn bind_current_thread(&self) {
        self.bind_pump_thread(thread::current().id());
    }

    pub fn bind_pump_thread(&self, thread: ThreadId) {
        *self.pump_thread.write() = Some(thread);
    }

    pub fn pump_thread(&self) -> Option<ThreadId> {
        *self.pump_thread.read()
    }

    pub fn is_pump_thread(&self) -> bool {
        self.pump_thread() == Some(thread::current().id())
    }

    pub fn set_waker(&self, waker: Option<Arc<dyn PumpWaker>>) {
        *self.waker.write() = waker;
    }

    /// Reject new cross-thread submissions from now on.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Accept cross-thread submissions again.
    pub fn resume(&self) {
        self.shutting_down.store(false, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Number of queued jobs.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run `f` on the pump thread and return its result.
    ///
    /// # Errors
    ///
    /// - the error `f` returned, kind and message intact
    /// - `internal_error` "Plugin is shutting down." if shutdown has begun
    ///   (cross-thread submits only)
    /// - `internal_error` "Timed out waiting for X-Plane main thread." when
    ///   no drain ran the job within the timeout
    pub fn submit<F>(&self, f: F) -> ToolResult<Value>
    where
        F: FnOnce() -> ToolResult<Value> + Send + 'static,
    {
        let id = self.next_id();

        if self.is_pump_thread() {
            trace!(job_id = id, "Running job inline on pump thread");
            return job::execute(id, Box::new(f));
        }

        let slot = {
            let mut queue = self.queue.lock();
            // Checked under the queue lock so a job cannot slip in after
            // stop's final fail_pending.
            if self.is_shutting_down() {
                return Err(ToolError::shutting_down());
            }
            let (job, slot) = Job::new(id, Box::new(f));
            queue.push_back(job);
            slot
        };

        self.wake();

        match slot.wait_for(self.timeout) {
            Some(result) => result,
            None => {
                warn!(
                    job_id = id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Timed out waiting for main thread"
                );
                Err(ToolError::main_thread_timeout())
            }
        }
    }

    /// Run `f` inline when called on the pump thread; otherwise queue it
    /// without waiting and return `None`.
    ///
    /// Unlike [`submit`](Self::submit) this ignores the shutdown flag. It
    /// exists for teardown work that must run after shutdown has begun.
    pub fn run_or_enqueue<F>(&self, f: F) -> Option<ToolResult<Value>>
    where
        F: FnOnce() -> ToolResult<Value> + Send + 'static,
    {
        let id = self.next_id();
        let task: Task = Box::new(f);

        if self.is_pump_thread() {
            return Some(job::execute(id, task));
        }

        let (job, _slot) = Job::new(id, task);
        self.queue.lock().push_back(job);
        self.wake();
        None
    }

    /// Run every job queued so far, in submission order.
    ///
    /// Must be called on the pump thread. Returns the number of jobs run.
    pub fn drain(&self) -> usize {
        let jobs = std::mem::take(&mut *self.queue.lock());
        let count = jobs.len();

        for job in jobs {
            job.run();
        }

        if count > 0 {
            trace!(count, "Drained main thread jobs");
        }
        count
    }

    /// Complete every queued job with `error` without running it.
    pub fn fail_pending(&self, error: ToolError) -> usize {
        let jobs = std::mem::take(&mut *self.queue.lock());
        let count = jobs.len();

        for job in jobs {
            job.fail(error.clone());
        }

        if count > 0 {
            debug!(count, reason = %error, "Failed pending main thread jobs");
        }
        count
    }

    fn next_id(&self) -> u64 {
        self.next_job_id.fetch_add(1, Ordering::Relaxed)
    }

    fn wake(&self) {
        if let Some(waker) = self.waker.read().as_ref() {
            waker.wake();
        }
    }
}

impl std::fmt::Debug for MainThreadExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainThreadExecutor")
            .field("pending", &self.pending())
            .field("pump_thread", &self.pump_thread())
            .field("shutting_down", &self.is_shutting_down())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::SimulatedHost;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn executor_on_this_thread() -> Arc<MainThreadExecutor> {
        let executor = Arc::new(MainThreadExecutor::new(Duration::from_secs(3)));
        executor.bind_current_thread();
        executor
    }

    /// Poll `drain` on the current thread until `done` holds.
    fn pump_until(executor: &MainThreadExecutor, done: impl Fn() -> bool) {
        for _ in 0..2_000 {
            executor.drain();
            if done() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("condition not reached while pumping");
    }

    #[test]
    fn test_submit_on_pump_thread_runs_inline() {
        let executor = executor_on_this_thread();
        let result = executor.submit(|| Ok(json!(42)));
        assert_eq!(result, Ok(json!(42)));
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn test_nested_submit_runs_inline() {
        let executor = executor_on_this_thread();
        let inner = Arc::clone(&executor);
        let result = executor.submit(move || {
            let nested = inner.submit(|| Ok(json!("inner")))?;
            Ok(json!({ "outer": nested }))
        });
        assert_eq!(result, Ok(json!({ "outer": "inner" })));
    }

    #[test]
    fn test_inline_submit_ignores_shutdown() {
        let executor = executor_on_this_thread();
        executor.begin_shutdown();
        assert_eq!(executor.submit(|| Ok(json!(1))), Ok(json!(1)));
    }

    #[test]
    fn test_cross_thread_submit_waits_for_drain() {
        let executor = executor_on_this_thread();
        let worker_executor = Arc::clone(&executor);
        let pump = thread::current().id();

        let worker = thread::spawn(move || {
            worker_executor.submit(move || {
                assert_eq!(thread::current().id(), pump);
                Ok(json!("done"))
            })
        });

        let finished = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&finished);
        let waiter = thread::spawn(move || {
            let result = worker.join().unwrap();
            done.store(true, Ordering::SeqCst);
            result
        });

        pump_until(&executor, || finished.load(Ordering::SeqCst));
        assert_eq!(waiter.join().unwrap(), Ok(json!("done")));
    }

    #[test]
    fn test_cross_thread_submit_rejected_after_shutdown() {
        let executor = executor_on_this_thread();
        executor.begin_shutdown();

        let worker_executor = Arc::clone(&executor);
        let result = thread::spawn(move || worker_executor.submit(|| Ok(Value::Null)))
            .join()
            .unwrap();

        assert_eq!(result, Err(ToolError::shutting_down()));
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn test_resume_after_shutdown() {
        let executor = executor_on_this_thread();
        executor.begin_shutdown();
        executor.resume();
        assert!(!executor.is_shutting_down());
    }

    #[test]
    fn test_fail_pending_unblocks_waiters() {
        let executor = executor_on_this_thread();
        let worker_executor = Arc::clone(&executor);
        let worker = thread::spawn(move || worker_executor.submit(|| Ok(json!("never"))));

        while executor.pending() == 0 {
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(executor.fail_pending(ToolError::shutting_down()), 1);
        assert_eq!(worker.join().unwrap(), Err(ToolError::shutting_down()));
    }

    #[test]
    fn test_run_or_enqueue_off_pump_thread_queues() {
        let executor = Arc::new(MainThreadExecutor::new(Duration::from_secs(3)));
        executor.begin_shutdown();

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let outcome = executor.run_or_enqueue(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });

        assert!(outcome.is_none());
        assert_eq!(executor.pending(), 1);

        executor.bind_current_thread();
        assert_eq!(executor.drain(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_or_enqueue_on_pump_thread_runs_inline() {
        let executor = executor_on_this_thread();
        let outcome = executor.run_or_enqueue(|| Ok(json!(5)));
        assert_eq!(outcome, Some(Ok(json!(5))));
    }

    #[test]
    fn test_waker_called_on_enqueue() {
        let host = Arc::new(SimulatedHost::new());
        let executor = Arc::new(MainThreadExecutor::new(Duration::from_secs(3)));
        let waker = HostWaker::for_host(host.clone()).expect("simulated host supports wakeup");
        executor.set_waker(Some(Arc::new(waker)));

        executor.run_or_enqueue(|| Ok(Value::Null));
        assert_eq!(host.wakeup_requests(), 1);
    }
}
