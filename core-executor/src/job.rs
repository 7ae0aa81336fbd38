//! Jobs and their result slots.
//!
//! A [`Job`] pairs a closure with a [`JobSlot`] the submitting thread waits
//! on. The slot is single-assignment: whichever of "ran", "failed at
//! shutdown" happens first wins, and later assignments are ignored.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_runtime::error::{ToolError, ToolResult};
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use tracing::{debug, error};

/// Work marshaled to the pump thread.
pub type Task = Box<dyn FnOnce() -> ToolResult<Value> + Send + 'static>;

/// Single-assignment result slot shared by a job and its waiter.
#[derive(Default)]
pub struct JobSlot {
    result: Mutex<Option<ToolResult<Value>>>,
    ready: Condvar,
    filled: AtomicBool,
    abandoned: AtomicBool,
}

impl JobSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `result` unless the slot already holds one.
    ///
    /// Returns `false` when the slot was already set.
    pub fn set(&self, result: ToolResult<Value>) -> bool {
        let mut guard = self.result.lock();
        if self.filled.swap(true, Ordering::SeqCst) {
            return false;
        }
        *guard = Some(result);
        self.ready.notify_all();
        true
    }

    pub fn is_set(&self) -> bool {
        self.filled.load(Ordering::SeqCst)
    }

    /// Block until the slot is set or `timeout` elapses.
    ///
    /// On timeout the slot is marked abandoned and `None` is returned; a
    /// result stored afterwards is dropped by the pump thread.
    pub fn wait_for(&self, timeout: Duration) -> Option<ToolResult<Value>> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.result.lock();
        while guard.is_none() {
            if self.ready.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }

        match guard.take() {
            Some(result) => Some(result),
            None => {
                self.abandoned.store(true, Ordering::SeqCst);
                None
            }
        }
    }

    /// Whether the waiter gave up before a result arrived.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }
}

/// A queued unit of work.
pub struct Job {
    id: u64,
    task: Task,
    slot: Arc<JobSlot>,
}

impl Job {
    pub fn new(id: u64, task: Task) -> (Self, Arc<JobSlot>) {
        let slot = Arc::new(JobSlot::new());
        let job = Self {
            id,
            task,
            slot: Arc::clone(&slot),
        };
        (job, slot)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Run the task on the current thread and publish its result.
    pub fn run(self) {
        let result = execute(self.id, self.task);
        if self.slot.is_abandoned() {
            debug!(job_id = self.id, "Discarding result of timed-out job");
        }
        self.slot.set(result);
    }

    /// Complete the job with `error` without running it.
    pub fn fail(self, error: ToolError) {
        self.slot.set(Err(error));
    }
}

/// Run `task`, converting a panic into an internal error so it never
/// unwinds into the host.
pub fn execute(job_id: u64, task: Task) -> ToolResult<Value> {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(job_id, panic = %detail, "Job panicked on the main thread");
            Err(ToolError::internal("Internal error while running on X-Plane main thread."))
        }
    }
}
