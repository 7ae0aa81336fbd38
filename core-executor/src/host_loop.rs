//! Host Loop Adapter
//!
//! Binds the executor's drain step to the host's flight-loop callback, the
//! only point at which the host hands control back to plugin code on its
//! main thread. Each tick drains the job queue, then either stops the loop
//! (shutdown) or refreshes the aircraft state snapshot when due and asks for
//! the next tick shortly after.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::host::{FlightLoopHandler, FlightLoopTick, HostApi, NextCallback};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::trace;

use crate::executor::MainThreadExecutor;

/// Last captured aircraft state, readable from any thread.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    state: RwLock<Option<Value>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the cached state, if one has been captured.
    pub fn get(&self) -> Option<Value> {
        self.state.read().clone()
    }

    pub fn store(&self, state: Value) {
        *self.state.write() = Some(state);
    }

    pub fn clear(&self) {
        *self.state.write() = None;
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().is_some()
    }
}

pub struct HostLoop {
    executor: Arc<MainThreadExecutor>,
    host: Arc<dyn HostApi>,
    snapshot: Arc<SnapshotCache>,
    /// Sim seconds since the last snapshot refresh. Pump thread only.
    since_refresh: Mutex<f32>,
    pump_interval: f32,
    snapshot_interval: f32,
}

impl HostLoop {
    pub fn new(
        executor: Arc<MainThreadExecutor>,
        host: Arc<dyn HostApi>,
        snapshot: Arc<SnapshotCache>,
        pump_interval: Duration,
        snapshot_interval: Duration,
    ) -> Self {
        Self {
            executor,
            host,
            snapshot,
            since_refresh: Mutex::new(0.0),
            pump_interval: pump_interval.as_secs_f32(),
            snapshot_interval: snapshot_interval.as_secs_f32(),
        }
    }

    pub fn snapshot(&self) -> &Arc<SnapshotCache> {
        &self.snapshot
    }

    /// Handle one host callback.
    pub fn tick(&self, tick: FlightLoopTick) -> NextCallback {
        // Always flush, even when stopping, so no waiter is left blocked.
        self.executor.drain();

        if self.executor.is_shutting_down() {
            return NextCallback::Stop;
        }

        let mut since_refresh = self.since_refresh.lock();
        if tick.since_last_call > 0.0 {
            *since_refresh += tick.since_last_call;
        }

        if !self.snapshot.is_ready() || *since_refresh >= self.snapshot_interval {
            self.refresh();
            *since_refresh = 0.0;
        }

        NextCallback::Seconds(self.pump_interval)
    }

    /// Capture the snapshot immediately. Pump thread only.
    pub fn prime(&self) {
        self.refresh();
        *self.since_refresh.lock() = 0.0;
    }

    /// Forget the refresh accumulator.
    pub fn reset(&self) {
        *self.since_refresh.lock() = 0.0;
    }

    /// Callback suitable for [`HostApi::create_flight_loop`].
    pub fn handler(self: &Arc<Self>) -> FlightLoopHandler {
        let host_loop = Arc::clone(self);
        Arc::new(move |tick: FlightLoopTick| host_loop.tick(tick))
    }

    fn refresh(&self) {
        let state = self.host.capture_state();
        self.snapshot.store(state);
        trace!("Refreshed aircraft state snapshot");
    }
}
