//! Host SDK Contract
//!
//! The simulator exposes a fixed, non-reentrant C API. Almost every call is
//! only legal on the simulator's main thread (the *pump thread*), and the only
//! way back into plugin code on that thread is a periodic flight-loop
//! callback. [`HostApi`] captures the subset of that API the bridge uses.
//!
//! # Threading
//!
//! Unless a method says otherwise it must be called on the pump thread. The
//! trait is `Send + Sync` only so that it can be shared with closures that are
//! *marshaled* to the pump thread; calling it directly from a worker thread
//! is a contract violation the implementation is not required to detect.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::handle::{FlightLoopId, InstanceRef, ObjectRef};

/// Arguments the host passes on every flight-loop callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightLoopTick {
    /// Seconds since this callback last ran.
    pub since_last_call: f32,
    /// Seconds since the host's flight loop started (sim elapsed time).
    pub since_last_loop: f32,
    /// Host cycle counter.
    pub counter: i32,
}

/// What the callback asks the host to do next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextCallback {
    /// Do not call again until re-armed.
    Stop,
    /// Call again after this many host cycles.
    Cycles(u32),
    /// Call again after this many seconds.
    Seconds(f32),
}

impl NextCallback {
    /// Encode as the host's interval convention: `0` stops, a negative value
    /// counts host cycles, a positive value is a delay in seconds.
    pub fn as_interval(self) -> f32 {
        match self {
            NextCallback::Stop => 0.0,
            NextCallback::Cycles(cycles) => -(cycles.max(1) as f32),
            NextCallback::Seconds(seconds) if seconds > 0.0 => seconds,
            // A non-positive delay would read as "stop" or "cycles".
            NextCallback::Seconds(_) => -1.0,
        }
    }

    /// Decode the host's interval convention.
    pub fn from_interval(interval: f32) -> Self {
        if interval == 0.0 {
            NextCallback::Stop
        } else if interval < 0.0 {
            NextCallback::Cycles((-interval).round().max(1.0) as u32)
        } else {
            NextCallback::Seconds(interval)
        }
    }
}

/// Callback bound to a flight-loop registration.
pub type FlightLoopHandler = Arc<dyn Fn(FlightLoopTick) -> NextCallback + Send + Sync>;

/// Position and orientation for an instance, in local OpenGL coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: f64,
    pub heading: f64,
    pub roll: f64,
    /// Use the double-precision positioning call.
    pub double_precision: bool,
}

/// Version triple reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostVersions {
    pub xplane_version: i32,
    pub xplm_version: i32,
    pub host_id: i32,
}

/// The host application's plugin SDK.
pub trait HostApi: Send + Sync {
    // ------------------------------------------------------------------
    // Flight loop
    // ------------------------------------------------------------------

    /// Register a periodic callback. The registration starts unscheduled.
    fn create_flight_loop(&self, handler: FlightLoopHandler) -> Result<FlightLoopId>;

    /// Arm (or re-arm) a registered callback. Pump thread only.
    fn schedule_flight_loop(&self, id: &FlightLoopId, next: NextCallback);

    /// Unregister a callback, releasing the registration.
    fn destroy_flight_loop(&self, id: FlightLoopId);

    /// Whether [`request_wakeup`](Self::request_wakeup) may be called from
    /// a thread other than the pump thread.
    fn supports_cross_thread_wakeup(&self) -> bool {
        false
    }

    /// Ask the host to run the flight loop at its next opportunity. Safe from
    /// any thread when [`supports_cross_thread_wakeup`](Self::supports_cross_thread_wakeup)
    /// returns `true`; otherwise a no-op.
    fn request_wakeup(&self) {}

    // ------------------------------------------------------------------
    // Objects and instances
    // ------------------------------------------------------------------

    /// Load an object file. `None` when the host rejects the path.
    fn load_object(&self, path: &str) -> Option<ObjectRef>;

    /// Release a loaded object.
    fn unload_object(&self, object: ObjectRef);

    /// Instantiate an object with an ordered list of per-instance datarefs.
    fn create_instance(&self, object: &ObjectRef, datarefs: &[String]) -> Option<InstanceRef>;

    /// Release an instance.
    fn destroy_instance(&self, instance: InstanceRef);

    /// Move an instance and write one value per bound dataref.
    fn instance_set_position(&self, instance: &InstanceRef, position: &DrawPosition, data: &[f32]);

    /// Let the host shift the instance along with the local coordinate origin.
    fn instance_set_auto_shift(&self, instance: &InstanceRef);

    // ------------------------------------------------------------------
    // Runtime
    // ------------------------------------------------------------------

    fn versions(&self) -> HostVersions;

    fn language(&self) -> i32;

    fn cycle_number(&self) -> i32;

    fn elapsed_time(&self) -> f32;

    fn system_path(&self) -> String;

    fn prefs_path(&self) -> String;

    fn directory_separator(&self) -> String;

    /// Append a line to the host log. Safe from any thread.
    fn debug_string(&self, message: &str);

    fn speak_string(&self, message: &str);

    fn reload_scenery(&self);

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Read the fast-changing aircraft state that worker threads poll
    /// through the snapshot cache.
    fn capture_state(&self) -> Value;
}
