//! In-Process Simulated Host
//!
//! A [`HostApi`] implementation that keeps all host state in memory. It backs
//! the test suites and the headless runner, where there is no simulator to
//! load the plugin.
//!
//! The simulated host is stricter than the real one about misuse: releasing
//! an unknown handle or calling a main-thread-only function from another
//! thread is recorded as a violation instead of crashing, so tests can assert
//! that the bridge never does either.

use std::collections::{BTreeMap, HashSet};
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{BridgeError, Result};
use crate::handle::{FlightLoopId, InstanceRef, ObjectRef};
use crate::host::{
    DrawPosition, FlightLoopHandler, FlightLoopTick, HostApi, HostVersions, NextCallback,
};

const HANDLE_BASE: usize = 0x1000;
const HANDLE_STRIDE: usize = 0x10;

/// Last position written to a simulated instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePlacement {
    pub position: DrawPosition,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone)]
struct SimInstance {
    object: usize,
    datarefs: Vec<String>,
    placement: Option<InstancePlacement>,
    auto_shift: bool,
}

struct SimFlightLoop {
    handler: FlightLoopHandler,
    next: Option<NextCallback>,
}

#[derive(Default)]
struct SimState {
    next_handle: usize,
    main_thread: Option<ThreadId>,
    fail_flight_loop: bool,
    missing_paths: HashSet<String>,
    flight_loops: BTreeMap<usize, SimFlightLoop>,
    objects: BTreeMap<usize, String>,
    instances: BTreeMap<usize, SimInstance>,
    debug_lines: Vec<String>,
    spoken: Vec<String>,
    scenery_reloads: usize,
    state: Option<Value>,
    elapsed: f32,
    cycle: i32,
    violations: Vec<String>,
}

impl SimState {
    fn allocate(&mut self) -> usize {
        let address = HANDLE_BASE + self.next_handle * HANDLE_STRIDE;
        self.next_handle += 1;
        address
    }
}

/// In-memory host used for tests and headless runs.
pub struct SimulatedHost {
    state: Mutex<SimState>,
    wakeups: AtomicUsize,
    captures: AtomicUsize,
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            wakeups: AtomicUsize::new(0),
            captures: AtomicUsize::new(0),
        }
    }

    /// Treat `thread` as the simulator main thread. Main-thread-only calls
    /// from any other thread are recorded as violations.
    pub fn bind_main_thread(&self, thread: ThreadId) {
        self.state.lock().main_thread = Some(thread);
    }

    /// Make the next `create_flight_loop` calls fail.
    pub fn fail_flight_loop_creation(&self, fail: bool) {
        self.state.lock().fail_flight_loop = fail;
    }

    /// Make `load_object` reject `path`.
    pub fn mark_missing(&self, path: impl Into<String>) {
        self.state.lock().missing_paths.insert(path.into());
    }

    /// Replace the state returned by `capture_state`.
    pub fn set_state(&self, state: Value) {
        self.state.lock().state = Some(state);
    }

    /// Run every armed flight loop once, as the host does each frame.
    ///
    /// Returns the schedule each callback asked for, keyed by registration.
    /// Callbacks that returned [`NextCallback::Stop`] stay registered but are
    /// skipped until re-armed.
    pub fn run_flight_loops(&self, since_last_call: f32) -> Vec<NextCallback> {
        let (armed, tick) = {
            let mut state = self.state.lock();
            state.elapsed += since_last_call.max(0.0);
            state.cycle += 1;
            let tick = FlightLoopTick {
                since_last_call,
                since_last_loop: state.elapsed,
                counter: state.cycle,
            };
            let armed: Vec<(usize, FlightLoopHandler)> = state
                .flight_loops
                .iter()
                .filter(|(_, flight_loop)| {
                    !matches!(flight_loop.next, None | Some(NextCallback::Stop))
                })
                .map(|(id, flight_loop)| (*id, flight_loop.handler.clone()))
                .collect();
            (armed, tick)
        };

        // Handlers call back into the host, so the lock must not be held here.
        let mut results = Vec::with_capacity(armed.len());
        for (id, handler) in armed {
            let next = handler(tick);
            if let Some(flight_loop) = self.state.lock().flight_loops.get_mut(&id) {
                flight_loop.next = Some(next);
            }
            results.push(next);
        }
        results
    }

    pub fn flight_loop_count(&self) -> usize {
        self.state.lock().flight_loops.len()
    }

    /// Schedule of the first registered flight loop, if any.
    pub fn flight_loop_schedule(&self) -> Option<NextCallback> {
        self.state
            .lock()
            .flight_loops
            .values()
            .next()
            .and_then(|flight_loop| flight_loop.next)
    }

    pub fn loaded_objects(&self) -> Vec<String> {
        self.state.lock().objects.values().cloned().collect()
    }

    pub fn live_instance_count(&self) -> usize {
        self.state.lock().instances.len()
    }

    /// Datarefs bound to the live instance with display value `handle`.
    pub fn instance_datarefs(&self, handle: &str) -> Option<Vec<String>> {
        let state = self.state.lock();
        state
            .instances
            .iter()
            .find(|(address, _)| format!("0x{:X}", address) == handle)
            .map(|(_, instance)| instance.datarefs.clone())
    }

    /// Last placement written to the live instance with display value `handle`.
    pub fn instance_placement(&self, handle: &str) -> Option<InstancePlacement> {
        let state = self.state.lock();
        state
            .instances
            .iter()
            .find(|(address, _)| format!("0x{:X}", address) == handle)
            .and_then(|(_, instance)| instance.placement.clone())
    }

    pub fn auto_shifted_instances(&self) -> usize {
        self.state
            .lock()
            .instances
            .values()
            .filter(|instance| instance.auto_shift)
            .count()
    }

    pub fn debug_lines(&self) -> Vec<String> {
        self.state.lock().debug_lines.clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.state.lock().spoken.clone()
    }

    pub fn scenery_reloads(&self) -> usize {
        self.state.lock().scenery_reloads
    }

    pub fn wakeup_requests(&self) -> usize {
        self.wakeups.load(Ordering::SeqCst)
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    /// Misuse recorded so far: off-thread calls and invalid releases.
    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    fn check_thread(state: &mut SimState, call: &str) {
        if let Some(main) = state.main_thread {
            let current = thread::current().id();
            if current != main {
                state
                    .violations
                    .push(format!("{call} called off the main thread ({current:?})"));
            }
        }
    }

    fn handle_from(address: usize) -> *mut c_void {
        address as *mut c_void
    }
}

impl HostApi for SimulatedHost {
    fn create_flight_loop(&self, handler: FlightLoopHandler) -> Result<FlightLoopId> {
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "create_flight_loop");
        if state.fail_flight_loop {
            return Err(BridgeError::OperationFailed(
                "flight loop registration rejected".to_string(),
            ));
        }
        let address = state.allocate();
        state
            .flight_loops
            .insert(address, SimFlightLoop { handler, next: None });
        FlightLoopId::from_raw(Self::handle_from(address)).ok_or_else(|| {
            BridgeError::OperationFailed("null flight loop handle".to_string())
        })
    }

    fn schedule_flight_loop(&self, id: &FlightLoopId, next: NextCallback) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        Self::check_thread(state, "schedule_flight_loop");
        let address = id.as_ptr() as usize;
        match state.flight_loops.get_mut(&address) {
            Some(flight_loop) => flight_loop.next = Some(next),
            None => state
                .violations
                .push(format!("schedule of unknown flight loop {}", id.display())),
        }
    }

    fn destroy_flight_loop(&self, id: FlightLoopId) {
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "destroy_flight_loop");
        let address = id.into_raw() as usize;
        if state.flight_loops.remove(&address).is_none() {
            state
                .violations
                .push(format!("destroy of unknown flight loop 0x{address:X}"));
        }
    }

    fn supports_cross_thread_wakeup(&self) -> bool {
        true
    }

    fn request_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::SeqCst);
    }

    fn load_object(&self, path: &str) -> Option<ObjectRef> {
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "load_object");
        if path.is_empty() || state.missing_paths.contains(path) {
            return None;
        }
        let address = state.allocate();
        state.objects.insert(address, path.to_string());
        ObjectRef::from_raw(Self::handle_from(address))
    }

    fn unload_object(&self, object: ObjectRef) {
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "unload_object");
        let address = object.into_raw() as usize;
        if state.instances.values().any(|instance| instance.object == address) {
            state
                .violations
                .push(format!("unload of object 0x{address:X} with live instances"));
        }
        if state.objects.remove(&address).is_none() {
            state
                .violations
                .push(format!("unload of unknown object 0x{address:X}"));
        }
    }

    fn create_instance(&self, object: &ObjectRef, datarefs: &[String]) -> Option<InstanceRef> {
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "create_instance");
        let object_address = object.as_ptr() as usize;
        if !state.objects.contains_key(&object_address) {
            return None;
        }
        let address = state.allocate();
        state.instances.insert(
            address,
            SimInstance {
                object: object_address,
                datarefs: datarefs.to_vec(),
                placement: None,
                auto_shift: false,
            },
        );
        InstanceRef::from_raw(Self::handle_from(address))
    }

    fn destroy_instance(&self, instance: InstanceRef) {
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "destroy_instance");
        let address = instance.into_raw() as usize;
        if state.instances.remove(&address).is_none() {
            state
                .violations
                .push(format!("destroy of unknown instance 0x{address:X}"));
        }
    }

    fn instance_set_position(&self, instance: &InstanceRef, position: &DrawPosition, data: &[f32]) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        Self::check_thread(state, "instance_set_position");
        let address = instance.as_ptr() as usize;
        match state.instances.get_mut(&address) {
            Some(live) => {
                if live.datarefs.len() != data.len() {
                    let message = format!(
                        "instance 0x{address:X} got {} values for {} datarefs",
                        data.len(),
                        live.datarefs.len()
                    );
                    state.violations.push(message);
                    return;
                }
                live.placement = Some(InstancePlacement {
                    position: *position,
                    data: data.to_vec(),
                });
            }
            None => state
                .violations
                .push(format!("position of unknown instance 0x{address:X}")),
        }
    }

    fn instance_set_auto_shift(&self, instance: &InstanceRef) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        Self::check_thread(state, "instance_set_auto_shift");
        let address = instance.as_ptr() as usize;
        match state.instances.get_mut(&address) {
            Some(live) => live.auto_shift = true,
            None => state
                .violations
                .push(format!("auto-shift of unknown instance 0x{address:X}")),
        }
    }

    fn versions(&self) -> HostVersions {
        HostVersions {
            xplane_version: 12100,
            xplm_version: 411,
            host_id: 1,
        }
    }

    fn language(&self) -> i32 {
        1
    }

    fn cycle_number(&self) -> i32 {
        self.state.lock().cycle
    }

    fn elapsed_time(&self) -> f32 {
        self.state.lock().elapsed
    }

    fn system_path(&self) -> String {
        "/sim/X-Plane 12/".to_string()
    }

    fn prefs_path(&self) -> String {
        "/sim/X-Plane 12/Output/preferences/Set X-Plane.prf".to_string()
    }

    fn directory_separator(&self) -> String {
        "/".to_string()
    }

    fn debug_string(&self, message: &str) {
        self.state.lock().debug_lines.push(message.to_string());
    }

    fn speak_string(&self, message: &str) {
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "speak_string");
        state.spoken.push(message.to_string());
    }

    fn reload_scenery(&self) {
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "reload_scenery");
        state.scenery_reloads += 1;
    }

    fn capture_state(&self) -> Value {
        let capture = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock();
        Self::check_thread(&mut state, "capture_state");
        match &state.state {
            Some(value) => value.clone(),
            None => json!({
                "latitude": 47.4502,
                "longitude": -122.3088,
                "elevation_m": 132.0,
                "heading_deg": 180.0,
                "groundspeed_mps": 0.0,
                "on_ground": true,
                "sim_elapsed_sec": state.elapsed,
                "capture": capture,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_object_and_instance_lifecycle() {
        let host = SimulatedHost::new();
        let object = host.load_object("lib/cone.obj").unwrap();
        let instance = host
            .create_instance(&object, &["sim/test/a".to_string()])
            .unwrap();

        assert_eq!(host.loaded_objects(), vec!["lib/cone.obj".to_string()]);
        assert_eq!(host.live_instance_count(), 1);

        host.destroy_instance(instance);
        host.unload_object(object);

        assert!(host.loaded_objects().is_empty());
        assert_eq!(host.live_instance_count(), 0);
        assert!(host.violations().is_empty());
    }

    #[test]
    fn test_missing_path_fails_to_load() {
        let host = SimulatedHost::new();
        host.mark_missing("nope.obj");
        assert!(host.load_object("nope.obj").is_none());
        assert!(host.load_object("").is_none());
    }

    #[test]
    fn test_unload_with_live_instance_is_a_violation() {
        let host = SimulatedHost::new();
        let object = host.load_object("a.obj").unwrap();
        let _instance = host.create_instance(&object, &[]).unwrap();
        host.unload_object(object);
        assert_eq!(host.violations().len(), 1);
    }

    #[test]
    fn test_flight_loop_runs_only_when_armed() {
        let host = SimulatedHost::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: FlightLoopHandler = Arc::new(move |_tick| {
            counter.fetch_add(1, Ordering::SeqCst);
            NextCallback::Stop
        });

        let id = host.create_flight_loop(handler).unwrap();
        assert!(host.run_flight_loops(0.1).is_empty());

        host.schedule_flight_loop(&id, NextCallback::Cycles(1));
        assert_eq!(host.run_flight_loops(0.1), vec![NextCallback::Stop]);
        assert!(host.run_flight_loops(0.1).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        host.destroy_flight_loop(id);
        assert_eq!(host.flight_loop_count(), 0);
    }

    #[test]
    fn test_off_thread_calls_are_recorded() {
        let host = Arc::new(SimulatedHost::new());
        host.bind_main_thread(thread::current().id());

        let remote = Arc::clone(&host);
        thread::spawn(move || {
            remote.reload_scenery();
        })
        .join()
        .unwrap();

        let violations = host.violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].starts_with("reload_scenery called off the main thread"));
    }

    #[test]
    fn test_position_data_length_is_checked() {
        let host = SimulatedHost::new();
        let object = host.load_object("a.obj").unwrap();
        let instance = host
            .create_instance(&object, &["sim/a".to_string(), "sim/b".to_string()])
            .unwrap();
        let display = instance.display();

        host.instance_set_position(&instance, &DrawPosition::default(), &[1.0, 2.0]);
        let placement = host.instance_placement(&display).unwrap();
        assert_eq!(placement.data, vec![1.0, 2.0]);

        host.instance_set_position(&instance, &DrawPosition::default(), &[1.0]);
        assert_eq!(host.violations().len(), 1);
    }
}
