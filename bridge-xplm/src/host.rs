//! [`HostApi`] over the XPLM SDK.

use std::collections::HashMap;
use std::ffi::{c_char, c_float, c_int, c_void, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::handle::{FlightLoopId, InstanceRef, ObjectRef};
use bridge_traits::host::{
    DrawPosition, FlightLoopHandler, FlightLoopTick, HostApi, HostVersions, NextCallback,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::ffi;
use crate::state::{DataKind, StateField, AIRCRAFT_STATE};
use crate::strings::{from_buffer, from_ptr, instance_data_ptr, to_c_string, PATH_BUFFER_LEN};

/// Resolved snapshot dataref. Fields the running X-Plane lacks are skipped.
struct BoundField {
    field: StateField,
    dataref: usize,
}

/// The X-Plane plugin SDK.
///
/// Construct once per plugin load. All methods except
/// [`debug_string`](HostApi::debug_string) must run on the simulator thread.
pub struct XplmHost {
    /// Boxed handler per live flight loop, keyed by flight-loop address.
    /// Freed when the loop is destroyed.
    handlers: Mutex<HashMap<usize, usize>>,
    state_fields: Mutex<Option<Vec<BoundField>>>,
}

impl Default for XplmHost {
    fn default() -> Self {
        Self::new()
    }
}

impl XplmHost {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            state_fields: Mutex::new(None),
        }
    }

    fn bind_state_fields() -> Vec<BoundField> {
        AIRCRAFT_STATE
            .iter()
            .filter_map(|field| {
                let name = to_c_string(field.dataref)?;
                let dataref = unsafe { ffi::XPLMFindDataRef(name.as_ptr()) };
                if dataref.is_null() {
                    warn!(dataref = field.dataref, "Dataref not found; omitted from snapshot");
                    return None;
                }
                Some(BoundField {
                    field: *field,
                    dataref: dataref as usize,
                })
            })
            .collect()
    }
}

impl Drop for XplmHost {
    fn drop(&mut self) {
        for (_, handler) in self.handlers.lock().drain() {
            drop(unsafe { Box::from_raw(handler as *mut FlightLoopHandler) });
        }
    }
}

unsafe extern "C" fn flight_loop_trampoline(
    since_last_call: c_float,
    since_last_loop: c_float,
    counter: c_int,
    refcon: *mut c_void,
) -> c_float {
    if refcon.is_null() {
        return 0.0;
    }
    let handler = &*(refcon as *const FlightLoopHandler);
    let tick = FlightLoopTick {
        since_last_call,
        since_last_loop,
        counter,
    };

    // Unwinding into the simulator would take it down with us.
    match catch_unwind(AssertUnwindSafe(|| handler(tick))) {
        Ok(next) => next.as_interval(),
        Err(_) => NextCallback::Stop.as_interval(),
    }
}

impl HostApi for XplmHost {
    fn create_flight_loop(&self, handler: FlightLoopHandler) -> Result<FlightLoopId> {
        let refcon = Box::into_raw(Box::new(handler));
        let params = ffi::XPLMCreateFlightLoop_t {
            struct_size: std::mem::size_of::<ffi::XPLMCreateFlightLoop_t>() as c_int,
            phase: ffi::XPLM_FLIGHT_LOOP_PHASE_AFTER_FLIGHT_MODEL,
            callback_func: flight_loop_trampoline,
            refcon: refcon as *mut c_void,
        };

        let raw = unsafe { ffi::XPLMCreateFlightLoop(&params) };
        match FlightLoopId::from_raw(raw) {
            Some(id) => {
                self.handlers
                    .lock()
                    .insert(id.as_ptr() as usize, refcon as usize);
                Ok(id)
            }
            None => {
                drop(unsafe { Box::from_raw(refcon) });
                Err(BridgeError::OperationFailed(
                    "XPLMCreateFlightLoop returned null".to_string(),
                ))
            }
        }
    }

    fn schedule_flight_loop(&self, id: &FlightLoopId, next: NextCallback) {
        unsafe { ffi::XPLMScheduleFlightLoop(id.as_ptr(), next.as_interval(), 1) };
    }

    fn destroy_flight_loop(&self, id: FlightLoopId) {
        let address = id.as_ptr() as usize;
        unsafe { ffi::XPLMDestroyFlightLoop(id.into_raw()) };
        // The SDK will not call the trampoline again, so the handler can go.
        if let Some(handler) = self.handlers.lock().remove(&address) {
            drop(unsafe { Box::from_raw(handler as *mut FlightLoopHandler) });
        }
    }

    fn load_object(&self, path: &str) -> Option<ObjectRef> {
        let path = to_c_string(path)?;
        ObjectRef::from_raw(unsafe { ffi::XPLMLoadObject(path.as_ptr()) })
    }

    fn unload_object(&self, object: ObjectRef) {
        unsafe { ffi::XPLMUnloadObject(object.into_raw()) };
    }

    fn create_instance(&self, object: &ObjectRef, datarefs: &[String]) -> Option<InstanceRef> {
        let names: Vec<CString> = datarefs
            .iter()
            .map(|name| to_c_string(name))
            .collect::<Option<_>>()?;
        let mut pointers: Vec<*const c_char> = names.iter().map(|name| name.as_ptr()).collect();
        pointers.push(ptr::null());

        let raw = unsafe { ffi::XPLMCreateInstance(object.as_ptr(), pointers.as_ptr()) };
        InstanceRef::from_raw(raw)
    }

    fn destroy_instance(&self, instance: InstanceRef) {
        unsafe { ffi::XPLMDestroyInstance(instance.into_raw()) };
    }

    fn instance_set_position(&self, instance: &InstanceRef, position: &DrawPosition, data: &[f32]) {
        let placeholder = [0.0f32];
        let data_ptr = instance_data_ptr(data, &placeholder);

        if position.double_precision {
            let info = ffi::XPLMDrawInfoDouble_t {
                struct_size: std::mem::size_of::<ffi::XPLMDrawInfoDouble_t>() as c_int,
                x: position.x,
                y: position.y,
                z: position.z,
                pitch: position.pitch,
                heading: position.heading,
                roll: position.roll,
            };
            unsafe { ffi::XPLMInstanceSetPositionDouble(instance.as_ptr(), &info, data_ptr) };
        } else {
            let info = ffi::XPLMDrawInfo_t {
                struct_size: std::mem::size_of::<ffi::XPLMDrawInfo_t>() as c_int,
                x: position.x as f32,
                y: position.y as f32,
                z: position.z as f32,
                pitch: position.pitch as f32,
                heading: position.heading as f32,
                roll: position.roll as f32,
            };
            unsafe { ffi::XPLMInstanceSetPosition(instance.as_ptr(), &info, data_ptr) };
        }
    }

    fn instance_set_auto_shift(&self, instance: &InstanceRef) {
        unsafe { ffi::XPLMInstanceSetAutoShift(instance.as_ptr()) };
    }

    fn versions(&self) -> HostVersions {
        let mut xplane_version = 0;
        let mut xplm_version = 0;
        let mut host_id = 0;
        unsafe { ffi::XPLMGetVersions(&mut xplane_version, &mut xplm_version, &mut host_id) };
        HostVersions {
            xplane_version,
            xplm_version,
            host_id,
        }
    }

    fn language(&self) -> i32 {
        unsafe { ffi::XPLMGetLanguage() }
    }

    fn cycle_number(&self) -> i32 {
        unsafe { ffi::XPLMGetCycleNumber() }
    }

    fn elapsed_time(&self) -> f32 {
        unsafe { ffi::XPLMGetElapsedTime() }
    }

    fn system_path(&self) -> String {
        let mut buffer = [0u8; PATH_BUFFER_LEN];
        unsafe { ffi::XPLMGetSystemPath(buffer.as_mut_ptr() as *mut c_char) };
        from_buffer(&buffer)
    }

    fn prefs_path(&self) -> String {
        let mut buffer = [0u8; PATH_BUFFER_LEN];
        unsafe { ffi::XPLMGetPrefsPath(buffer.as_mut_ptr() as *mut c_char) };
        from_buffer(&buffer)
    }

    fn directory_separator(&self) -> String {
        unsafe { from_ptr(ffi::XPLMGetDirectorySeparator()) }
    }

    fn debug_string(&self, message: &str) {
        match to_c_string(message) {
            Some(message) => unsafe { ffi::XPLMDebugString(message.as_ptr()) },
            None => debug!("Dropped debug string containing NUL"),
        }
    }

    fn speak_string(&self, message: &str) {
        if let Some(message) = to_c_string(message) {
            unsafe { ffi::XPLMSpeakString(message.as_ptr()) };
        }
    }

    fn reload_scenery(&self) {
        unsafe { ffi::XPLMReloadScenery() };
    }

    fn capture_state(&self) -> Value {
        let mut fields = self.state_fields.lock();
        let bound = fields.get_or_insert_with(Self::bind_state_fields);

        let mut state = Map::new();
        for BoundField { field, dataref } in bound.iter() {
            let dataref = *dataref as ffi::XPLMDataRef;
            let value = match field.kind {
                DataKind::Flag => Value::Bool(unsafe { ffi::XPLMGetDatai(dataref) } != 0),
                DataKind::Float => Value::from(unsafe { ffi::XPLMGetDataf(dataref) } as f64),
                DataKind::Double => Value::from(unsafe { ffi::XPLMGetDatad(dataref) }),
            };
            state.insert(field.key.to_string(), value);
        }
        Value::Object(state)
    }
}
