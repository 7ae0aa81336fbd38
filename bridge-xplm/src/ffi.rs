//! Extern declarations for the XPLM functions the bridge calls.
//!
//! Grouped by SDK header. Every function here is main-thread only except
//! `XPLMDebugString`.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_double, c_float, c_int, c_void};

pub type XPLMFlightLoopID = *mut c_void;
pub type XPLMObjectRef = *mut c_void;
pub type XPLMInstanceRef = *mut c_void;
pub type XPLMDataRef = *mut c_void;

pub type XPLMFlightLoopFn = unsafe extern "C" fn(
    elapsed_since_last_call: c_float,
    elapsed_since_last_loop: c_float,
    counter: c_int,
    refcon: *mut c_void,
) -> c_float;

pub const XPLM_FLIGHT_LOOP_PHASE_AFTER_FLIGHT_MODEL: c_int = 1;

#[repr(C)]
pub struct XPLMCreateFlightLoop_t {
    pub struct_size: c_int,
    pub phase: c_int,
    pub callback_func: XPLMFlightLoopFn,
    pub refcon: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct XPLMDrawInfo_t {
    pub struct_size: c_int,
    pub x: c_float,
    pub y: c_float,
    pub z: c_float,
    pub pitch: c_float,
    pub heading: c_float,
    pub roll: c_float,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct XPLMDrawInfoDouble_t {
    pub struct_size: c_int,
    pub x: c_double,
    pub y: c_double,
    pub z: c_double,
    pub pitch: c_double,
    pub heading: c_double,
    pub roll: c_double,
}

extern "C" {
    // XPLMProcessing
    pub fn XPLMCreateFlightLoop(params: *const XPLMCreateFlightLoop_t) -> XPLMFlightLoopID;
    pub fn XPLMScheduleFlightLoop(id: XPLMFlightLoopID, interval: c_float, relative_to_now: c_int);
    pub fn XPLMDestroyFlightLoop(id: XPLMFlightLoopID);
    pub fn XPLMGetElapsedTime() -> c_float;
    pub fn XPLMGetCycleNumber() -> c_int;

    // XPLMScenery
    pub fn XPLMLoadObject(path: *const c_char) -> XPLMObjectRef;
    pub fn XPLMUnloadObject(object: XPLMObjectRef);

    // XPLMInstance
    pub fn XPLMCreateInstance(
        object: XPLMObjectRef,
        datarefs: *const *const c_char,
    ) -> XPLMInstanceRef;
    pub fn XPLMDestroyInstance(instance: XPLMInstanceRef);
    pub fn XPLMInstanceSetPosition(
        instance: XPLMInstanceRef,
        position: *const XPLMDrawInfo_t,
        data: *const c_float,
    );
    pub fn XPLMInstanceSetPositionDouble(
        instance: XPLMInstanceRef,
        position: *const XPLMDrawInfoDouble_t,
        data: *const c_float,
    );
    pub fn XPLMInstanceSetAutoShift(instance: XPLMInstanceRef);

    // XPLMUtilities
    pub fn XPLMGetVersions(xplane: *mut c_int, xplm: *mut c_int, host_id: *mut c_int);
    pub fn XPLMGetLanguage() -> c_int;
    pub fn XPLMGetSystemPath(out_path: *mut c_char);
    pub fn XPLMGetPrefsPath(out_path: *mut c_char);
    pub fn XPLMGetDirectorySeparator() -> *const c_char;
    pub fn XPLMDebugString(message: *const c_char);
    pub fn XPLMSpeakString(message: *const c_char);
    pub fn XPLMReloadScenery();

    // XPLMDataAccess
    pub fn XPLMFindDataRef(name: *const c_char) -> XPLMDataRef;
    pub fn XPLMGetDatai(dataref: XPLMDataRef) -> c_int;
    pub fn XPLMGetDataf(dataref: XPLMDataRef) -> c_float;
    pub fn XPLMGetDatad(dataref: XPLMDataRef) -> c_double;
}
