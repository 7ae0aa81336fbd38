//! # Host Bridge Traits
//!
//! The contract between the bridge core and the host application's plugin
//! SDK.
//!
//! ## Overview
//!
//! The host is a simulator that loads the bridge as a plugin and exposes a
//! fixed, non-reentrant C API. Nearly every call is only legal on the
//! simulator's main thread, and the only re-entry point into plugin code on
//! that thread is a periodic flight-loop callback. This crate describes that
//! surface so the core can be built and tested without the simulator:
//!
//! - [`HostApi`](host::HostApi) - flight loops, objects, instances, runtime queries
//! - [`ObjectRef`](handle::ObjectRef), [`InstanceRef`](handle::InstanceRef),
//!   [`FlightLoopId`](handle::FlightLoopId) - owning wrappers for opaque host pointers
//! - [`LoggerSink`](log::LoggerSink) - forward structured logs into the host log
//! - [`SimulatedHost`](sim::SimulatedHost) - in-memory host for tests and headless runs
//!
//! ## Implementations
//!
//! | Host | Implementation Crate |
//! |------|---------------------|
//! | X-Plane (XPLM SDK) | `bridge-xplm` |
//! | In-process simulation | [`sim`] |
//!
//! ## Error Handling
//!
//! Host calls that can fail report [`BridgeError`](error::BridgeError). Calls
//! the SDK models as "null on failure" return `Option` instead, leaving the
//! caller to decide how the failure is reported.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` so implementations can be captured by
//! closures marshaled to the pump thread. That bound says nothing about which
//! thread may *call* them; see [`host`] for the threading rules.

pub mod error;
pub mod handle;
pub mod host;
pub mod log;
pub mod sim;

pub use error::BridgeError;

// Re-export commonly used types
pub use handle::{FlightLoopId, InstanceRef, ObjectRef};
pub use host::{
    DrawPosition, FlightLoopHandler, FlightLoopTick, HostApi, HostVersions, NextCallback,
};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use sim::SimulatedHost;
