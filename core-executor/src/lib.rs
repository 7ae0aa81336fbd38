//! # Core Executor
//!
//! The cross-thread execution bridge between request workers and the
//! simulator's main thread.
//!
//! ## Overview
//!
//! The host API may only be called on one thread, and the host decides when
//! that thread runs plugin code. This crate provides:
//!
//! - [`MainThreadExecutor`] - queue a closure from any thread and block until
//!   the pump thread has run it, with a bounded wait and a shutdown gate
//! - [`HostLoop`] - the flight-loop callback that drains the queue every tick
//!   and keeps the aircraft state [`SnapshotCache`] fresh
//!
//! ## Usage
//!
//! ```ignore
//! let executor = Arc::new(MainThreadExecutor::new(config.main_thread_timeout));
//! executor.bind_current_thread();
//!
//! let host_loop = Arc::new(HostLoop::new(
//!     executor.clone(),
//!     host.clone(),
//!     Arc::new(SnapshotCache::new()),
//!     config.pump_interval,
//!     config.snapshot_interval,
//! ));
//! let flight_loop = host.create_flight_loop(host_loop.handler())?;
//!
//! // From a worker thread:
//! let versions = executor.submit(move || Ok(json!(host.versions())))?;
//! ```

pub mod executor;
pub mod host_loop;
pub mod job;

pub use executor::{HostWaker, MainThreadExecutor, PumpWaker};
pub use host_loop::{HostLoop, SnapshotCache};
pub use job::{Job, JobSlot};
