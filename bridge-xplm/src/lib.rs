//! # X-Plane Bridge Implementation
//!
//! [`HostApi`](bridge_traits::HostApi) and
//! [`LoggerSink`](bridge_traits::LoggerSink) over the X-Plane plugin SDK
//! (XPLM).
//!
//! ## Feature Flags
//!
//! - `link-xplm`: declare and call the SDK functions. Without it only the
//!   SDK-independent helpers are built, so the workspace builds and tests
//!   on machines without X-Plane.
//!
//! ## Threading
//!
//! The SDK is not thread safe. [`XplmHost`] relies on the bridge core to
//! marshal every call onto the simulator thread, with one exception:
//! `XPLMDebugString`, which backs both `debug_string` and [`XplmLogSink`].
//! The SDK offers no thread-safe way to wake a flight loop, so the host
//! reports no cross-thread wakeup support and the bridge polls instead.

#[cfg(feature = "link-xplm")]
mod ffi;
#[cfg(feature = "link-xplm")]
mod host;
#[cfg(feature = "link-xplm")]
mod log;

pub mod state;
pub mod strings;

#[cfg(feature = "link-xplm")]
pub use host::XplmHost;
#[cfg(feature = "link-xplm")]
pub use log::XplmLogSink;
