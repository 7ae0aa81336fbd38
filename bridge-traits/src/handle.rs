//! Opaque Host Handles
//!
//! The host SDK hands out raw pointers for loaded objects, live instances and
//! flight-loop registrations. The core never dereferences them; it only passes
//! them back to the host. Each wrapper is deliberately neither `Clone` nor
//! `Copy`: whoever holds the value owns the host resource, and the release
//! functions on [`HostApi`](crate::host::HostApi) take the wrapper by value so
//! a handle can only be released once.
//!
//! Responses expose handles through [`display`](ObjectRef::display), an inert
//! hex string that cannot be turned back into a handle.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

macro_rules! host_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(PartialEq, Eq, Hash)]
        pub struct $name(NonNull<c_void>);

        // Safety: the pointer is an opaque token owned by the host. The core
        // never dereferences it, and every host call that consumes it is
        // routed through the pump thread.
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl $name {
            /// Wrap a raw host pointer. Returns `None` for null, which the host
            /// uses to signal failure.
            pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
                NonNull::new(ptr).map(Self)
            }

            /// Raw pointer for passing back to the host.
            pub fn as_ptr(&self) -> *mut c_void {
                self.0.as_ptr()
            }

            /// Hand the raw pointer back, giving up ownership.
            pub fn into_raw(self) -> *mut c_void {
                self.0.as_ptr()
            }

            /// Inert display value, e.g. `0x7F3A2C001230`.
            pub fn display(&self) -> String {
                format!("0x{:X}", self.0.as_ptr() as usize)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.display()).finish()
            }
        }
    };
}

host_handle!(
    /// A loaded scenery object (`XPLMObjectRef`).
    ObjectRef
);

host_handle!(
    /// A live, positioned instance of an object (`XPLMInstanceRef`).
    InstanceRef
);

host_handle!(
    /// A flight-loop callback registration (`XPLMFlightLoopID`).
    FlightLoopId
);
