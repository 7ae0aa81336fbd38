//! # X-Plane MCP Plugin
//!
//! Plugin shell that X-Plane loads. Holds the process-wide
//! [`PluginBridge`] and maps the XPLM plugin entry points onto it:
//!
//! | Entry point | Action |
//! |-------------|--------|
//! | `XPluginStart` | report identity, install logging, create and start the bridge |
//! | `XPluginEnable` | start the bridge |
//! | `XPluginDisable` | stop the bridge |
//! | `XPluginStop` | stop and release the bridge |
//!
//! The entry points are only compiled with the `xplm` feature. Without it
//! the crate still builds the shell logic, which the headless runner and the
//! tests drive against the simulated host.

use std::ffi::c_char;

use anyhow::Context;
use core_service::PluginBridge;
use parking_lot::Mutex;

pub const PLUGIN_NAME: &str = "x-ai-mcp";
pub const PLUGIN_SIGNATURE: &str = "com.github.x-z7a/x-ai-mcp";
pub const PLUGIN_DESCRIPTION: &str = "X-Plane MCP bridge exposing XPLM SDK tools.";

/// Size of each identity buffer X-Plane passes to `XPluginStart`.
const PLUGIN_STRING_CAPACITY: usize = 256;

static BRIDGE: Mutex<Option<PluginBridge>> = parking_lot::const_mutex(None);

/// Start the process bridge, building it with `make` on first use.
///
/// Must be called on the simulator thread.
pub fn start_bridge<F>(make: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<PluginBridge>,
{
    let mut slot = BRIDGE.lock();
    let bridge = match slot.take() {
        Some(bridge) => bridge,
        None => make().context("failed to create MCP bridge")?,
    };
    slot.insert(bridge)
        .start()
        .context("failed to start MCP bridge")
}

/// Stop the process bridge, keeping it for a later start.
pub fn stop_bridge() {
    if let Some(bridge) = BRIDGE.lock().as_mut() {
        bridge.stop();
    }
}

/// Stop and drop the process bridge.
pub fn release_bridge() {
    if let Some(mut bridge) = BRIDGE.lock().take() {
        bridge.stop();
    }
}

pub fn bridge_is_running() -> bool {
    BRIDGE
        .lock()
        .as_ref()
        .is_some_and(|bridge| bridge.is_running())
}

/// Copy `value` into an identity buffer, truncated to fit with its NUL.
///
/// # Safety
///
/// `dest` must be null or valid for writes of [`PLUGIN_STRING_CAPACITY`]
/// bytes.
pub unsafe fn copy_plugin_string(dest: *mut c_char, value: &str) {
    if dest.is_null() {
        return;
    }
    let bytes = value.as_bytes();
    let len = bytes.len().min(PLUGIN_STRING_CAPACITY - 1);
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), dest as *mut u8, len);
    *dest.add(len) = 0;
}

#[cfg(feature = "xplm")]
#[allow(non_snake_case)]
mod plugin {
    use std::ffi::{c_char, c_int, c_void};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;

    use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};
    use bridge_xplm::{XplmHost, XplmLogSink};
    use core_runtime::config::BridgeConfig;
    use core_runtime::logging::{try_init_logging, LoggingConfig};
    use core_service::{JsonRpcServer, PluginBridge};
    use tracing::error;

    use super::*;

    fn install_logging() {
        let sink = Arc::new(XplmLogSink::default());
        let config = LoggingConfig::default()
            .with_console(false)
            .with_logger_sink(sink.clone());
        if let Err(err) = try_init_logging(config) {
            let entry = LogEntry::new(
                LogLevel::Error,
                "xplane_mcp",
                format!("Logging unavailable: {}", err),
            );
            let _ = sink.log(&entry);
        }
    }

    fn xplm_bridge() -> anyhow::Result<PluginBridge> {
        let config = BridgeConfig::from_env();
        config.validate()?;
        let server = Box::new(JsonRpcServer::new(&config));
        Ok(PluginBridge::new(config, Arc::new(XplmHost::new()), server))
    }

    /// Run an entry point body without letting a panic cross into X-Plane.
    fn guarded(entry: &str, body: impl FnOnce() -> anyhow::Result<()>) -> c_int {
        match catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(())) => 1,
            Ok(Err(err)) => {
                error!(error = %format!("{:#}", err), "{} failed", entry);
                0
            }
            Err(_) => {
                error!("{} panicked", entry);
                0
            }
        }
    }

    #[no_mangle]
    pub unsafe extern "C" fn XPluginStart(
        out_name: *mut c_char,
        out_signature: *mut c_char,
        out_description: *mut c_char,
    ) -> c_int {
        copy_plugin_string(out_name, PLUGIN_NAME);
        copy_plugin_string(out_signature, PLUGIN_SIGNATURE);
        copy_plugin_string(out_description, PLUGIN_DESCRIPTION);

        install_logging();
        guarded("XPluginStart", || start_bridge(xplm_bridge))
    }

    #[no_mangle]
    pub extern "C" fn XPluginStop() {
        guarded("XPluginStop", || {
            release_bridge();
            Ok(())
        });
    }

    #[no_mangle]
    pub extern "C" fn XPluginEnable() -> c_int {
        guarded("XPluginEnable", || start_bridge(xplm_bridge))
    }

    #[no_mangle]
    pub extern "C" fn XPluginDisable() {
        guarded("XPluginDisable", || {
            stop_bridge();
            Ok(())
        });
    }

    #[no_mangle]
    pub extern "C" fn XPluginReceiveMessage(_from: c_int, _message: c_int, _param: *mut c_void) {}
}
