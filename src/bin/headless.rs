//! Runs the bridge against the simulated host, without X-Plane.
//!
//! The main thread plays the simulator: it runs the flight loops at the
//! cadence the bridge asks for while the request server accepts clients.
//! Configure with the same `XAI_MCP_*` variables as the plugin; stop with
//! Ctrl-C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use bridge_traits::{NextCallback, SimulatedHost};
use core_runtime::config::BridgeConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_service::{JsonRpcServer, PluginBridge};
use tracing::{info, warn};

fn watch_ctrl_c(stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            if let Err(err) = runtime.block_on(tokio::signal::ctrl_c()) {
                warn!(error = %err, "Failed to listen for Ctrl-C");
            }
            stop.store(true, Ordering::SeqCst);
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

fn next_delay(schedules: &[NextCallback], fallback: Duration) -> Duration {
    match schedules.first() {
        Some(NextCallback::Seconds(seconds)) => {
            Duration::try_from_secs_f32(*seconds).unwrap_or(fallback)
        }
        _ => fallback,
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default()).context("failed to initialize logging")?;

    let config = BridgeConfig::from_env();
    config.validate().context("invalid configuration")?;
    let pump_interval = config.pump_interval;

    let host = Arc::new(SimulatedHost::new());
    host.bind_main_thread(thread::current().id());

    let server = Box::new(JsonRpcServer::new(&config));
    let mut bridge = PluginBridge::new(config, host.clone(), server);
    bridge.start().context("failed to start bridge")?;

    let stop = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(Arc::clone(&stop))?;
    info!("Headless bridge running; press Ctrl-C to stop");

    let mut last = Instant::now();
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        let schedules = host.run_flight_loops(now.duration_since(last).as_secs_f32());
        last = now;
        thread::sleep(next_delay(&schedules, pump_interval));
    }

    bridge.stop();
    let violations = host.violations();
    if !violations.is_empty() {
        warn!(count = violations.len(), "Host contract violations recorded");
        for violation in violations {
            warn!("{}", violation);
        }
    }
    Ok(())
}
