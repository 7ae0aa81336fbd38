//! # Lifecycle Controller
//!
//! Starts and stops the whole bridge: the flight-loop registration, the
//! dispatch table, the request server and every resource the registry owns.
//!
//! ## States
//!
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`
//!
//! A failed start returns to `Stopped` with nothing left registered. A
//! stopped bridge can be started again; resource ids keep counting from
//! where they left off.
//!
//! ## Threading
//!
//! [`start`](PluginBridge::start) records the calling thread as the pump
//! thread, and [`stop`](PluginBridge::stop) must be called on that same
//! thread. The plugin entry points the host calls satisfy both.

use std::net::SocketAddr;
use std::sync::Arc;

use bridge_traits::handle::FlightLoopId;
use bridge_traits::host::{HostApi, NextCallback};
use core_executor::{HostLoop, HostWaker, MainThreadExecutor, PumpWaker, SnapshotCache};
use core_registry::ResourceRegistry;
use core_runtime::config::BridgeConfig;
use core_runtime::error::ToolError;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::dispatch::DispatchTable;
use crate::error::Result;
use crate::server::RequestServer;
use crate::tools::{build_dispatch_table, ToolContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

pub struct PluginBridge {
    config: BridgeConfig,
    host: Arc<dyn HostApi>,
    server: Box<dyn RequestServer>,
    executor: Arc<MainThreadExecutor>,
    registry: Arc<Mutex<ResourceRegistry>>,
    snapshot: Arc<SnapshotCache>,
    host_loop: Arc<HostLoop>,
    flight_loop: Option<FlightLoopId>,
    dispatch: Option<Arc<DispatchTable>>,
    state: BridgeState,
}

impl PluginBridge {
    pub fn new(
        config: BridgeConfig,
        host: Arc<dyn HostApi>,
        server: Box<dyn RequestServer>,
    ) -> Self {
        let executor = Arc::new(MainThreadExecutor::new(config.main_thread_timeout));
        if let Some(waker) = HostWaker::for_host(Arc::clone(&host)) {
            let waker: Arc<dyn PumpWaker> = Arc::new(waker);
            executor.set_waker(Some(waker));
        }

        let snapshot = Arc::new(SnapshotCache::new());
        let host_loop = Arc::new(HostLoop::new(
            Arc::clone(&executor),
            Arc::clone(&host),
            Arc::clone(&snapshot),
            config.pump_interval,
            config.snapshot_interval,
        ));

        Self {
            config,
            host,
            server,
            executor,
            registry: Arc::new(Mutex::new(ResourceRegistry::new())),
            snapshot,
            host_loop,
            flight_loop: None,
            dispatch: None,
            state: BridgeState::Stopped,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == BridgeState::Running
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<MainThreadExecutor> {
        &self.executor
    }

    pub fn snapshot(&self) -> &Arc<SnapshotCache> {
        &self.snapshot
    }

    /// The installed dispatch table while running.
    pub fn dispatch(&self) -> Option<Arc<DispatchTable>> {
        self.dispatch.clone()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    /// Bring the bridge up. A no-op when already running.
    ///
    /// # Errors
    ///
    /// Fails if the host rejects the flight-loop registration or the request
    /// server cannot start. Either way nothing stays registered.
    pub fn start(&mut self) -> Result<()> {
        if self.state == BridgeState::Running {
            return Ok(());
        }
        self.state = BridgeState::Starting;

        self.executor.resume();
        self.executor.bind_current_thread();

        let flight_loop = match self.host.create_flight_loop(self.host_loop.handler()) {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, "Failed to create flight loop callback");
                self.state = BridgeState::Stopped;
                return Err(err.into());
            }
        };
        // Keep the pump armed from the start so workers never need to
        // schedule it from their own threads.
        self.host
            .schedule_flight_loop(&flight_loop, NextCallback::Cycles(1));

        let context = ToolContext {
            executor: Arc::clone(&self.executor),
            host: Arc::clone(&self.host),
            registry: Arc::clone(&self.registry),
            snapshot: Arc::clone(&self.snapshot),
        };
        let dispatch = Arc::new(build_dispatch_table(&context));
        debug!(tools = dispatch.len(), "Registered tools");

        self.host_loop.reset();
        self.host_loop.prime();

        if let Err(err) = self.server.start(Arc::clone(&dispatch)) {
            error!(error = %err, "Failed to start MCP server");
            self.host.destroy_flight_loop(flight_loop);
            self.snapshot.clear();
            self.state = BridgeState::Stopped;
            return Err(err);
        }

        self.flight_loop = Some(flight_loop);
        self.dispatch = Some(dispatch);
        self.state = BridgeState::Running;

        let address = self
            .server
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| self.config.bind_address());
        info!(address = %address, "MCP server listening");
        Ok(())
    }

    /// Tear the bridge down. A no-op when already stopped.
    pub fn stop(&mut self) {
        if self.state != BridgeState::Running && !self.server.is_running() {
            return;
        }
        self.state = BridgeState::Stopping;

        self.executor.begin_shutdown();

        // Release resources before the server goes away so requests still in
        // flight see a consistent registry.
        self.release_resources();

        self.executor.drain();
        self.server.stop();
        self.executor.drain();

        // Jobs queued before shutdown began ran in the drains above and may
        // have created resources after the first release.
        self.release_resources();
        self.executor.drain();

        let failed = self.executor.fail_pending(ToolError::shutting_down());
        if failed > 0 {
            debug!(count = failed, "Rejected jobs queued during shutdown");
        }

        if let Some(flight_loop) = self.flight_loop.take() {
            self.host.destroy_flight_loop(flight_loop);
        }

        self.snapshot.clear();
        self.host_loop.reset();
        self.dispatch = None;
        self.state = BridgeState::Stopped;
        info!("MCP server stopped");
    }

    fn release_resources(&self) {
        let registry = Arc::clone(&self.registry);
        let host = Arc::clone(&self.host);
        let teardown = self.executor.run_or_enqueue(move || {
            registry.lock().clear(host.as_ref());
            Ok(Value::Null)
        });
        if let Some(Err(err)) = teardown {
            warn!(error = %err, "Resource teardown failed");
        }
    }
}

impl Drop for PluginBridge {
    fn drop(&mut self) {
        self.stop();
    }
}
