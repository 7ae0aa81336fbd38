//! Operation adapters.
//!
//! Each tool parses its arguments on the calling worker thread, then runs
//! the host calls inside one job on the main thread through
//! [`ToolContext::on_main_thread`], or [`ToolContext::on_host`] when it
//! never touches the registry.

use std::sync::Arc;

use bridge_traits::host::HostApi;
use core_executor::{MainThreadExecutor, SnapshotCache};
use core_registry::ResourceRegistry;
use core_runtime::error::ToolResult;
use parking_lot::Mutex;
use serde_json::Value;

use crate::dispatch::DispatchTable;

pub mod objects;
pub mod runtime;

/// Everything a tool handler needs.
#[derive(Clone)]
pub struct ToolContext {
    pub executor: Arc<MainThreadExecutor>,
    pub host: Arc<dyn HostApi>,
    /// Only locked inside jobs, so it is never contended.
    pub registry: Arc<Mutex<ResourceRegistry>>,
    pub snapshot: Arc<SnapshotCache>,
}

impl ToolContext {
    /// Run `f` on the main thread with the host and the registry.
    ///
    /// `f` must not submit further registry work: the registry lock is held
    /// while it runs.
    pub fn on_main_thread<F>(&self, f: F) -> ToolResult<Value>
    where
        F: FnOnce(&dyn HostApi, &mut ResourceRegistry) -> ToolResult<Value> + Send + 'static,
    {
        let host = Arc::clone(&self.host);
        let registry = Arc::clone(&self.registry);
        self.executor.submit(move || {
            let mut registry = registry.lock();
            f(host.as_ref(), &mut registry)
        })
    }

    /// Run `f` on the main thread with only the host.
    pub fn on_host<F>(&self, f: F) -> ToolResult<Value>
    where
        F: FnOnce(&dyn HostApi) -> ToolResult<Value> + Send + 'static,
    {
        let host = Arc::clone(&self.host);
        self.executor.submit(move || f(host.as_ref()))
    }
}

/// Build the table with every tool registered.
pub fn build_dispatch_table(context: &ToolContext) -> DispatchTable {
    let mut table = DispatchTable::new();
    runtime::register(&mut table, context);
    objects::register(&mut table, context);
    table
}
