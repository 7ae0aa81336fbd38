//! Core service: tool dispatch, the request server and the lifecycle
//! controller that wires them to the host.
//!
//! A [`PluginBridge`] owns everything that lives between plugin enable and
//! disable. The host entry points create one, call
//! [`start`](PluginBridge::start) from the simulator main thread and
//! [`stop`](PluginBridge::stop) from the same thread on the way out.
//!
//! ```ignore
//! let config = BridgeConfig::from_env();
//! let server = Box::new(JsonRpcServer::new(&config));
//! let mut bridge = PluginBridge::new(config, host, server);
//! bridge.start()?;
//! ```

pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod params;
pub mod server;
pub mod tools;

pub use dispatch::{text_content, DispatchTable, ParamKind, ParamSpec, ToolHandler, ToolSpec};
pub use error::{CoreError, Result};
pub use lifecycle::{BridgeState, PluginBridge};
pub use params::Params;
pub use server::{handle_message, JsonRpcServer, RequestServer, ServerInfo};
pub use tools::{build_dispatch_table, ToolContext};
