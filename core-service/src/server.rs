//! # Request Server
//!
//! Exposes the dispatch table to clients as newline-delimited JSON-RPC 2.0
//! over TCP.
//!
//! ## Threading
//!
//! The server owns a dedicated `tokio` runtime so that nothing async ever
//! runs on the simulator's thread. Tool handlers block inside the executor
//! until the pump thread has run their job, so each request is handled on
//! the runtime's blocking pool, capped at the configured worker count.
//!
//! ## Methods
//!
//! | Method | Result |
//! |--------|--------|
//! | `initialize` | protocol version, capabilities, server info |
//! | `ping` | `{}` |
//! | `tools/list` | `{"tools": [...]}` |
//! | `tools/call` | `{"content": [...]}` or a tool error |
//!
//! Requests without an `id` are notifications and get no response.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use core_runtime::config::BridgeConfig;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::DispatchTable;
use crate::error::{CoreError, Result};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// External request server driven by the lifecycle controller.
pub trait RequestServer: Send {
    /// Start serving `dispatch`. Starting a running server is a no-op.
    fn start(&mut self, dispatch: Arc<DispatchTable>) -> Result<()>;

    /// Stop accepting and release the server's threads.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Bound address while running.
    fn local_addr(&self) -> Option<SocketAddr>;
}

/// Identity reported from `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            name: config.server_name.clone(),
            version: config.server_version.clone(),
        }
    }
}

struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut body = json!({
        "code": error.code,
        "message": error.message,
    });
    if let Some(data) = error.data {
        body["data"] = data;
    }
    json!({ "jsonrpc": "2.0", "id": id, "error": body })
}

/// Handle one JSON-RPC message. Returns the response, or `None` for a
/// notification.
///
/// Blocks while a tool call waits for the main thread.
pub fn handle_message(dispatch: &DispatchTable, info: &ServerInfo, line: &str) -> Option<Value> {
    let request: Value = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            return Some(error_response(
                Value::Null,
                RpcError::new(PARSE_ERROR, format!("Parse error: {}", err)),
            ));
        }
    };

    let Some(object) = request.as_object() else {
        return Some(error_response(
            Value::Null,
            RpcError::new(INVALID_REQUEST, "Invalid request"),
        ));
    };

    let id = object.get("id").cloned();
    let Some(method) = object.get("method").and_then(Value::as_str) else {
        return Some(error_response(
            id.unwrap_or(Value::Null),
            RpcError::new(INVALID_REQUEST, "Invalid request"),
        ));
    };
    let params = object.get("params").cloned().unwrap_or(Value::Null);

    let outcome = call_method(dispatch, info, method, params);

    let id = id?;
    Some(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(error) => error_response(id, error),
    })
}

fn call_method(
    dispatch: &DispatchTable,
    info: &ServerInfo,
    method: &str,
    params: Value,
) -> std::result::Result<Value, RpcError> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": info.name, "version": info.version },
        })),
        "ping" => Ok(json!({})),
        "tools/list" => {
            let tools: Vec<Value> = dispatch.specs().map(|spec| spec.describe()).collect();
            Ok(json!({ "tools": tools }))
        }
        "tools/call" => {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::new(INVALID_PARAMS, "Missing tool name."))?;
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

            dispatch
                .call(name, arguments)
                .map(|content| json!({ "content": content }))
                .map_err(|err| {
                    debug!(tool = name, kind = err.kind.as_str(), error = %err, "Tool call failed");
                    RpcError {
                        code: err.kind.code(),
                        message: err.message,
                        data: Some(json!({ "kind": err.kind })),
                    }
                })
        }
        other if other.starts_with("notifications/") => Ok(Value::Null),
        other => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    }
}

struct Running {
    runtime: Runtime,
    cancel: CancellationToken,
    local_addr: SocketAddr,
}

/// [`RequestServer`] speaking JSON-RPC over TCP.
pub struct JsonRpcServer {
    bind_address: String,
    worker_threads: usize,
    info: ServerInfo,
    running: Option<Running>,
}

impl JsonRpcServer {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            bind_address: config.bind_address(),
            worker_threads: config.worker_threads,
            info: ServerInfo::from_config(config),
            running: None,
        }
    }
}

impl RequestServer for JsonRpcServer {
    fn start(&mut self, dispatch: Arc<DispatchTable>) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.worker_threads)
            .max_blocking_threads(self.worker_threads)
            .thread_name("mcp-worker")
            .enable_all()
            .build()?;

        let listener = runtime
            .block_on(TcpListener::bind(&self.bind_address))
            .map_err(|err| {
                CoreError::Server(format!("failed to bind {}: {}", self.bind_address, err))
            })?;
        let local_addr = listener.local_addr()?;

        let cancel = CancellationToken::new();
        runtime.spawn(accept_loop(
            listener,
            dispatch,
            self.info.clone(),
            cancel.clone(),
        ));

        debug!(address = %local_addr, workers = self.worker_threads, "Request server started");
        self.running = Some(Running {
            runtime,
            cancel,
            local_addr,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.cancel();
        // Handlers still blocked on the main thread are abandoned here; the
        // lifecycle controller fails their jobs right after.
        running.runtime.shutdown_timeout(SHUTDOWN_GRACE);
        info!(address = %running.local_addr, "Request server stopped");
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }
}

impl Drop for JsonRpcServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_loop(
    listener: TcpListener,
    dispatch: Arc<DispatchTable>,
    info: ServerInfo,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "Client connected");
                    tokio::spawn(serve_connection(
                        stream,
                        Arc::clone(&dispatch),
                        info.clone(),
                        cancel.child_token(),
                    ));
                }
                Err(err) => warn!(error = %err, "Failed to accept connection"),
            },
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    dispatch: Arc<DispatchTable>,
    info: ServerInfo,
    cancel: CancellationToken,
) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                debug!(error = %err, "Connection read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let dispatch = Arc::clone(&dispatch);
        let info = info.clone();
        let response =
            match tokio::task::spawn_blocking(move || handle_message(&dispatch, &info, &line)).await
            {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "Request handler did not complete");
                    Some(error_response(
                        Value::Null,
                        RpcError::new(INTERNAL_ERROR, "Internal error"),
                    ))
                }
            };

        if let Some(response) = response {
            let mut payload = response.to_string();
            payload.push('\n');
            if writer.write_all(payload.as_bytes()).await.is_err() {
                break;
            }
        }
    }

    debug!("Client disconnected");
}
