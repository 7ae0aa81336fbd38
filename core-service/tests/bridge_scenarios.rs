//! End-to-end scenarios for the lifecycle controller, driven through the
//! simulated host with the test thread acting as the simulator main thread.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use bridge_traits::SimulatedHost;
use core_executor::MainThreadExecutor;
use core_runtime::config::BridgeConfig;
use core_runtime::error::{ToolErrorKind, ToolResult};
use core_service::{BridgeState, CoreError, DispatchTable, PluginBridge, RequestServer};
use mockall::mock;
use serde_json::{json, Value};

mock! {
    pub Server {}

    impl RequestServer for Server {
        fn start(&mut self, dispatch: Arc<DispatchTable>) -> core_service::Result<()>;
        fn stop(&mut self);
        fn is_running(&self) -> bool;
        fn local_addr(&self) -> Option<SocketAddr>;
    }
}

fn accepting_server(starts: usize) -> MockServer {
    let mut server = MockServer::new();
    server.expect_start().times(starts).returning(|_| Ok(()));
    server.expect_stop().times(starts).return_const(());
    server.expect_is_running().return_const(false);
    server.expect_local_addr().return_const(None);
    server
}

fn main_thread_host() -> Arc<SimulatedHost> {
    let host = Arc::new(SimulatedHost::new());
    host.bind_main_thread(thread::current().id());
    host
}

fn running_bridge(host: &Arc<SimulatedHost>, config: BridgeConfig) -> PluginBridge {
    let mut bridge = PluginBridge::new(config, host.clone(), Box::new(accepting_server(1)));
    bridge.start().unwrap();
    bridge
}

/// Call a tool from a worker thread while this thread runs the host's
/// flight loops, the way a client request reaches the simulator.
fn call_pumped(
    host: &Arc<SimulatedHost>,
    dispatch: &Arc<DispatchTable>,
    name: &'static str,
    arguments: Value,
) -> ToolResult<Value> {
    let table = Arc::clone(dispatch);
    let worker = thread::spawn(move || table.call(name, arguments));
    while !worker.is_finished() {
        host.run_flight_loops(0.01);
        thread::sleep(Duration::from_millis(1));
    }
    worker.join().unwrap()
}

fn payload(content: Value) -> Value {
    let text = content[0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let host = main_thread_host();
    let mut bridge = PluginBridge::new(
        BridgeConfig::default(),
        host.clone(),
        Box::new(accepting_server(1)),
    );

    bridge.start().unwrap();
    bridge.start().unwrap();
    assert_eq!(host.flight_loop_count(), 1);

    bridge.stop();
    bridge.stop();
    assert_eq!(bridge.state(), BridgeState::Stopped);
    assert_eq!(host.flight_loop_count(), 0);
    assert!(host.violations().is_empty());
}

#[test]
fn test_flight_loop_failure_leaves_nothing_registered() {
    let host = main_thread_host();
    host.fail_flight_loop_creation(true);

    let mut server = MockServer::new();
    server.expect_start().never();
    server.expect_stop().never();
    server.expect_is_running().return_const(false);
    let mut bridge = PluginBridge::new(BridgeConfig::default(), host.clone(), Box::new(server));

    let result = bridge.start();

    assert!(matches!(result, Err(CoreError::FlightLoop(_))));
    assert_eq!(bridge.state(), BridgeState::Stopped);
    assert!(bridge.dispatch().is_none());
    assert_eq!(host.flight_loop_count(), 0);
}

#[test]
fn test_server_failure_rolls_back_flight_loop() {
    let host = main_thread_host();

    let mut server = MockServer::new();
    server
        .expect_start()
        .times(1)
        .returning(|_| Err(CoreError::Server("address in use".to_string())));
    server.expect_stop().never();
    server.expect_is_running().return_const(false);
    let mut bridge = PluginBridge::new(BridgeConfig::default(), host.clone(), Box::new(server));

    let result = bridge.start();

    assert!(matches!(result, Err(CoreError::Server(_))));
    assert_eq!(bridge.state(), BridgeState::Stopped);
    assert_eq!(host.flight_loop_count(), 0);
    assert!(!bridge.snapshot().is_ready());
    assert!(host.violations().is_empty());
}

#[test]
fn test_object_in_use_cannot_be_unloaded() {
    let host = main_thread_host();
    let bridge = running_bridge(&host, BridgeConfig::default());
    let dispatch = bridge.dispatch().unwrap();

    let loaded = call_pumped(&host, &dispatch, "xplm_object_load", json!({ "path": "A" })).unwrap();
    assert_eq!(payload(loaded)["object_id"], 1);

    let created = call_pumped(
        &host,
        &dispatch,
        "xplm_instance_create",
        json!({ "object_id": 1, "datarefs": ["sim/test/beacon"] }),
    )
    .unwrap();
    let created = payload(created);
    assert_eq!(created["instance_id"], 1);
    let instance_ref = created["instance_ref"].as_str().unwrap().to_string();

    let err = call_pumped(&host, &dispatch, "xplm_object_unload", json!({ "object_id": 1 }))
        .unwrap_err();
    assert_eq!(err.kind, ToolErrorKind::InvalidParams);
    assert_eq!(err.message, "Object is in use by instance_id=1");

    let err = call_pumped(
        &host,
        &dispatch,
        "xplm_instance_set_position",
        json!({ "instance_id": 1, "x": 1.0, "y": 2.0, "z": 3.0, "data": [] }),
    )
    .unwrap_err();
    assert_eq!(err.message, "data size mismatch; expected 1 values.");

    let placed = call_pumped(
        &host,
        &dispatch,
        "xplm_instance_set_position",
        json!({ "instance_id": 1, "x": 1.0, "y": 2.0, "z": 3.0, "heading": 90.0, "data": [0.5] }),
    )
    .unwrap();
    assert_eq!(payload(placed)["data_count"], 1);
    let placement = host.instance_placement(&instance_ref).unwrap();
    assert_eq!(placement.position.heading, 90.0);
    assert_eq!(placement.data, vec![0.5]);

    call_pumped(&host, &dispatch, "xplm_instance_destroy", json!({ "instance_id": 1 })).unwrap();
    let unloaded =
        call_pumped(&host, &dispatch, "xplm_object_unload", json!({ "object_id": 1 })).unwrap();
    assert_eq!(payload(unloaded)["path"], "A");

    let listed = call_pumped(&host, &dispatch, "xplm_object_list", json!({})).unwrap();
    assert_eq!(payload(listed)["count"], 0);
    assert!(host.loaded_objects().is_empty());
    assert!(host.violations().is_empty());
}

#[test]
fn test_invalid_arguments_never_reach_the_main_thread() {
    let host = main_thread_host();
    let bridge = running_bridge(&host, BridgeConfig::default());
    let dispatch = bridge.dispatch().unwrap();

    let worker = thread::spawn(move || dispatch.call("xplm_instance_create", json!({})));
    let err = worker.join().unwrap().unwrap_err();

    assert_eq!(err.kind, ToolErrorKind::InvalidParams);
    assert_eq!(err.message, "Missing integer argument: object_id");
    assert_eq!(bridge.executor().pending(), 0);
}

#[test]
fn test_timed_out_job_still_runs_on_next_drain() {
    let host = main_thread_host();
    let config = BridgeConfig::builder()
        .main_thread_timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let bridge = running_bridge(&host, config);
    let dispatch = bridge.dispatch().unwrap();

    let table = Arc::clone(&dispatch);
    let err = thread::spawn(move || table.call("xplm_object_load", json!({ "path": "late.obj" })))
        .join()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind, ToolErrorKind::InternalError);
    assert_eq!(err.message, "Timed out waiting for X-Plane main thread.");
    assert!(host.loaded_objects().is_empty());

    host.run_flight_loops(0.01);
    assert_eq!(host.loaded_objects(), vec!["late.obj".to_string()]);

    let listed = call_pumped(&host, &dispatch, "xplm_object_list", json!({})).unwrap();
    assert_eq!(payload(listed)["count"], 1);
}

#[test]
fn test_aircraft_state_served_without_main_thread() {
    let host = main_thread_host();
    host.set_state(json!({ "latitude": 51.47, "on_ground": false }));
    let mut bridge = running_bridge(&host, BridgeConfig::default());
    let dispatch = bridge.dispatch().unwrap();

    let table = Arc::clone(&dispatch);
    let state = thread::spawn(move || table.call("xplm_aircraft_state_get", json!({})))
        .join()
        .unwrap()
        .unwrap();
    assert_eq!(payload(state)["latitude"], 51.47);

    bridge.stop();
    let err = dispatch
        .call("xplm_aircraft_state_get", json!({}))
        .unwrap_err();
    assert_eq!(err.message, "Aircraft state is not available yet.");
    assert!(host.violations().is_empty());
}

#[test]
fn test_stop_releases_every_host_resource() {
    let host = main_thread_host();
    let mut bridge = running_bridge(&host, BridgeConfig::default());
    let dispatch = bridge.dispatch().unwrap();

    for path in ["a.obj", "b.obj"] {
        call_pumped(&host, &dispatch, "xplm_object_load", json!({ "path": path })).unwrap();
    }
    call_pumped(&host, &dispatch, "xplm_instance_create", json!({ "object_id": 2 })).unwrap();
    assert_eq!(host.live_instance_count(), 1);

    bridge.stop();

    assert!(host.loaded_objects().is_empty());
    assert_eq!(host.live_instance_count(), 0);
    assert_eq!(host.flight_loop_count(), 0);
    assert!(host.violations().is_empty());

    let err = thread::spawn(move || dispatch.call("xplm_object_list", json!({})))
        .join()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.message, "Plugin is shutting down.");
}

#[test]
fn test_ids_keep_counting_across_restart() {
    let host = main_thread_host();
    let mut bridge = PluginBridge::new(
        BridgeConfig::default(),
        host.clone(),
        Box::new(accepting_server(2)),
    );

    bridge.start().unwrap();
    let dispatch = bridge.dispatch().unwrap();
    let first = call_pumped(&host, &dispatch, "xplm_object_load", json!({ "path": "a.obj" }))
        .unwrap();
    assert_eq!(payload(first)["object_id"], 1);
    bridge.stop();

    bridge.start().unwrap();
    let dispatch = bridge.dispatch().unwrap();
    let second = call_pumped(&host, &dispatch, "xplm_object_load", json!({ "path": "a.obj" }))
        .unwrap();
    assert_eq!(payload(second)["object_id"], 2);
    bridge.stop();

    assert!(host.violations().is_empty());
}

#[test]
fn test_stop_releases_resources_from_jobs_queued_before_shutdown() {
    let host = main_thread_host();
    let mut bridge = PluginBridge::new(
        BridgeConfig::default(),
        host.clone(),
        Box::new(accepting_server(2)),
    );
    bridge.start().unwrap();
    let dispatch = bridge.dispatch().unwrap();

    let table = Arc::clone(&dispatch);
    let worker =
        thread::spawn(move || table.call("xplm_object_load", json!({ "path": "late.obj" })));
    while bridge.executor().pending() == 0 {
        thread::sleep(Duration::from_millis(1));
    }

    bridge.stop();

    let loaded = worker.join().unwrap().unwrap();
    assert_eq!(payload(loaded)["path"], "late.obj");
    assert!(host.loaded_objects().is_empty());
    assert!(host.violations().is_empty());

    bridge.start().unwrap();
    let dispatch = bridge.dispatch().unwrap();
    let listed = call_pumped(&host, &dispatch, "xplm_object_list", json!({})).unwrap();
    assert_eq!(payload(listed)["count"], 0);
    bridge.stop();
    assert!(host.violations().is_empty());
}

#[test]
fn test_jobs_arriving_while_server_stops_are_settled_before_stop_returns() {
    let host = main_thread_host();
    let executor_cell: Arc<OnceLock<Arc<MainThreadExecutor>>> = Arc::new(OnceLock::new());
    let teardown_ran = Arc::new(AtomicBool::new(false));
    let rejected: Arc<Mutex<Option<ToolResult<Value>>>> = Arc::new(Mutex::new(None));

    let mut server = MockServer::new();
    server.expect_start().times(1).returning(|_| Ok(()));
    server.expect_is_running().return_const(false);
    server.expect_local_addr().return_const(None);
    {
        let cell = Arc::clone(&executor_cell);
        let ran = Arc::clone(&teardown_ran);
        let rejected = Arc::clone(&rejected);
        server.expect_stop().times(1).returning(move || {
            let executor = Arc::clone(cell.get().unwrap());
            let ran = Arc::clone(&ran);
            let result = thread::spawn(move || {
                let queued = executor.run_or_enqueue(move || {
                    ran.store(true, Ordering::SeqCst);
                    Ok(Value::Null)
                });
                assert!(queued.is_none());
                executor.submit(|| Ok(json!("ran")))
            })
            .join()
            .unwrap();
            *rejected.lock().unwrap() = Some(result);
        });
    }

    let mut bridge = PluginBridge::new(BridgeConfig::default(), host.clone(), Box::new(server));
    executor_cell
        .set(Arc::clone(bridge.executor()))
        .unwrap_or_else(|_| panic!("executor already set"));
    bridge.start().unwrap();

    bridge.stop();

    assert!(teardown_ran.load(Ordering::SeqCst));
    let err = rejected.lock().unwrap().take().unwrap().unwrap_err();
    assert_eq!(err.kind, ToolErrorKind::InternalError);
    assert_eq!(err.message, "Plugin is shutting down.");
    assert_eq!(bridge.executor().pending(), 0);
    assert_eq!(bridge.state(), BridgeState::Stopped);
    assert!(host.violations().is_empty());
}
