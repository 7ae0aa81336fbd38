//! Runtime and utility tools.

use core_runtime::error::{ToolError, ToolResult};
use serde_json::{json, Value};

use crate::dispatch::{text_content, DispatchTable, ParamSpec, ToolSpec};
use crate::params::Params;
use crate::tools::ToolContext;

pub fn register(table: &mut DispatchTable, context: &ToolContext) {
    let ctx = context.clone();
    table.register(
        ToolSpec::new(
            "xplm_get_versions",
            "Get X-Plane version, XPLM version, and host id.",
        ),
        move |_| get_versions(&ctx),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new(
            "xplm_get_runtime_info",
            "Get runtime information like language, cycle, and elapsed time.",
        ),
        move |_| get_runtime_info(&ctx),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new(
            "xplm_get_system_paths",
            "Get X-Plane system and preferences paths.",
        ),
        move |_| get_system_paths(&ctx),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new(
            "xplm_debug_string",
            "Write a line to Log.txt through XPLMDebugString.",
        )
        .param(ParamSpec::string("message", "Message to write.")),
        move |params| debug_string(&ctx, params),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new(
            "xplm_speak_string",
            "Display/speak a message through XPLMSpeakString.",
        )
        .param(ParamSpec::string("message", "Message to speak.")),
        move |params| speak_string(&ctx, params),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new("xplm_reload_scenery", "Reload scenery."),
        move |_| reload_scenery(&ctx),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new(
            "xplm_aircraft_state_get",
            "Get the cached user aircraft state (refreshed every 0.1 s).",
        ),
        move |_| aircraft_state_get(&ctx),
    );
}

fn get_versions(ctx: &ToolContext) -> ToolResult<Value> {
    ctx.on_host(|host| {
        let versions = host.versions();
        Ok(text_content(&json!({
            "xplane_version": versions.xplane_version,
            "xplm_version": versions.xplm_version,
            "host_id": versions.host_id,
        })))
    })
}

fn get_runtime_info(ctx: &ToolContext) -> ToolResult<Value> {
    ctx.on_host(|host| {
        let versions = host.versions();
        Ok(text_content(&json!({
            "xplane_version": versions.xplane_version,
            "xplm_version": versions.xplm_version,
            "host_id": versions.host_id,
            "language": host.language(),
            "cycle_number": host.cycle_number(),
            "elapsed_time_sec": host.elapsed_time(),
        })))
    })
}

fn get_system_paths(ctx: &ToolContext) -> ToolResult<Value> {
    ctx.on_host(|host| {
        Ok(text_content(&json!({
            "system_path": host.system_path(),
            "prefs_path": host.prefs_path(),
            "directory_separator": host.directory_separator(),
        })))
    })
}

fn debug_string(ctx: &ToolContext, params: &Params) -> ToolResult<Value> {
    let message = params.require_string("message")?;

    ctx.on_host(move |host| {
        let mut line = message.clone();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        host.debug_string(&line);
        Ok(text_content(&json!({
            "success": true,
            "message": message,
        })))
    })
}

fn speak_string(ctx: &ToolContext, params: &Params) -> ToolResult<Value> {
    let message = params.require_string("message")?;

    ctx.on_host(move |host| {
        host.speak_string(&message);
        Ok(text_content(&json!({
            "success": true,
            "message": message,
        })))
    })
}

fn reload_scenery(ctx: &ToolContext) -> ToolResult<Value> {
    ctx.on_host(|host| {
        host.reload_scenery();
        Ok(text_content(&json!({ "success": true })))
    })
}

/// Served from the snapshot cache on the calling thread.
fn aircraft_state_get(ctx: &ToolContext) -> ToolResult<Value> {
    let state = ctx
        .snapshot
        .get()
        .ok_or_else(|| ToolError::internal("Aircraft state is not available yet."))?;
    Ok(text_content(&state))
}
