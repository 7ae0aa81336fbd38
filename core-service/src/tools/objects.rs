//! Object and instance tools.
//!
//! Objects are loaded scenery models; instances are positioned copies of a
//! loaded object that may carry per-instance dataref values.

use bridge_traits::host::DrawPosition;
use core_runtime::error::{ToolError, ToolResult};
use serde_json::{json, Value};

use crate::dispatch::{text_content, DispatchTable, ParamKind, ParamSpec, ToolSpec};
use crate::params::Params;
use crate::tools::ToolContext;

pub fn register(table: &mut DispatchTable, context: &ToolContext) {
    let ctx = context.clone();
    table.register(
        ToolSpec::new("xplm_object_load", "Load OBJ and return managed object id.")
            .param(ParamSpec::string("path", "Path relative to X-Plane system folder.")),
        move |params| object_load(&ctx, params),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new("xplm_object_unload", "Unload managed object by id.")
            .param(ParamSpec::integer("object_id", "Managed object id.")),
        move |params| object_unload(&ctx, params),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new("xplm_object_list", "List loaded managed objects."),
        move |_| object_list(&ctx),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new("xplm_instance_create", "Create instance from managed object id.")
            .param(ParamSpec::integer("object_id", "Managed object id."))
            .param(
                ParamSpec::array("datarefs", "Optional ordered datarefs array.", ParamKind::String)
                    .optional(),
            ),
        move |params| instance_create(&ctx, params),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new("xplm_instance_destroy", "Destroy managed instance by id.")
            .param(ParamSpec::integer("instance_id", "Managed instance id.")),
        move |params| instance_destroy(&ctx, params),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new(
            "xplm_instance_set_position",
            "Set instance position and per-instance data.",
        )
        .param(ParamSpec::integer("instance_id", "Managed instance id."))
        .param(ParamSpec::number("x", "Local X."))
        .param(ParamSpec::number("y", "Local Y."))
        .param(ParamSpec::number("z", "Local Z."))
        .param(ParamSpec::number("pitch", "Pitch degrees.").optional())
        .param(ParamSpec::number("heading", "Heading degrees.").optional())
        .param(ParamSpec::number("roll", "Roll degrees.").optional())
        .param(
            ParamSpec::boolean("double_precision", "Use double-precision positioning.").optional(),
        )
        .param(
            ParamSpec::array("data", "Per-instance dataref values.", ParamKind::Number).optional(),
        ),
        move |params| instance_set_position(&ctx, params),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new(
            "xplm_instance_set_auto_shift",
            "Enable auto-shift for a managed instance.",
        )
        .param(ParamSpec::integer("instance_id", "Managed instance id.")),
        move |params| instance_set_auto_shift(&ctx, params),
    );

    let ctx = context.clone();
    table.register(
        ToolSpec::new("xplm_instance_list", "List managed instances."),
        move |_| instance_list(&ctx),
    );
}

fn object_load(ctx: &ToolContext, params: &Params) -> ToolResult<Value> {
    let path = params.require_string("path")?;

    ctx.on_main_thread(move |host, registry| {
        let object = host
            .load_object(&path)
            .ok_or_else(|| ToolError::invalid_params(format!("Failed to load object: {}", path)))?;
        let object_ref = object.display();
        let object_id = registry.create_asset(object, path.clone());

        Ok(text_content(&json!({
            "object_id": object_id,
            "path": path,
            "object_ref": object_ref,
        })))
    })
}

fn object_unload(ctx: &ToolContext, params: &Params) -> ToolResult<Value> {
    let object_id = params.require_int("object_id")?;

    ctx.on_main_thread(move |host, registry| {
        let path = registry.remove_asset(object_id, host)?;
        Ok(text_content(&json!({
            "object_id": object_id,
            "path": path,
            "success": true,
        })))
    })
}

fn object_list(ctx: &ToolContext) -> ToolResult<Value> {
    ctx.on_main_thread(|_, registry| {
        let objects: Vec<_> = registry.list_assets().collect();
        Ok(text_content(&json!({
            "count": objects.len(),
            "objects": objects,
        })))
    })
}

fn instance_create(ctx: &ToolContext, params: &Params) -> ToolResult<Value> {
    let object_id = params.require_int("object_id")?;
    let datarefs = params.string_list("datarefs")?;

    ctx.on_main_thread(move |host, registry| {
        let instance_id = registry.create_instance(host, object_id, datarefs.clone())?;
        let instance_ref = registry.instance(instance_id)?.instance().display();

        Ok(text_content(&json!({
            "instance_id": instance_id,
            "object_id": object_id,
            "instance_ref": instance_ref,
            "datarefs": datarefs,
        })))
    })
}

fn instance_destroy(ctx: &ToolContext, params: &Params) -> ToolResult<Value> {
    let instance_id = params.require_int("instance_id")?;

    ctx.on_main_thread(move |host, registry| {
        registry.remove_instance(instance_id, host)?;
        Ok(text_content(&json!({
            "instance_id": instance_id,
            "success": true,
        })))
    })
}

fn instance_set_position(ctx: &ToolContext, params: &Params) -> ToolResult<Value> {
    let instance_id = params.require_int("instance_id")?;
    let position = DrawPosition {
        x: params.require_number("x")?,
        y: params.require_number("y")?,
        z: params.require_number("z")?,
        pitch: params.number_or("pitch", 0.0)?,
        heading: params.number_or("heading", 0.0)?,
        roll: params.number_or("roll", 0.0)?,
        double_precision: params.bool_or("double_precision", false)?,
    };
    let data = params.number_list("data")?;

    ctx.on_main_thread(move |host, registry| {
        registry.set_position(instance_id, host, &position, &data)?;
        Ok(text_content(&json!({
            "instance_id": instance_id,
            "double_precision": position.double_precision,
            "x": position.x,
            "y": position.y,
            "z": position.z,
            "pitch": position.pitch,
            "heading": position.heading,
            "roll": position.roll,
            "data_count": data.len(),
        })))
    })
}

fn instance_set_auto_shift(ctx: &ToolContext, params: &Params) -> ToolResult<Value> {
    let instance_id = params.require_int("instance_id")?;

    ctx.on_main_thread(move |host, registry| {
        registry.set_auto_shift(instance_id, host)?;
        Ok(text_content(&json!({
            "instance_id": instance_id,
            "auto_shift": true,
        })))
    })
}

fn instance_list(ctx: &ToolContext) -> ToolResult<Value> {
    ctx.on_main_thread(|_, registry| {
        let instances: Vec<_> = registry.list_instances().collect();
        Ok(text_content(&json!({
            "count": instances.len(),
            "instances": instances,
        })))
    })
}
