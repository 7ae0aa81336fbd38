//! Resource Registry
//!
//! Maps client-visible integer ids onto host handles for loaded objects
//! (*assets*) and their live instances, and enforces that an asset outlives
//! every instance created from it.
//!
//! ## Threading
//!
//! The registry does no locking of its own. Every mutation happens inside a
//! job on the pump thread, which is also the only thread allowed to release
//! the handles it owns.
//!
//! ## Identifiers
//!
//! Asset and instance ids are allocated from independent counters that start
//! at 1 and only move forward. [`clear`](ResourceRegistry::clear) releases
//! every handle but keeps the counters, so an id is never handed out twice in
//! the same process.

use std::collections::BTreeMap;

use bridge_traits::handle::{InstanceRef, ObjectRef};
use bridge_traits::host::{DrawPosition, HostApi};
use core_runtime::error::{ToolError, ToolResult};
use core_runtime::logging::strip_path;
use serde::Serialize;
use tracing::{debug, info};

pub type AssetId = i64;
pub type InstanceId = i64;

/// A loaded object owned by the registry.
#[derive(Debug)]
pub struct ManagedAsset {
    object: ObjectRef,
    path: String,
}

impl ManagedAsset {
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A live instance of a [`ManagedAsset`].
#[derive(Debug)]
pub struct ManagedInstance {
    instance: InstanceRef,
    asset_id: AssetId,
    datarefs: Vec<String>,
    auto_shift: bool,
}

impl ManagedInstance {
    pub fn instance(&self) -> &InstanceRef {
        &self.instance
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// Per-instance datarefs, in the order values must be supplied.
    pub fn datarefs(&self) -> &[String] {
        &self.datarefs
    }

    pub fn auto_shift(&self) -> bool {
        self.auto_shift
    }

    /// Check that `count` values match the bound datarefs.
    pub fn check_data_len(&self, count: usize) -> ToolResult<()> {
        let expected = self.datarefs.len();
        if count != expected {
            return Err(ToolError::invalid_params(format!(
                "data size mismatch; expected {} values.",
                expected
            )));
        }
        Ok(())
    }
}

/// Listing entry for a managed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub object_id: AssetId,
    pub path: String,
    pub object_ref: String,
    pub instance_ref_count: usize,
}

/// Listing entry for a managed instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSummary {
    pub instance_id: InstanceId,
    pub object_id: AssetId,
    pub instance_ref: String,
    pub auto_shift: bool,
    pub datarefs: Vec<String>,
}

#[derive(Debug)]
pub struct ResourceRegistry {
    assets: BTreeMap<AssetId, ManagedAsset>,
    instances: BTreeMap<InstanceId, ManagedInstance>,
    next_asset_id: AssetId,
    next_instance_id: InstanceId,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            assets: BTreeMap::new(),
            instances: BTreeMap::new(),
            next_asset_id: 1,
            next_instance_id: 1,
        }
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.instances.is_empty()
    }

    /// Take ownership of a freshly loaded object.
    pub fn create_asset(&mut self, object: ObjectRef, path: impl Into<String>) -> AssetId {
        let id = self.next_asset_id;
        self.next_asset_id += 1;

        let path = path.into();
        debug!(object_id = id, path = strip_path(&path), "Registered object");
        self.assets.insert(id, ManagedAsset { object, path });
        id
    }

    pub fn asset(&self, id: AssetId) -> ToolResult<&ManagedAsset> {
        self.assets
            .get(&id)
            .ok_or_else(|| ToolError::invalid_params("Unknown object_id."))
    }

    /// Unload an asset and return its path.
    ///
    /// # Errors
    ///
    /// `invalid_params` if the id is unknown or an instance still uses it.
    pub fn remove_asset(&mut self, id: AssetId, host: &dyn HostApi) -> ToolResult<String> {
        self.asset(id)?;

        if let Some(blocking) = self.first_instance_of(id) {
            return Err(ToolError::invalid_params(format!(
                "Object is in use by instance_id={}",
                blocking
            )));
        }

        let asset = self
            .assets
            .remove(&id)
            .ok_or_else(|| ToolError::invalid_params("Unknown object_id."))?;
        host.unload_object(asset.object);
        debug!(object_id = id, path = strip_path(&asset.path), "Unloaded object");
        Ok(asset.path)
    }

    /// Instantiate an asset with an ordered list of per-instance datarefs.
    ///
    /// # Errors
    ///
    /// `invalid_params` if the asset id is unknown or the host refuses to
    /// create the instance.
    pub fn create_instance(
        &mut self,
        host: &dyn HostApi,
        asset_id: AssetId,
        datarefs: Vec<String>,
    ) -> ToolResult<InstanceId> {
        let asset = self.asset(asset_id)?;
        let instance = host
            .create_instance(asset.object(), &datarefs)
            .ok_or_else(|| ToolError::invalid_params("Failed to create instance."))?;

        let id = self.next_instance_id;
        self.next_instance_id += 1;

        debug!(
            instance_id = id,
            object_id = asset_id,
            datarefs = datarefs.len(),
            "Created instance"
        );
        self.instances.insert(
            id,
            ManagedInstance {
                instance,
                asset_id,
                datarefs,
                auto_shift: false,
            },
        );
        Ok(id)
    }

    pub fn instance(&self, id: InstanceId) -> ToolResult<&ManagedInstance> {
        self.instances
            .get(&id)
            .ok_or_else(|| ToolError::invalid_params("Unknown instance_id."))
    }

    pub fn remove_instance(&mut self, id: InstanceId, host: &dyn HostApi) -> ToolResult<()> {
        let managed = self
            .instances
            .remove(&id)
            .ok_or_else(|| ToolError::invalid_params("Unknown instance_id."))?;
        host.destroy_instance(managed.instance);
        debug!(instance_id = id, "Destroyed instance");
        Ok(())
    }

    /// Move an instance and write its per-instance data.
    ///
    /// `data` must hold exactly one value per bound dataref.
    pub fn set_position(
        &self,
        id: InstanceId,
        host: &dyn HostApi,
        position: &DrawPosition,
        data: &[f32],
    ) -> ToolResult<()> {
        let managed = self.instance(id)?;
        managed.check_data_len(data.len())?;
        host.instance_set_position(managed.instance(), position, data);
        Ok(())
    }

    /// Enable auto-shift. Idempotent.
    pub fn set_auto_shift(&mut self, id: InstanceId, host: &dyn HostApi) -> ToolResult<()> {
        let managed = self
            .instances
            .get_mut(&id)
            .ok_or_else(|| ToolError::invalid_params("Unknown instance_id."))?;
        host.instance_set_auto_shift(&managed.instance);
        managed.auto_shift = true;
        Ok(())
    }

    /// Instances currently created from `asset_id`.
    pub fn instance_ref_count(&self, asset_id: AssetId) -> usize {
        self.instances
            .values()
            .filter(|instance| instance.asset_id == asset_id)
            .count()
    }

    pub fn list_assets(&self) -> impl Iterator<Item = AssetSummary> + '_ {
        self.assets.iter().map(|(id, asset)| AssetSummary {
            object_id: *id,
            path: asset.path.clone(),
            object_ref: asset.object.display(),
            instance_ref_count: self.instance_ref_count(*id),
        })
    }

    pub fn list_instances(&self) -> impl Iterator<Item = InstanceSummary> + '_ {
        self.instances.iter().map(|(id, managed)| InstanceSummary {
            instance_id: *id,
            object_id: managed.asset_id,
            instance_ref: managed.instance.display(),
            auto_shift: managed.auto_shift,
            datarefs: managed.datarefs.clone(),
        })
    }

    /// Release every instance, then every asset.
    ///
    /// Returns how many of each were released.
    pub fn clear(&mut self, host: &dyn HostApi) -> (usize, usize) {
        let instances = std::mem::take(&mut self.instances);
        let assets = std::mem::take(&mut self.assets);
        let counts = (instances.len(), assets.len());

        for (_, managed) in instances {
            host.destroy_instance(managed.instance);
        }
        for (_, asset) in assets {
            host.unload_object(asset.object);
        }

        if counts != (0, 0) {
            info!(
                instances = counts.0,
                objects = counts.1,
                "Released managed resources"
            );
        }
        counts
    }

    fn first_instance_of(&self, asset_id: AssetId) -> Option<InstanceId> {
        self.instances
            .iter()
            .find(|(_, instance)| instance.asset_id == asset_id)
            .map(|(id, _)| *id)
    }
}
