//! # Core Registry
//!
//! Owns the host handles behind every object and instance a client has
//! created, under stable integer ids.
//!
//! See [`registry`] for the ownership and identifier rules.

pub mod registry;

pub use registry::{
    AssetId, AssetSummary, InstanceId, InstanceSummary, ManagedAsset, ManagedInstance,
    ResourceRegistry,
};
