//! # Core Runtime Module
//!
//! Foundational infrastructure shared by every bridge crate:
//! - Logging and tracing setup, with host log mirroring
//! - Bridge configuration
//! - The error types that cross crate boundaries, including the
//!   client-visible [`ToolError`]
//!
//! ## Overview
//!
//! This crate contains no simulator logic. It establishes the logging
//! conventions and error vocabulary the executor, registry and service
//! crates build on.

pub mod config;
pub mod error;
pub mod logging;

pub use config::BridgeConfig;
pub use error::{Error, Result, ToolError, ToolErrorKind, ToolResult};
