//! Common utilities shared across the workspace.
//!
//! This crate provides:
//! - Store connection configuration loaded from the environment
//! - Configuration error type
//! - Tracing subscriber setup for binaries

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use logging::init_tracing;
