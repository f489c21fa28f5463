//! CLI-specific functionality
//!
//! Argument parsing and configuration discovery for the `dockbridge` binary.

pub mod args;
pub mod config;

pub use args::{Args, Commands, ExecutionMode, Transport};
pub use config::{ConfigDiscovery, ConfigError, ConfigOverrides, ServerConfig};
