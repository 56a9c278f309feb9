//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Structural validation
//!
//! HA tunables are range-checked later by the config registry, which falls
//! back to defaults instead of failing.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
