//! Infrastructure layer module
//!
//! This module contains the adapters and ambient services:
//! - HTTP client for the host-resident status agent
//! - In-memory cluster adapters (simulator and tests)
//! - Configuration management
//! - Logging infrastructure
//!
//! Adapters satisfy the port traits defined in the domain layer.

pub mod agent;
pub mod config;
pub mod logging;
pub mod memory;
