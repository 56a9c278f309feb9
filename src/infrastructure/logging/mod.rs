//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Console output as JSON or pretty text, written to stderr
//! - Optional rolling JSON log files through tracing-appender

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
