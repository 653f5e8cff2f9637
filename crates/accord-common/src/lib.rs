//! # accord-common
//!
//! Shared plumbing for the accord workspace: environment-based
//! configuration and tracing setup.

pub mod config;
pub mod telemetry;

pub use config::{AppConfig, ConfigError};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
