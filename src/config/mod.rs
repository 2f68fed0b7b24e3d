//! Configuration management for the range service
//!
//! Configuration comes from defaults, an optional TOML file and environment
//! variables, in that order of precedence; the binary applies CLI overrides
//! last.

pub mod app;

pub use app::{
    validate_config, AppConfig, RangeSettings, ServiceSettings, StorageBackend, StorageSettings,
};
