//! keybus Settings Crate
//!
//! Handles bus and logging configuration loaded from JSON or TOML files.

pub mod config;
pub mod error;

pub use config::{BusSettings, LogFormat, LoggingSettings, Settings};
pub use error::{ConfigError, SettingsError, SettingsResult};
