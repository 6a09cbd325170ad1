//! # Core Module
//!
//! Shared configuration for the update and render sides of the pipeline.

pub mod config;

pub use config::{
    Config,
    ConfigError,
    ConfigFormat,
    CoreConfig,
    LoggingConfig,
    RenderConfig,
    UpdateConfig,
};
