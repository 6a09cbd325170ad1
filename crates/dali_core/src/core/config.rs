//! # Core Configuration
//!
//! Configuration for the update thread, the render thread and logging. All
//! structures serialize to TOML or RON through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Update Config**: frame pacing, culling and render list housekeeping
//! - **Render Config**: background colour, depth testing, default viewport
//! - **Logging Config**: default log level for binaries

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};
use crate::foundation::math::{Vec4, Viewport};

/// # Update Configuration
///
/// Controls the update thread: how often it runs, whether renderables are
/// culled against the camera frustum, and how often render lists give back
/// their unused items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Target interval between update passes in milliseconds
    pub frame_interval_ms: u64,
    /// Cull renderables that fall outside clip space
    pub enable_culling: bool,
    /// Frames between `RenderList::release_unused_items` passes (0 disables)
    pub release_unused_items_interval: u32,
    /// Seconds to keep producing frames after the scene goes idle
    pub keep_rendering_seconds: f32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            enable_culling: true,
            release_unused_items_interval: 60,
            keep_rendering_seconds: 0.0,
        }
    }
}

impl UpdateConfig {
    /// Set the frame interval
    pub fn with_frame_interval_ms(mut self, interval: u64) -> Self {
        self.frame_interval_ms = interval;
        self
    }

    /// Enable or disable culling
    pub fn with_culling(mut self, enabled: bool) -> Self {
        self.enable_culling = enabled;
        self
    }

    /// Set the housekeeping interval
    pub fn with_release_unused_items_interval(mut self, frames: u32) -> Self {
        self.release_unused_items_interval = frames;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("frame_interval_ms must be > 0".to_string()));
        }
        if self.keep_rendering_seconds < 0.0 {
            return Err(ConfigError::Invalid("keep_rendering_seconds must be >= 0".to_string()));
        }
        Ok(())
    }
}

/// # Render Configuration
///
/// Settings consumed by the render thread and by the default render task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Clear colour of the default render task (RGBA)
    pub background_color: [f32; 4],
    /// Master switch for depth testing of opaque lists
    pub depth_test_enabled: bool,
    /// Viewport of the default render task
    pub default_viewport: Viewport,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background_color: [0.0, 0.0, 0.0, 1.0],
            depth_test_enabled: true,
            default_viewport: Viewport::new(0, 0, 480, 800),
        }
    }
}

impl RenderConfig {
    /// Set the background colour
    pub fn with_background_color(mut self, color: [f32; 4]) -> Self {
        self.background_color = color;
        self
    }

    /// Set the default viewport
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.default_viewport = viewport;
        self
    }

    /// Background colour as a vector
    pub fn background(&self) -> Vec4 {
        Vec4::from(self.background_color)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_viewport.is_empty() {
            return Err(ConfigError::Invalid("default viewport is empty".to_string()));
        }
        if self.background_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid("background colour components must be in [0, 1]".to_string()));
        }
        Ok(())
    }
}

/// # Logging Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// # Core Configuration
///
/// Top level configuration handed to `Core::new` and `ThreadedPipeline::start`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Update thread settings
    pub update: UpdateConfig,
    /// Render thread settings
    pub render: RenderConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config for CoreConfig {}

impl CoreConfig {
    /// Replace the update settings
    pub fn with_update(mut self, update: UpdateConfig) -> Self {
        self.update = update;
        self
    }

    /// Replace the render settings
    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.update.validate()?;
        self.render.validate()?;
        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.logging.level)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoreConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = CoreConfig::default().with_update(UpdateConfig::default().with_frame_interval_ms(0));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = CoreConfig::default().with_log_level("loud");
        assert!(config.validate().is_err());

        let config = CoreConfig::default()
            .with_render(RenderConfig::default().with_viewport(Viewport::new(0, 0, 0, 0)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_partial_config_uses_defaults() {
        let text = "[update]\nenable_culling = false\n\n[logging]\nlevel = \"debug\"\n";
        let config = CoreConfig::parse(text, ConfigFormat::Toml).unwrap();
        assert!(!config.update.enable_culling);
        assert_eq!(config.update.frame_interval_ms, 16);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_ron_config_parses() {
        let text = "(update: (frame_interval_ms: 33), render: (background_color: (0.5, 0.5, 0.5, 1.0)))";
        let config = CoreConfig::parse(text, ConfigFormat::Ron).unwrap();
        assert_eq!(config.update.frame_interval_ms, 33);
        assert_eq!(config.render.background_color[0], 0.5);
    }

    #[test]
    fn test_toml_output_parses_back() {
        let config = CoreConfig::default().with_log_level("trace");
        let text = config.to_text(ConfigFormat::Toml).unwrap();
        assert_eq!(CoreConfig::parse(&text, ConfigFormat::Toml).unwrap(), config);
    }

    #[test]
    fn test_unknown_extension() {
        let result = CoreConfig::load_from_file("core.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
