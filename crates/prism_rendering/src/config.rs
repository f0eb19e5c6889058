//! Pipeline configuration, loadable from TOML.
//!
//! ```toml
//! frame_slots = 3
//! parallel_cameras = true
//! transparent_order = "back_to_front"
//! acquire_timeout_ms = 100
//!
//! [options]
//! enable_contribution_testing = true
//! min_contribution_area = 0.0005
//! ```

use std::path::Path;
use std::time::Duration;

use prism_core::{ConfigError, RenderOptions};
use serde::{Deserialize, Serialize};

/// Draw order of transparent mesh groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparentOrder {
    /// First-appearance order.
    Stable,
    /// Farthest group first; ties keep first-appearance order.
    #[default]
    BackToFront,
}

/// Configuration for a [`crate::CullingPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Render-mode options applied to frames built by the state manager.
    pub options: RenderOptions,
    /// Physical output slots. At least 2.
    pub frame_slots: usize,
    /// Run the two cameras of a stereo frame concurrently.
    pub parallel_cameras: bool,
    /// Transparent group ordering.
    pub transparent_order: TransparentOrder,
    /// How long `run` waits for a free output slot.
    pub acquire_timeout_ms: u64,
    /// Instance count from which culling runs data-parallel.
    pub parallel_threshold: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            options: RenderOptions::default(),
            frame_slots: 3,
            parallel_cameras: true,
            transparent_order: TransparentOrder::BackToFront,
            acquire_timeout_ms: 100,
            parallel_threshold: 4096,
        }
    }
}

impl PipelineConfig {
    /// Parses a configuration. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for unusable values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`PipelineConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks slot count and render options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_slots < 2 {
            return Err(ConfigError::Invalid(format!(
                "frame_slots must be at least 2, got {}",
                self.frame_slots
            )));
        }
        self.options.validate()
    }

    /// Output slot acquisition timeout.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}
