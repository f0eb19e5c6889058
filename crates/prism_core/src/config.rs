//! Render-mode options, loadable from TOML.
//!
//! ```toml
//! enable_depth_testing = true
//! enable_contribution_testing = true
//! min_contribution_area = 0.0005
//! xray = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-frame render-mode flags and culling thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Depth testing; without it there is no depth-only pre-pass.
    pub enable_depth_testing: bool,
    /// Cull instances whose projected area is below `min_contribution_area`.
    pub enable_contribution_testing: bool,
    /// Contribution threshold, as a fraction of the viewport area.
    pub min_contribution_area: f32,
    /// X-ray ghosting; skips the depth-only pre-pass.
    pub xray: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            enable_depth_testing: true,
            enable_contribution_testing: false,
            min_contribution_area: 0.0,
            xray: false,
        }
    }
}

impl RenderOptions {
    /// Parses options from a TOML document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for a negative or non-finite threshold.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`RenderOptions::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks the contribution threshold.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a negative or non-finite threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_contribution_area.is_finite() || self.min_contribution_area < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_contribution_area must be finite and >= 0, got {}",
                self.min_contribution_area
            )));
        }
        Ok(())
    }

    /// True if the depth-only stream may receive draws this frame.
    #[must_use]
    pub fn depth_prepass_enabled(&self) -> bool {
        self.enable_depth_testing && !self.xray
    }
}
