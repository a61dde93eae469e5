//! Post-processing settings with TOML preset support.
//!
//! Every effect's tweakable parameters live here. Options serialize to and
//! from TOML so presets can be stored in `assets/presets/` and partially
//! overridden.

mod antialiasing;
mod color_grading;
mod exposure;
mod lens;

use std::path::Path;

pub use antialiasing::{FxaaOptions, TemporalAaOptions};
pub use color_grading::{ColorGradingOptions, CustomCurveOptions, Tonemapper};
pub use exposure::{AdaptationMode, ExposureMode, ExposureOptions};
pub use lens::{
    ChromaticAberrationOptions, LensDistortionOptions, VignetteOptions,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::FrameFxError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[vignette]`) work correctly.
///
/// The default leaves every uber effect inactive and exposure fixed at
/// EV100 0.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Exposure metering and adaptation.
    pub exposure: ExposureOptions,
    /// Temporal anti-aliasing blend parameters.
    pub temporal_aa: TemporalAaOptions,
    /// FXAA edge detection parameters.
    pub fxaa: FxaaOptions,
    /// White balance, grading and tonemapping.
    pub color_grading: ColorGradingOptions,
    /// Barrel / pincushion distortion.
    pub lens_distortion: LensDistortionOptions,
    /// Lateral color fringing.
    pub chromatic_aberration: ChromaticAberrationOptions,
    /// Screen-edge darkening.
    pub vignette: VignetteOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, FrameFxError> {
        let content =
            std::fs::read_to_string(path).map_err(FrameFxError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    pub fn from_toml(content: &str) -> Result<Self, FrameFxError> {
        toml::from_str(content)
            .map_err(|e| FrameFxError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), FrameFxError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FrameFxError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(FrameFxError::Io)?;
        }
        std::fs::write(path, content).map_err(FrameFxError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}
