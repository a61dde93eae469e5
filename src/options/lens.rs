use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lens distortion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Lens Distortion", inline)]
#[serde(default)]
pub struct LensDistortionOptions {
    /// Negative values give pincushion, positive barrel distortion.
    #[schemars(title = "Intensity", range(min = -1.0, max = 1.0), extend("step" = 0.01))]
    pub intensity: f32,
    /// Horizontal distortion weight.
    #[schemars(title = "X Multiplier", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub x_multiplier: f32,
    /// Vertical distortion weight.
    #[schemars(title = "Y Multiplier", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub y_multiplier: f32,
    /// Distortion center in UV space.
    #[schemars(skip)]
    pub center: [f32; 2],
    /// Zoom applied after distorting.
    #[schemars(title = "Scale", range(min = 0.01, max = 5.0), extend("step" = 0.01))]
    pub scale: f32,
}

impl Default for LensDistortionOptions {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            x_multiplier: 1.0,
            y_multiplier: 1.0,
            center: [0.5, 0.5],
            scale: 1.0,
        }
    }
}

/// Chromatic aberration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Chromatic Aberration", inline)]
#[serde(default)]
pub struct ChromaticAberrationOptions {
    /// Aberration strength.
    #[schemars(title = "Intensity", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub intensity: f32,
    /// Samples taken along the aberration vector.
    #[schemars(title = "Max Samples", range(min = 3, max = 24))]
    pub max_samples: u32,
}

impl Default for ChromaticAberrationOptions {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            max_samples: 6,
        }
    }
}

/// Vignette settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Vignette", inline)]
#[serde(default)]
pub struct VignetteOptions {
    /// Darkening strength.
    #[schemars(title = "Intensity", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub intensity: f32,
    /// Falloff width.
    #[schemars(title = "Smoothness", range(min = 0.01, max = 1.0), extend("step" = 0.01))]
    pub smoothness: f32,
    /// 1 is round, lower values are more square.
    #[schemars(title = "Roundness", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub roundness: f32,
    /// Keep the vignette circular regardless of aspect ratio.
    #[schemars(title = "Rounded")]
    pub rounded: bool,
    /// Vignette center in UV space.
    #[schemars(skip)]
    pub center: [f32; 2],
    /// Color blended into the vignetted area.
    #[schemars(skip)]
    pub color: [f32; 3],
}

impl Default for VignetteOptions {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            smoothness: 0.2,
            roundness: 1.0,
            rounded: false,
            center: [0.5, 0.5],
            color: [0.0, 0.0, 0.0],
        }
    }
}
