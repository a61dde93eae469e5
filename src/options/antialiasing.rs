use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Temporal anti-aliasing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Temporal AA", inline)]
#[serde(default)]
pub struct TemporalAaOptions {
    /// History weight when the pixel moves fast.
    #[schemars(title = "Feedback Min", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub feedback_min: f32,
    /// History weight when the pixel is static.
    #[schemars(title = "Feedback Max", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub feedback_max: f32,
    /// Sharpening of the blended result.
    #[schemars(title = "Sharpness", range(min = 0.0, max = 2.0), extend("step" = 0.05))]
    pub sharpness: f32,
    /// Number of Halton samples before the jitter repeats.
    #[schemars(skip)]
    pub jitter_sequence_length: u32,
}

impl Default for TemporalAaOptions {
    fn default() -> Self {
        Self {
            feedback_min: 0.88,
            feedback_max: 0.97,
            sharpness: 0.25,
            jitter_sequence_length: 8,
        }
    }
}

/// FXAA settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "FXAA", inline)]
#[serde(default)]
pub struct FxaaOptions {
    /// Minimum local contrast, relative to the brightest neighbor.
    #[schemars(title = "Edge Threshold", range(min = 0.063, max = 0.333), extend("step" = 0.001))]
    pub edge_threshold: f32,
    /// Absolute contrast floor; darker edges are left alone.
    #[schemars(title = "Edge Threshold Min", range(min = 0.0312, max = 0.0833), extend("step" = 0.001))]
    pub edge_threshold_min: f32,
    /// How much subpixel aliasing is smoothed.
    #[schemars(title = "Subpixel", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub subpixel: f32,
}

impl Default for FxaaOptions {
    fn default() -> Self {
        Self {
            edge_threshold: 0.166,
            edge_threshold_min: 0.0833,
            subpixel: 0.75,
        }
    }
}
