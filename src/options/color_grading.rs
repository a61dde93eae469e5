use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tonemapping operator applied at the end of color grading.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Tonemapper {
    /// Leave HDR values untouched.
    #[default]
    None,
    /// Hue-preserving neutral curve.
    Neutral,
    /// Filmic ACES approximation.
    Aces,
    /// Piecewise toe / linear / shoulder curve from `curve`.
    Custom,
}

/// Artist parameters of the custom tonemapping curve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Custom Curve", inline)]
#[serde(default)]
pub struct CustomCurveOptions {
    /// Darkening of the toe.
    #[schemars(title = "Toe Strength", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub toe_strength: f32,
    /// Share of the curve taken by the toe.
    #[schemars(title = "Toe Length", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub toe_length: f32,
    /// Compression of the shoulder.
    #[schemars(title = "Shoulder Strength", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub shoulder_strength: f32,
    /// Stops above the linear section covered by the shoulder.
    #[schemars(title = "Shoulder Length", range(min = 0.0, max = 10.0), extend("step" = 0.05))]
    pub shoulder_length: f32,
    /// Overshoot of the shoulder.
    #[schemars(title = "Shoulder Angle", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub shoulder_angle: f32,
    /// Gamma applied to the whole curve.
    #[schemars(title = "Gamma", range(min = 0.001, max = 5.0), extend("step" = 0.01))]
    pub gamma: f32,
}

impl Default for CustomCurveOptions {
    fn default() -> Self {
        Self {
            toe_strength: 0.0,
            toe_length: 0.5,
            shoulder_strength: 0.0,
            shoulder_length: 0.5,
            shoulder_angle: 0.0,
            gamma: 1.0,
        }
    }
}

/// Color grading and tonemapping settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Color Grading", inline)]
#[serde(default)]
pub struct ColorGradingOptions {
    /// Tonemapping operator.
    #[schemars(title = "Tonemapper")]
    pub tonemapper: Tonemapper,
    /// Curve used by [`Tonemapper::Custom`].
    pub curve: CustomCurveOptions,
    /// Exposure offset in EV applied before grading.
    #[schemars(title = "Post Exposure", range(min = -5.0, max = 5.0), extend("step" = 0.1))]
    pub post_exposure: f32,
    /// White balance temperature shift.
    #[schemars(title = "Temperature", range(min = -100.0, max = 100.0), extend("step" = 1.0))]
    pub temperature: f32,
    /// White balance green / magenta shift.
    #[schemars(title = "Tint", range(min = -100.0, max = 100.0), extend("step" = 1.0))]
    pub tint: f32,
    /// Linear rgb multiplier.
    #[schemars(skip)]
    pub color_filter: [f32; 3],
    /// Contrast around mid grey.
    #[schemars(title = "Contrast", range(min = -100.0, max = 100.0), extend("step" = 1.0))]
    pub contrast: f32,
    /// Saturation offset; -100 is greyscale.
    #[schemars(title = "Saturation", range(min = -100.0, max = 100.0), extend("step" = 1.0))]
    pub saturation: f32,
    /// Shadows trackball: rgb tint plus w offset.
    #[schemars(skip)]
    pub lift: [f32; 4],
    /// Midtones trackball: rgb tint plus w offset.
    #[schemars(skip)]
    pub gamma: [f32; 4],
    /// Highlights trackball: rgb tint plus w offset.
    #[schemars(skip)]
    pub gain: [f32; 4],
}

impl Default for ColorGradingOptions {
    fn default() -> Self {
        Self {
            tonemapper: Tonemapper::None,
            curve: CustomCurveOptions::default(),
            post_exposure: 0.0,
            temperature: 0.0,
            tint: 0.0,
            color_filter: [1.0, 1.0, 1.0],
            contrast: 0.0,
            saturation: 0.0,
            lift: [1.0, 1.0, 1.0, 0.0],
            gamma: [1.0, 1.0, 1.0, 0.0],
            gain: [1.0, 1.0, 1.0, 0.0],
        }
    }
}
