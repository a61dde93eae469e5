use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the exposure value is produced each frame.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMode {
    /// Constant EV100 from `fixed_ev100`.
    #[default]
    Fixed,
    /// Metered from scene luminance with temporal adaptation.
    Automatic,
    /// Derived from the camera's aperture, shutter speed and ISO.
    UsePhysicalCamera,
}

/// How fast automatic exposure converges.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationMode {
    /// Jump straight to the metered value.
    Fixed,
    /// Approach the metered value exponentially.
    #[default]
    Progressive,
}

/// Exposure settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Exposure", inline)]
#[serde(default)]
pub struct ExposureOptions {
    /// How the EV100 is produced.
    #[schemars(title = "Mode")]
    pub mode: ExposureMode,
    /// EV100 used by [`ExposureMode::Fixed`].
    #[schemars(title = "Fixed EV100", range(min = -10.0, max = 20.0), extend("step" = 0.1))]
    pub fixed_ev100: f32,
    /// EV offset applied to metered exposure.
    #[schemars(title = "Compensation", range(min = -5.0, max = 5.0), extend("step" = 0.1))]
    pub compensation: f32,
    /// Lowest EV100 automatic exposure may reach.
    #[schemars(title = "Limit Min", range(min = -10.0, max = 20.0), extend("step" = 0.5))]
    pub limit_min: f32,
    /// Highest EV100 automatic exposure may reach.
    #[schemars(title = "Limit Max", range(min = -10.0, max = 20.0), extend("step" = 0.5))]
    pub limit_max: f32,
    /// Convergence behavior of automatic exposure.
    #[schemars(title = "Adaptation")]
    pub adaptation: AdaptationMode,
    /// Adaptation speed toward brighter scenes.
    #[schemars(title = "Dark To Light Speed", range(min = 0.001, max = 10.0), extend("step" = 0.1))]
    pub speed_dark_to_light: f32,
    /// Adaptation speed toward darker scenes.
    #[schemars(title = "Light To Dark Speed", range(min = 0.001, max = 10.0), extend("step" = 0.1))]
    pub speed_light_to_dark: f32,
}

impl Default for ExposureOptions {
    fn default() -> Self {
        Self {
            mode: ExposureMode::Fixed,
            fixed_ev100: 0.0,
            compensation: 0.0,
            limit_min: -1.0,
            limit_max: 14.0,
            adaptation: AdaptationMode::Progressive,
            speed_dark_to_light: 3.0,
            speed_light_to_dark: 1.0,
        }
    }
}
