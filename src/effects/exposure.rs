//! Exposure value math.
//!
//! Exposure targets hold one texel: `x` = linear multiplier applied to scene
//! color, `y` = the EV100 it was derived from.

use bytemuck::{Pod, Zeroable};

use crate::options::{AdaptationMode, ExposureOptions};
use crate::postprocess::camera::PhysicalCameraSettings;

/// Side of the square tile each coarse luminance texel averages.
pub const LUMINANCE_TILE_SIZE: u32 = 8;

/// Smallest luminance fed to `log2`.
pub const MIN_LUMINANCE: f32 = 1e-5;

/// log2(100 / 12.5): converts average log2 luminance to EV100.
const LOG2_LUMINANCE_TO_EV100: f32 = 3.0;

/// Multiplier for a given EV100 (saturation-based sensitivity, K = 12.5).
#[must_use]
pub fn ev100_to_multiplier(ev100: f32) -> f32 {
    1.0 / (1.2 * ev100.exp2())
}

/// EV100 that yields a multiplier of exactly 1.
#[must_use]
pub fn neutral_ev100() -> f32 {
    -(1.2f32.log2())
}

/// EV100 of a physical camera body.
#[must_use]
pub fn physical_ev100(camera: &PhysicalCameraSettings) -> f32 {
    let aperture = camera.aperture.max(1e-3);
    let shutter = camera.shutter_speed.max(1e-6);
    let iso = camera.iso.max(1.0);
    ((aperture * aperture) / shutter * 100.0 / iso).log2()
}

/// Adapted EV100 one frame (`params.delta_time`) after `previous`.
#[must_use]
pub fn adapt(previous: f32, target: f32, params: &ExposureParams) -> f32 {
    if params.reset != 0 || !previous.is_finite() {
        return target;
    }
    let speed = if target > previous {
        params.speed_dark_to_light
    } else {
        params.speed_light_to_dark
    };
    previous + (target - previous) * (1.0 - (-params.delta_time.max(0.0) * speed).exp())
}

/// Exposure texel for an EV100.
#[must_use]
pub fn exposure_texel(ev100: f32) -> [f32; 4] {
    [ev100_to_multiplier(ev100), ev100, 0.0, 1.0]
}

/// Uniforms of the automatic exposure passes. Layout mirrors
/// `ExposureParams` in the exposure kernels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ExposureParams {
    /// Exposure offset in EV added to the metered value.
    pub compensation: f32,
    /// Lower EV100 clamp.
    pub min_ev: f32,
    /// Upper EV100 clamp.
    pub max_ev: f32,
    /// Adaptation speed when the scene gets brighter.
    pub speed_dark_to_light: f32,
    /// Adaptation speed when the scene gets darker.
    pub speed_light_to_dark: f32,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// Non-zero skips adaptation and snaps to the metered value.
    pub reset: u32,
    /// Edge length in pixels of one luminance tile.
    pub tile_size: u32,
    _pad: [u32; 4],
}

impl ExposureParams {
    /// Uniforms for one frame. Fixed adaptation behaves like a permanent
    /// reset.
    #[must_use]
    pub fn new(options: &ExposureOptions, delta_time: f32, reset: bool) -> Self {
        let (min_ev, max_ev) = if options.limit_min <= options.limit_max {
            (options.limit_min, options.limit_max)
        } else {
            (options.limit_max, options.limit_min)
        };
        let reset = reset || options.adaptation == AdaptationMode::Fixed;
        Self {
            compensation: options.compensation,
            min_ev,
            max_ev,
            speed_dark_to_light: options.speed_dark_to_light.max(1e-3),
            speed_light_to_dark: options.speed_light_to_dark.max(1e-3),
            delta_time,
            reset: u32::from(reset),
            tile_size: LUMINANCE_TILE_SIZE,
            _pad: [0; 4],
        }
    }

    /// Metered EV100 for an average log2 luminance.
    #[must_use]
    pub fn meter(&self, avg_log2_luminance: f32) -> f32 {
        (avg_log2_luminance + LOG2_LUMINANCE_TO_EV100 - self.compensation)
            .clamp(self.min_ev, self.max_ev)
    }
}
