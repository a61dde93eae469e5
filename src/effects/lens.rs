//! Lens distortion, chromatic aberration and vignette: the screen-space
//! sections of the uber pass.

use super::uber::UberParams;
use super::{EffectFrame, UberEffect};
use crate::options::Options;
use crate::postprocess::variants::UberFeature;

/// Spectral LUT used when no custom one is provided: pure R, G, B.
pub const DEFAULT_SPECTRAL_LUT: [[f32; 4]; 3] = [
    [1.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
];

/// Barrel / pincushion distortion.
pub struct LensDistortion;

impl UberEffect for LensDistortion {
    const FEATURE: UberFeature = UberFeature::LensDistortion;

    fn is_active(options: &Options) -> bool {
        options.lens_distortion.intensity.abs() > 0.0
    }

    fn write_params(frame: &EffectFrame<'_>, params: &mut UberParams) {
        let lens = &frame.options.lens_distortion;
        let amount = 1.6 * (lens.intensity * 100.0).abs().max(1.0);
        let theta = amount.min(160.0).to_radians();
        let sigma = 2.0 * (theta * 0.5).tan();
        params.distortion_center = [
            lens.center[0] * 2.0 - 1.0,
            lens.center[1] * 2.0 - 1.0,
            lens.x_multiplier.max(1e-4),
            lens.y_multiplier.max(1e-4),
        ];
        params.distortion_amount = [
            if lens.intensity >= 0.0 { theta } else { 1.0 / theta },
            sigma,
            1.0 / lens.scale.max(1e-4),
            lens.intensity * 100.0,
        ];
    }
}

/// Remap `uv` through the lens model. Identity when the variant has no
/// distortion compiled in.
#[must_use]
pub fn distort_uv(params: &UberParams, enabled: bool, uv: [f32; 2]) -> [f32; 2] {
    if !enabled {
        return uv;
    }
    let c = params.distortion_center;
    let d = params.distortion_amount;
    let uv = [(uv[0] - 0.5) * d[2] + 0.5, (uv[1] - 0.5) * d[2] + 0.5];
    let ruv = [
        c[2] * (uv[0] - 0.5 - c[0] * 0.5),
        c[3] * (uv[1] - 0.5 - c[1] * 0.5),
    ];
    let ru = ruv[0].hypot(ruv[1]);
    if ru < 1e-6 {
        return uv;
    }
    let factor = if d[3] > 0.0 {
        (ru * d[0]).tan() / (ru * d[1])
    } else {
        (1.0 / ru) * d[0] * (ru * d[1]).atan()
    };
    [uv[0] + ruv[0] * (factor - 1.0), uv[1] + ruv[1] * (factor - 1.0)]
}

/// Lateral color fringing sampled through a spectral LUT.
pub struct ChromaticAberration;

impl UberEffect for ChromaticAberration {
    const FEATURE: UberFeature = UberFeature::ChromaticAberration;

    fn is_active(options: &Options) -> bool {
        options.chromatic_aberration.intensity > 0.0
    }

    fn write_params(frame: &EffectFrame<'_>, params: &mut UberParams) {
        let ca = &frame.options.chromatic_aberration;
        params.chromatic = [
            ca.intensity * 0.05,
            ca.max_samples.max(3) as f32,
            frame.spectral_lut_width.max(1) as f32,
            0.0,
        ];
    }
}

/// End point of the aberration vector for `uv`.
#[must_use]
pub fn aberration_end(params: &UberParams, uv: [f32; 2]) -> [f32; 2] {
    let coords = [2.0 * uv[0] - 1.0, 2.0 * uv[1] - 1.0];
    let len2 = coords[0] * coords[0] + coords[1] * coords[1];
    let amount = params.chromatic[0];
    [uv[0] - coords[0] * len2 * amount, uv[1] - coords[1] * len2 * amount]
}

/// Number of taps along `diff` (UV units): one per two pixels, between 3
/// and the configured maximum.
#[must_use]
pub fn aberration_samples(params: &UberParams, diff: [f32; 2]) -> u32 {
    let px = [diff[0] * params.screen[0], diff[1] * params.screen[1]];
    let wanted = (px[0].hypot(px[1]) / 2.0) as u32;
    let max = (params.chromatic[1] as u32).max(3);
    wanted.clamp(3, max)
}

/// Screen-edge darkening.
pub struct Vignette;

impl UberEffect for Vignette {
    const FEATURE: UberFeature = UberFeature::Vignette;

    fn is_active(options: &Options) -> bool {
        options.vignette.intensity > 0.0
    }

    fn write_params(frame: &EffectFrame<'_>, params: &mut UberParams) {
        let v = &frame.options.vignette;
        let roundness = (1.0 - v.roundness) * 6.0 + v.roundness;
        params.vignette_color = [v.color[0], v.color[1], v.color[2], 1.0];
        params.vignette_center = [v.center[0], v.center[1], 0.0, 0.0];
        params.vignette_settings = [
            v.intensity * 3.0,
            v.smoothness * 5.0,
            roundness,
            if v.rounded { 1.0 } else { 0.0 },
        ];
    }
}

/// Darken `rgb` at `uv` towards the vignette color.
#[must_use]
pub fn vignette(params: &UberParams, uv: [f32; 2], rgb: [f32; 3]) -> [f32; 3] {
    let s = params.vignette_settings;
    let center = params.vignette_center;
    let mut d = [(uv[0] - center[0]).abs() * s[0], (uv[1] - center[1]).abs() * s[0]];
    let aspect = params.screen[0] / params.screen[1];
    d[0] *= 1.0 + (aspect - 1.0) * s[3];
    let d = d.map(|v| v.clamp(0.0, 1.0).powf(s[2]));
    let factor = (1.0 - (d[0] * d[0] + d[1] * d[1])).clamp(0.0, 1.0).powf(s[1]);
    let color = params.vignette_color;
    [
        rgb[0] * (color[0] + (1.0 - color[0]) * factor),
        rgb[1] * (color[1] + (1.0 - color[1]) * factor),
        rgb[2] * (color[2] + (1.0 - color[2]) * factor),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baked<E: UberEffect>(options: &Options) -> UberParams {
        let frame = EffectFrame::new(options, 64, 32);
        let mut params = UberParams::for_screen(64, 32);
        E::write_params(&frame, &mut params);
        params
    }

    #[test]
    fn defaults_are_inactive() {
        let options = Options::default();
        assert!(!LensDistortion::is_active(&options));
        assert!(!ChromaticAberration::is_active(&options));
        assert!(!Vignette::is_active(&options));
    }

    #[test]
    fn negative_lens_intensity_is_active_and_inverts_theta() {
        let mut options = Options::default();
        options.lens_distortion.intensity = -0.5;
        assert!(LensDistortion::is_active(&options));
        let params = baked::<LensDistortion>(&options);
        let theta = (1.6f32 * 50.0).to_radians();
        assert!((params.distortion_amount[0] - 1.0 / theta).abs() < 1e-5);
        assert_eq!(params.distortion_amount[3], -50.0);
    }

    #[test]
    fn distortion_leaves_center_fixed() {
        let mut options = Options::default();
        options.lens_distortion.intensity = 0.4;
        let params = baked::<LensDistortion>(&options);
        let center = distort_uv(&params, true, [0.5, 0.5]);
        assert!((center[0] - 0.5).abs() < 1e-6);
        assert!((center[1] - 0.5).abs() < 1e-6);
        assert_eq!(distort_uv(&params, false, [0.1, 0.9]), [0.1, 0.9]);
    }

    #[test]
    fn barrel_and_pincushion_move_corners_in_opposite_directions() {
        let mut options = Options::default();
        options.lens_distortion.intensity = 0.5;
        let barrel = distort_uv(&baked::<LensDistortion>(&options), true, [0.9, 0.9]);
        options.lens_distortion.intensity = -0.5;
        let pincushion =
            distort_uv(&baked::<LensDistortion>(&options), true, [0.9, 0.9]);
        assert!(barrel[0] > 0.9);
        assert!(pincushion[0] < 0.9);
    }

    #[test]
    fn aberration_samples_are_clamped() {
        let mut options = Options::default();
        options.chromatic_aberration.intensity = 1.0;
        options.chromatic_aberration.max_samples = 8;
        let mut params = baked::<ChromaticAberration>(&options);
        assert_eq!(params.chromatic[2], 3.0);
        params.screen = UberParams::for_screen(1024, 512).screen;
        let corner = [0.0, 0.0];
        let end = aberration_end(&params, corner);
        let diff = [end[0] - corner[0], end[1] - corner[1]];
        assert_eq!(aberration_samples(&params, diff), 8);
        assert_eq!(aberration_samples(&params, [0.0, 0.0]), 3);
    }

    #[test]
    fn vignette_darkens_edges_not_center() {
        let mut options = Options::default();
        options.vignette.intensity = 0.6;
        let params = baked::<Vignette>(&options);
        let center = vignette(&params, [0.5, 0.5], [1.0, 1.0, 1.0]);
        let corner = vignette(&params, [0.0, 0.0], [1.0, 1.0, 1.0]);
        assert_eq!(center, [1.0, 1.0, 1.0]);
        assert!(corner[0] < 0.5);
    }
}
