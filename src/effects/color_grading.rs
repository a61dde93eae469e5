//! White balance, color filter, contrast, lift/gamma/gain, saturation and
//! tonemapping, evaluated in that order on linear HDR color.

use super::tonemapping::{self, CustomCurve};
use super::uber::UberParams;
use super::{EffectFrame, UberEffect};
use crate::options::{ColorGradingOptions, Options, Tonemapper};
use crate::postprocess::variants::UberFeature;

/// Rec. 709 luminance weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Middle grey that contrast pivots around.
const MID_GREY: f32 = 0.18;

const NEUTRAL_TRACKBALL: [f32; 4] = [1.0, 1.0, 1.0, 0.0];

const LIN_TO_LMS: [[f32; 3]; 3] = [
    [3.904_05e-1, 5.499_41e-1, 8.926_32e-3],
    [7.084_16e-2, 9.631_72e-1, 1.357_75e-3],
    [2.310_82e-2, 1.280_21e-1, 9.362_45e-1],
];

const LMS_TO_LIN: [[f32; 3]; 3] = [
    [2.858_47, -1.628_79, -2.489_10e-2],
    [-2.101_82e-1, 1.158_20, 3.242_81e-4],
    [-4.181_20e-2, -1.181_69e-1, 1.068_67],
];

fn mul3(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    m.map(|row| row[0] * v[0] + row[1] * v[1] + row[2] * v[2])
}

/// Luminance of a linear Rec. 709 color.
#[must_use]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMA_WEIGHTS[0] + rgb[1] * LUMA_WEIGHTS[1] + rgb[2] * LUMA_WEIGHTS[2]
}

fn cie_xy_to_lms(x: f32, y: f32) -> [f32; 3] {
    let big_y = 1.0;
    let big_x = big_y * x / y;
    let big_z = big_y * (1.0 - x - y) / y;
    [
        0.7328 * big_x + 0.4296 * big_y - 0.1624 * big_z,
        -0.7036 * big_x + 1.6975 * big_y + 0.0061 * big_z,
        0.0030 * big_x + 0.0136 * big_y + 0.9834 * big_z,
    ]
}

/// Per-channel LMS scale that shifts the D65 white point by `temperature`
/// and `tint` (both in -100..100).
#[must_use]
pub fn white_balance_coefficients(temperature: f32, tint: f32) -> [f32; 3] {
    let t1 = temperature / 65.0;
    let t2 = tint / 65.0;
    // 0.31271 is the x chromaticity of D65.
    let x = 0.31271 - t1 * if t1 < 0.0 { 0.1 } else { 0.05 };
    let y = 2.87 * x - 3.0 * x * x - 0.275_095_07 + t2 * 0.05;
    let d65 = [0.949_237, 1.035_42, 1.087_28];
    let target = cie_xy_to_lms(x, y);
    [d65[0] / target[0], d65[1] / target[1], d65[2] / target[2]]
}

fn trackball_chroma(color: [f32; 4]) -> [f32; 3] {
    let rgb = [color[0], color[1], color[2]];
    let luma = luminance(rgb);
    rgb.map(|c| c - luma)
}

/// Additive shadow offset.
#[must_use]
pub fn lift(color: [f32; 4]) -> [f32; 3] {
    let scaled = color.map(|c| c * 0.2);
    trackball_chroma(scaled).map(|c| c + scaled[3])
}

/// Per-channel inverse gamma.
#[must_use]
pub fn inverse_gamma(color: [f32; 4]) -> [f32; 3] {
    let scaled = color.map(|c| c * 0.8);
    trackball_chroma(scaled).map(|c| 1.0 / (c + scaled[3] + 1.0).max(1e-3))
}

/// Per-channel multiplier.
#[must_use]
pub fn gain(color: [f32; 4]) -> [f32; 3] {
    let scaled = color.map(|c| c * 0.8);
    trackball_chroma(scaled).map(|c| c + scaled[3] + 1.0)
}

/// Color grading section of the uber pass.
pub struct ColorGrading;

impl ColorGrading {
    /// Whether any grading control differs from identity.
    #[must_use]
    pub fn is_identity(options: &ColorGradingOptions) -> bool {
        options.tonemapper == Tonemapper::None
            && options.post_exposure == 0.0
            && options.temperature == 0.0
            && options.tint == 0.0
            && options.color_filter == [1.0, 1.0, 1.0]
            && options.contrast == 0.0
            && options.saturation == 0.0
            && options.lift == NEUTRAL_TRACKBALL
            && options.gamma == NEUTRAL_TRACKBALL
            && options.gain == NEUTRAL_TRACKBALL
    }
}

impl UberEffect for ColorGrading {
    const FEATURE: UberFeature = UberFeature::ColorGrading;

    fn is_active(options: &Options) -> bool {
        !Self::is_identity(&options.color_grading)
    }

    fn write_params(frame: &EffectFrame<'_>, params: &mut UberParams) {
        let grading = &frame.options.color_grading;
        let [l, m, s] =
            white_balance_coefficients(grading.temperature, grading.tint);
        params.lms_balance = [l, m, s, 0.0];
        let [r, g, b] = grading.color_filter;
        params.color_filter = [r, g, b, grading.post_exposure.exp2()];
        params.grading = [
            grading.contrast / 100.0 + 1.0,
            grading.saturation / 100.0 + 1.0,
            0.0,
            0.0,
        ];
        let extend = |v: [f32; 3]| [v[0], v[1], v[2], 0.0];
        params.lift = extend(lift(grading.lift));
        params.gamma = extend(inverse_gamma(grading.gamma));
        params.gain = extend(gain(grading.gain));
        params.modes[0] = tonemapping::tonemapper_id(grading.tonemapper);
        if grading.tonemapper == Tonemapper::Custom {
            params.curve = CustomCurve::new(&grading.curve).packed();
        }
    }
}

/// Grade one linear color with baked parameters.
#[must_use]
pub fn apply(params: &UberParams, rgb: [f32; 3]) -> [f32; 3] {
    let mut c = rgb.map(|v| v * params.color_filter[3]);

    let lms = mul3(&LIN_TO_LMS, c);
    c = mul3(
        &LMS_TO_LIN,
        [
            lms[0] * params.lms_balance[0],
            lms[1] * params.lms_balance[1],
            lms[2] * params.lms_balance[2],
        ],
    );

    let contrast = params.grading[0];
    if contrast != 1.0 {
        let pivot = MID_GREY.log2();
        c = c.map(|v| ((v.max(1e-6).log2() - pivot) * contrast + pivot).exp2());
    }

    for (i, v) in c.iter_mut().enumerate() {
        *v *= params.color_filter[i];
        let lifted = *v * params.gain[i] + params.lift[i];
        *v = lifted.signum() * lifted.abs().powf(params.gamma[i]);
    }

    let luma = luminance(c);
    let saturation = params.grading[1];
    c = c.map(|v| luma + saturation * (v - luma));

    tonemapping::apply(params.modes[0], &params.curve, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baked(options: &Options) -> UberParams {
        let frame = EffectFrame::new(options, 4, 4);
        let mut params = UberParams::for_screen(4, 4);
        ColorGrading::write_params(&frame, &mut params);
        params
    }

    fn close(a: [f32; 3], b: [f32; 3], eps: f32) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < eps)
    }

    #[test]
    fn default_options_are_inactive() {
        assert!(!ColorGrading::is_active(&Options::default()));
        let mut options = Options::default();
        options.color_grading.saturation = 10.0;
        assert!(ColorGrading::is_active(&options));
    }

    #[test]
    fn neutral_white_balance_is_identity() {
        let coeffs = white_balance_coefficients(0.0, 0.0);
        assert!(close(coeffs, [1.0, 1.0, 1.0], 1e-2), "{coeffs:?}");
    }

    #[test]
    fn warm_temperature_boosts_long_wavelengths() {
        let [l, _, s] = white_balance_coefficients(50.0, 0.0);
        assert!(l > s);
    }

    #[test]
    fn neutral_trackballs_map_to_identity() {
        assert!(close(lift(NEUTRAL_TRACKBALL), [0.0; 3], 1e-6));
        assert!(close(inverse_gamma(NEUTRAL_TRACKBALL), [1.0; 3], 1e-6));
        assert!(close(gain(NEUTRAL_TRACKBALL), [1.0; 3], 1e-6));
    }

    #[test]
    fn identity_grading_is_near_passthrough() {
        // Activate the effect with an operator that changes nothing.
        let mut options = Options::default();
        options.color_grading.post_exposure = 0.0;
        let params = baked(&options);
        let out = apply(&params, [0.5, 0.25, 0.1]);
        assert!(close(out, [0.5, 0.25, 0.1], 1e-2), "{out:?}");
    }

    #[test]
    fn zero_saturation_yields_grey() {
        let mut options = Options::default();
        options.color_grading.saturation = -100.0;
        let out = apply(&baked(&options), [0.8, 0.2, 0.1]);
        assert!((out[0] - out[1]).abs() < 1e-4);
        assert!((out[1] - out[2]).abs() < 1e-4);
    }

    #[test]
    fn post_exposure_doubles_per_stop() {
        let mut options = Options::default();
        options.color_grading.post_exposure = 1.0;
        let out = apply(&baked(&options), [0.1, 0.1, 0.1]);
        assert!(close(out, [0.2, 0.2, 0.2], 5e-3), "{out:?}");
    }

    #[test]
    fn custom_curve_is_baked_only_when_selected() {
        let mut options = Options::default();
        options.color_grading.tonemapper = Tonemapper::Aces;
        assert_eq!(baked(&options).curve, [[0.0; 4]; 7]);
        options.color_grading.tonemapper = Tonemapper::Custom;
        let params = baked(&options);
        assert_eq!(params.modes[0], 3);
        assert!(params.curve[0][0] > 0.0);
    }
}
