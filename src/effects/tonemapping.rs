//! Tonemapping operators and the piecewise custom curve.
//!
//! The custom curve is built from artist-facing toe/shoulder controls into a
//! toe, a linear section and a shoulder, each of the form
//! `exp(ln_a + b * ln((x - offset_x) * scale_x)) * scale_y + offset_y`.
//! It is normalized so that the white point maps to 1.

use crate::options::{CustomCurveOptions, Tonemapper};

/// Id passed to kernels in `UberParams::modes.x`.
#[must_use]
pub const fn tonemapper_id(tonemapper: Tonemapper) -> u32 {
    match tonemapper {
        Tonemapper::None => 0,
        Tonemapper::Neutral => 1,
        Tonemapper::Aces => 2,
        Tonemapper::Custom => 3,
    }
}

fn neutral_curve(x: f32) -> f32 {
    const A: f32 = 0.2;
    const B: f32 = 0.29;
    const C: f32 = 0.24;
    const D: f32 = 0.272;
    const E: f32 = 0.02;
    const F: f32 = 0.3;
    ((x * (A * x + C * B) + D * E) / (x * (A * x + B) + D * F)) - E / F
}

/// Hue-preserving neutral tonemap with white level 5.3.
#[must_use]
pub fn neutral(rgb: [f32; 3]) -> [f32; 3] {
    const WHITE_LEVEL: f32 = 5.3;
    let white_scale = 1.0 / neutral_curve(WHITE_LEVEL);
    rgb.map(|c| neutral_curve(c * white_scale) * white_scale)
}

/// Narkowicz fit of the ACES filmic curve.
#[must_use]
pub fn aces(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(|x| {
        let x = x.max(0.0);
        ((x * (2.51 * x + 0.03)) / (x * (2.43 * x + 0.59) + 0.14)).clamp(0.0, 1.0)
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    offset_x: f32,
    offset_y: f32,
    scale_x: f32,
    scale_y: f32,
    ln_a: f32,
    b: f32,
}

impl Segment {
    const IDENTITY: Self = Self {
        offset_x: 0.0,
        offset_y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        ln_a: 0.0,
        b: 1.0,
    };

    fn eval(&self, x: f32) -> f32 {
        eval_segment(
            [self.offset_x, self.offset_y, self.scale_x, self.scale_y],
            [self.ln_a, self.b, 0.0, 0.0],
            x,
        )
    }

    const fn packed(&self) -> [[f32; 4]; 2] {
        [
            [self.offset_x, self.offset_y, self.scale_x, self.scale_y],
            [self.ln_a, self.b, 0.0, 0.0],
        ]
    }
}

fn eval_segment(a: [f32; 4], b: [f32; 4], x: f32) -> f32 {
    let x0 = (x - a[0]) * a[2];
    // log(0) is undefined; the segment evaluates to 0 there.
    let y0 = if x0 > 0.0 { (b[0] + b[1] * x0.ln()).exp() } else { 0.0 };
    y0 * a[3] + a[1]
}

/// Solve `f(x) = exp(ln_a + b ln x)` with `f(x0) = y0` and `f'(x0) = m`.
fn solve_ab(x0: f32, y0: f32, m: f32) -> (f32, f32) {
    let b = (m * x0) / y0;
    let ln_a = y0.ln() - b * x0.ln();
    (ln_a, b)
}

fn slope_intercept(x0: f32, x1: f32, y0: f32, y1: f32) -> (f32, f32) {
    let dx = x1 - x0;
    let m = if dx == 0.0 { 1.0 } else { (y1 - y0) / dx };
    (m, y0 - x0 * m)
}

/// Derivative of `(m x + b)^g`.
fn linear_gamma_derivative(m: f32, b: f32, g: f32, x: f32) -> f32 {
    g * m * (m * x + b).powf(g - 1.0)
}

/// Baked custom tonemapping curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomCurve {
    white_point: f32,
    x0: f32,
    x1: f32,
    segments: [Segment; 3],
}

impl CustomCurve {
    /// Build the curve from artist parameters. Out-of-range inputs are
    /// clamped to the domain where the construction is well defined.
    #[must_use]
    pub fn new(options: &CustomCurveOptions) -> Self {
        const PERCEPTUAL_GAMMA: f32 = 2.2;

        let toe_length = options.toe_length.clamp(0.0, 1.0).powf(PERCEPTUAL_GAMMA);
        let toe_strength = options.toe_strength.clamp(0.0, 1.0);
        let shoulder_angle = options.shoulder_angle.clamp(0.0, 1.0);
        let shoulder_strength = options.shoulder_strength.clamp(1e-5, 1.0 - 1e-5);
        let shoulder_length = options.shoulder_length.max(0.0);
        let gamma = options.gamma.max(1e-5);

        // Toe goes from 0 to 0.5.
        let x0 = toe_length * 0.5;
        let y0 = (1.0 - toe_strength) * x0;
        let remaining_y = 1.0 - y0;
        let initial_w = x0 + remaining_y;
        let y1_offset = (1.0 - shoulder_strength) * remaining_y;
        let x1 = x0 + y1_offset;
        let y1 = y0 + y1_offset;
        // Shoulder length is in stops.
        let w = initial_w + shoulder_length.exp2() - 1.0;

        let overshoot_x = (w * 2.0) * shoulder_angle * shoulder_length / w;
        let overshoot_y = 0.5 * shoulder_angle * shoulder_length;

        let nx0 = x0 / w;
        let nx1 = x1 / w;

        let (m, b) = slope_intercept(nx0, nx1, y0, y1);
        let mid = Segment {
            offset_x: -(b / m),
            ln_a: gamma * m.ln(),
            b: gamma,
            ..Segment::IDENTITY
        };
        let toe_m = linear_gamma_derivative(m, b, gamma, nx0);
        let shoulder_m = linear_gamma_derivative(m, b, gamma, nx1);

        let gy0 = y0.powf(gamma).max(1e-5);
        let gy1 = y1.powf(gamma).max(1e-5);
        let overshoot_y = (1.0 + overshoot_y).powf(gamma) - 1.0;

        let (toe_ln_a, toe_b) = solve_ab(nx0, gy0, toe_m);
        let toe = Segment {
            ln_a: toe_ln_a,
            b: toe_b,
            ..Segment::IDENTITY
        };

        let (sh_ln_a, sh_b) = solve_ab(
            (1.0 + overshoot_x) - nx1,
            (1.0 + overshoot_y) - gy1,
            shoulder_m,
        );
        let shoulder = Segment {
            offset_x: 1.0 + overshoot_x,
            offset_y: 1.0 + overshoot_y,
            scale_x: -1.0,
            scale_y: -1.0,
            ln_a: sh_ln_a,
            b: sh_b,
        };

        let mut segments = [toe, mid, shoulder];
        // Normalize so the white point hits exactly 1.
        let inv_scale = 1.0 / shoulder.eval(1.0);
        for segment in &mut segments {
            segment.offset_y *= inv_scale;
            segment.scale_y *= inv_scale;
        }

        Self {
            white_point: w,
            x0: nx0,
            x1: nx1,
            segments,
        }
    }

    /// Input value that maps to 1.
    #[must_use]
    pub const fn white_point(&self) -> f32 {
        self.white_point
    }

    /// Evaluate the curve at linear input `x`.
    #[must_use]
    pub fn eval(&self, x: f32) -> f32 {
        eval_custom_curve(&self.packed(), x)
    }

    /// Uniform layout: header `(1/white, x0, x1, 0)` then `(a, b)` vec4
    /// pairs for the toe, linear and shoulder segments.
    #[must_use]
    pub fn packed(&self) -> [[f32; 4]; 7] {
        let [toe, mid, shoulder] = self.segments.map(|s| s.packed());
        [
            [1.0 / self.white_point, self.x0, self.x1, 0.0],
            toe[0],
            toe[1],
            mid[0],
            mid[1],
            shoulder[0],
            shoulder[1],
        ]
    }
}

/// Evaluate a packed custom curve, as the uber kernel does.
#[must_use]
pub fn eval_custom_curve(curve: &[[f32; 4]; 7], x: f32) -> f32 {
    let nx = x * curve[0][0];
    let (a, b) = if nx < curve[0][1] {
        (curve[1], curve[2])
    } else if nx < curve[0][2] {
        (curve[3], curve[4])
    } else {
        (curve[5], curve[6])
    };
    eval_segment(a, b, nx)
}

/// Apply `tonemapper` to linear `rgb`.
#[must_use]
pub fn apply(tonemapper_id: u32, curve: &[[f32; 4]; 7], rgb: [f32; 3]) -> [f32; 3] {
    match tonemapper_id {
        1 => neutral(rgb),
        2 => aces(rgb),
        3 => rgb.map(|c| eval_custom_curve(curve, c)),
        _ => rgb,
    }
}
