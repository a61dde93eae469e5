//! Uniform block shared by every uber kernel variant.

use bytemuck::{Pod, Zeroable};

/// Parameters of the combined uber pass.
///
/// Only the sections of active effects are filled in; the rest stay zeroed
/// and are ignored by the kernel variant that does not compile them in.
/// Layout mirrors `UberParams` in `postfx/uber.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UberParams {
    /// (width, height, 1/width, 1/height)
    pub screen: [f32; 4],
    /// White balance coefficients in LMS space; w unused.
    pub lms_balance: [f32; 4],
    /// Color filter rgb; w = post exposure multiplier.
    pub color_filter: [f32; 4],
    /// x = contrast factor, y = saturation factor.
    pub grading: [f32; 4],
    /// Shadow lift rgb; w = offset.
    pub lift: [f32; 4],
    /// Inverse gamma per channel.
    pub gamma: [f32; 4],
    /// Highlight gain rgb; w = offset.
    pub gain: [f32; 4],
    /// Custom tonemapping curve: header plus three segments.
    pub curve: [[f32; 4]; 7],
    /// (center.x, center.y, x multiplier, y multiplier)
    pub distortion_center: [f32; 4],
    /// (theta or 1/theta, sigma, 1/scale, intensity * 100)
    pub distortion_amount: [f32; 4],
    /// x = aberration amount, y = max samples, z = spectral LUT width.
    pub chromatic: [f32; 4],
    /// Vignette color; w unused.
    pub vignette_color: [f32; 4],
    /// Vignette center in UV; zw unused.
    pub vignette_center: [f32; 4],
    /// (intensity, smoothness, roundness, rounded)
    pub vignette_settings: [f32; 4],
    /// x = tonemapper id.
    pub modes: [u32; 4],
}

impl UberParams {
    /// Zeroed parameters with the screen block filled in.
    #[must_use]
    pub fn for_screen(width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        Self {
            screen: [w, h, 1.0 / w, 1.0 / h],
            ..Self::zeroed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_a_whole_number_of_vec4s() {
        assert_eq!(size_of::<UberParams>(), 21 * 16);
        assert_eq!(size_of::<UberParams>() % 16, 0);
    }

    #[test]
    fn screen_block() {
        let p = UberParams::for_screen(200, 100);
        assert_eq!(p.screen, [200.0, 100.0, 0.005, 0.01]);
        assert_eq!(p.modes, [0; 4]);
    }
}
