//! Temporal anti-aliasing: jitter sequence and blend uniforms.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::options::TemporalAaOptions;

/// Motion (in pixels) at which history weight reaches `feedback_min`.
pub const MOTION_FALLOFF_PIXELS: f32 = 8.0;

/// Radical inverse of `index` in `base`; values in [0, 1).
#[must_use]
pub fn halton(index: u32, base: u32) -> f32 {
    let mut result = 0.0f32;
    let mut f = 1.0f32;
    let mut i = index;
    while i > 0 {
        f /= base as f32;
        result += f * (i % base) as f32;
        i /= base;
    }
    result
}

/// Sub-pixel offset for `frame_index`, in pixels, each axis in [-0.5, 0.5].
///
/// Uses Halton(2, 3) with a 1-based index so the first frame is not the
/// pixel center.
#[must_use]
pub fn halton_jitter(frame_index: u32, sequence_length: u32) -> Vec2 {
    let index = frame_index % sequence_length.max(1) + 1;
    Vec2::new(halton(index, 2) - 0.5, halton(index, 3) - 0.5)
}

/// Uniforms of the temporal blend kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TemporalParams {
    /// Target size in pixels.
    pub size: [f32; 2],
    /// Reciprocal of `size`.
    pub inv_size: [f32; 2],
    /// History weight for fast-moving pixels.
    pub feedback_min: f32,
    /// History weight for static pixels.
    pub feedback_max: f32,
    /// Strength of the sharpening applied to the blended color.
    pub sharpness: f32,
    _pad: f32,
}

impl TemporalParams {
    /// Parameters for a `width` x `height` camera.
    #[must_use]
    pub fn new(options: &TemporalAaOptions, width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let feedback_min = options.feedback_min.clamp(0.0, 1.0);
        Self {
            size: [w, h],
            inv_size: [1.0 / w, 1.0 / h],
            feedback_min,
            feedback_max: options.feedback_max.clamp(feedback_min, 1.0),
            sharpness: options.sharpness.max(0.0),
            _pad: 0.0,
        }
    }

    /// History weight for a pixel moving `motion_pixels` per frame.
    #[must_use]
    pub fn feedback(&self, motion_pixels: f32) -> f32 {
        let t = (motion_pixels / MOTION_FALLOFF_PIXELS).clamp(0.0, 1.0);
        self.feedback_max + (self.feedback_min - self.feedback_max) * t
    }
}
