//! FXAA uniforms and the edge blend shared with the CPU backend.

use bytemuck::{Pod, Zeroable};

use crate::options::FxaaOptions;

/// Uniforms of the FXAA kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FxaaParams {
    /// Reciprocal of the target size in pixels.
    pub inv_size: [f32; 2],
    /// Relative contrast threshold.
    pub edge_threshold: f32,
    /// Absolute contrast floor.
    pub edge_threshold_min: f32,
    /// Subpixel blend amount.
    pub subpixel: f32,
    _pad: [f32; 3],
}

impl FxaaParams {
    /// Parameters for a `width` x `height` target.
    #[must_use]
    pub fn new(options: &FxaaOptions, width: u32, height: u32) -> Self {
        Self {
            inv_size: [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32],
            edge_threshold: options.edge_threshold,
            edge_threshold_min: options.edge_threshold_min,
            subpixel: options.subpixel.clamp(0.0, 1.0),
            _pad: [0.0; 3],
        }
    }

    /// Blend factor towards the neighborhood average, or 0 when the local
    /// contrast is below threshold.
    #[must_use]
    pub fn blend(&self, center: f32, neighbors: [f32; 4]) -> f32 {
        let max = neighbors.iter().copied().fold(center, f32::max);
        let min = neighbors.iter().copied().fold(center, f32::min);
        let range = max - min;
        if range < self.edge_threshold_min.max(max * self.edge_threshold) {
            return 0.0;
        }
        let average = neighbors.iter().sum::<f32>() * 0.25;
        self.subpixel * ((average - center).abs() / range).clamp(0.0, 1.0)
    }
}

/// Perceptual luma used for edge detection (on gamma-ish values).
#[must_use]
pub fn luma(rgb: [f32; 3]) -> f32 {
    (rgb[0] * 0.299 + rgb[1] * 0.587 + rgb[2] * 0.114).max(0.0).sqrt()
}
