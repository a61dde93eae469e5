//! Per-camera inputs to the post-processing pipeline.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::effects::temporal::halton_jitter;
use crate::frame_settings::FrameSettings;

/// Stable identifier of a camera; keys all per-camera history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(pub u64);

/// Per-camera anti-aliasing choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntialiasingMode {
    /// Final pass is a plain copy.
    #[default]
    None,
    /// Final pass runs FXAA.
    Fxaa,
    /// Temporal anti-aliasing blends against history; final pass copies.
    Temporal,
}

/// Physical camera body settings, used when exposure follows the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalCameraSettings {
    /// f-number.
    pub aperture: f32,
    /// Shutter speed in seconds.
    pub shutter_speed: f32,
    /// Sensor sensitivity.
    pub iso: f32,
}

impl Default for PhysicalCameraSettings {
    fn default() -> Self {
        Self {
            aperture: 16.0,
            shutter_speed: 1.0 / 200.0,
            iso: 200.0,
        }
    }
}

/// Everything the driver needs to know about the camera being processed.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessCamera {
    /// History key.
    pub id: CameraId,
    /// Render width in pixels.
    pub width: u32,
    /// Render height in pixels.
    pub height: u32,
    /// Anti-aliasing mode.
    pub antialiasing: AntialiasingMode,
    /// Resolved per-camera frame settings.
    pub frame_settings: FrameSettings,
    /// Physical body used by physical-camera exposure.
    pub physical: PhysicalCameraSettings,
    /// Seconds since the previous frame of this camera.
    pub delta_time: f32,
    /// Frame counter, drives the TAA jitter sequence.
    pub frame_index: u32,
    /// Set on the frame after a cut; breaks temporal continuity.
    pub camera_cut: bool,
}

impl PostProcessCamera {
    /// Camera with default settings and no anti-aliasing.
    #[must_use]
    pub fn new(id: CameraId, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            antialiasing: AntialiasingMode::None,
            frame_settings: FrameSettings::default(),
            physical: PhysicalCameraSettings::default(),
            delta_time: 1.0 / 60.0,
            frame_index: 0,
            camera_cut: false,
        }
    }

    /// Builder: anti-aliasing mode.
    #[must_use]
    pub fn with_antialiasing(mut self, mode: AntialiasingMode) -> Self {
        self.antialiasing = mode;
        self
    }

    /// Builder: frame settings.
    #[must_use]
    pub fn with_frame_settings(mut self, settings: FrameSettings) -> Self {
        self.frame_settings = settings;
        self
    }

    /// `(width, height)`.
    #[must_use]
    pub const fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sub-pixel projection offset for this frame, in pixels. Zero unless
    /// the camera uses temporal anti-aliasing.
    #[must_use]
    pub fn jitter(&self, sequence_length: u32) -> Vec2 {
        if self.antialiasing == AntialiasingMode::Temporal {
            halton_jitter(self.frame_index, sequence_length)
        } else {
            Vec2::ZERO
        }
    }

    /// Advance to the next frame: bump the counter and clear the cut flag.
    pub fn advance(&mut self, delta_time: f32) {
        self.frame_index = self.frame_index.wrapping_add(1);
        self.delta_time = delta_time;
        self.camera_cut = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_only_applies_to_temporal_cameras() {
        let camera = PostProcessCamera::new(CameraId(1), 64, 64);
        assert_eq!(camera.jitter(8), Vec2::ZERO);

        let taa = camera.with_antialiasing(AntialiasingMode::Temporal);
        let j = taa.jitter(8);
        assert!(j.x.abs() <= 0.5 && j.y.abs() <= 0.5);
        assert_ne!(j, Vec2::ZERO);
    }

    #[test]
    fn advance_clears_cut() {
        let mut camera = PostProcessCamera::new(CameraId(1), 8, 8);
        camera.camera_cut = true;
        camera.advance(0.02);
        assert!(!camera.camera_cut);
        assert_eq!(camera.frame_index, 1);
        assert_eq!(camera.delta_time, 0.02);
    }
}
