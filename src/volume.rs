//! Priority-ordered override stack resolved over a base [`Options`].
//!
//! Each [`VolumeOverrides`] carries an `Option` per effect section. Resolving
//! applies the overrides in ascending priority, so the highest-priority
//! volume that sets a section wins. Volumes with equal priority apply in
//! insertion order.

use serde::{Deserialize, Serialize};

use crate::options::{
    ChromaticAberrationOptions, ColorGradingOptions, ExposureOptions,
    FxaaOptions, LensDistortionOptions, Options, TemporalAaOptions,
    VignetteOptions,
};

/// Sparse replacement of effect sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VolumeOverrides {
    /// Higher priorities are applied later and win.
    pub priority: i32,
    /// Replacement exposure section.
    pub exposure: Option<ExposureOptions>,
    /// Replacement temporal AA section.
    pub temporal_aa: Option<TemporalAaOptions>,
    /// Replacement FXAA section.
    pub fxaa: Option<FxaaOptions>,
    /// Replacement color grading section.
    pub color_grading: Option<ColorGradingOptions>,
    /// Replacement lens distortion section.
    pub lens_distortion: Option<LensDistortionOptions>,
    /// Replacement chromatic aberration section.
    pub chromatic_aberration: Option<ChromaticAberrationOptions>,
    /// Replacement vignette section.
    pub vignette: Option<VignetteOptions>,
}

impl VolumeOverrides {
    /// Replace every section of `options` this volume sets.
    pub fn apply_to(&self, options: &mut Options) {
        if let Some(v) = &self.exposure {
            options.exposure = v.clone();
        }
        if let Some(v) = &self.temporal_aa {
            options.temporal_aa = v.clone();
        }
        if let Some(v) = &self.fxaa {
            options.fxaa = v.clone();
        }
        if let Some(v) = &self.color_grading {
            options.color_grading = v.clone();
        }
        if let Some(v) = &self.lens_distortion {
            options.lens_distortion = v.clone();
        }
        if let Some(v) = &self.chromatic_aberration {
            options.chromatic_aberration = v.clone();
        }
        if let Some(v) = &self.vignette {
            options.vignette = v.clone();
        }
    }
}

/// Ordered collection of override volumes.
#[derive(Debug, Clone, Default)]
pub struct VolumeStack {
    volumes: Vec<VolumeOverrides>,
}

impl VolumeStack {
    /// Empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a volume, keeping the stack sorted by priority.
    pub fn push(&mut self, volume: VolumeOverrides) {
        let at = self
            .volumes
            .partition_point(|v| v.priority <= volume.priority);
        self.volumes.insert(at, volume);
    }

    /// Remove every volume.
    pub fn clear(&mut self) {
        self.volumes.clear();
    }

    /// Number of volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Whether the stack has no volumes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Effective options for this frame.
    #[must_use]
    pub fn resolve(&self, base: &Options) -> Options {
        let mut options = base.clone();
        for volume in &self.volumes {
            volume.apply_to(&mut options);
        }
        options
    }
}
