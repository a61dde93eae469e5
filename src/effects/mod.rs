//! Per-effect activation predicates and parameter builders.
//!
//! Each uber section implements [`UberEffect`]: a predicate deciding whether
//! it contributes this frame, and a writer filling its slice of
//! [`UberParams`]. Parameters are only computed for active effects.
//! The modules also carry the reference math the CPU backend evaluates.

pub mod color_grading;
pub mod exposure;
pub mod fxaa;
pub mod lens;
pub mod temporal;
pub mod tonemapping;
pub mod uber;

pub use color_grading::ColorGrading;
pub use lens::{ChromaticAberration, LensDistortion, Vignette};
pub use uber::UberParams;

use crate::options::Options;
use crate::postprocess::variants::{FeatureFlags, UberFeature};

/// Inputs shared by every parameter builder for one frame.
#[derive(Debug, Clone, Copy)]
pub struct EffectFrame<'a> {
    /// Effect settings of the frame.
    pub options: &'a Options,
    /// Camera width in pixels.
    pub width: u32,
    /// Camera height in pixels.
    pub height: u32,
    /// Texel count of the spectral LUT bound for chromatic aberration.
    pub spectral_lut_width: u32,
}

impl<'a> EffectFrame<'a> {
    /// Frame using the built-in spectral LUT.
    #[must_use]
    pub const fn new(options: &'a Options, width: u32, height: u32) -> Self {
        Self {
            options,
            width,
            height,
            spectral_lut_width: lens::DEFAULT_SPECTRAL_LUT.len() as u32,
        }
    }
}

/// One section of the uber pass.
pub trait UberEffect {
    /// Flag that selects the kernel variant compiled with this section.
    const FEATURE: UberFeature;

    /// Whether the effect changes the image with these settings.
    fn is_active(options: &Options) -> bool;

    /// Fill this effect's part of `params`.
    fn write_params(frame: &EffectFrame<'_>, params: &mut UberParams);
}

fn collect<E: UberEffect>(options: &Options, flags: &mut FeatureFlags) {
    if E::is_active(options) {
        flags.insert(E::FEATURE);
    }
}

/// Flags of every effect active under `options`.
#[must_use]
pub fn collect_features(options: &Options) -> FeatureFlags {
    let mut flags = FeatureFlags::NONE;
    collect::<ColorGrading>(options, &mut flags);
    collect::<LensDistortion>(options, &mut flags);
    collect::<ChromaticAberration>(options, &mut flags);
    collect::<Vignette>(options, &mut flags);
    flags
}

fn write<E: UberEffect>(
    frame: &EffectFrame<'_>,
    flags: FeatureFlags,
    params: &mut UberParams,
) {
    if flags.contains(E::FEATURE) {
        E::write_params(frame, params);
    }
}

/// Uber uniforms for `flags`; sections of inactive effects stay zeroed.
#[must_use]
pub fn build_uber_params(frame: &EffectFrame<'_>, flags: FeatureFlags) -> UberParams {
    let mut params = UberParams::for_screen(frame.width, frame.height);
    write::<ColorGrading>(frame, flags, &mut params);
    write::<LensDistortion>(frame, flags, &mut params);
    write::<ChromaticAberration>(frame, flags, &mut params);
    write::<Vignette>(frame, flags, &mut params);
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_have_no_features() {
        assert_eq!(collect_features(&Options::default()), FeatureFlags::NONE);
    }

    #[test]
    fn each_effect_maps_to_its_flag() {
        let mut options = Options::default();
        options.vignette.intensity = 0.3;
        options.lens_distortion.intensity = -0.2;
        let flags = collect_features(&options);
        assert!(flags.contains(UberFeature::Vignette));
        assert!(flags.contains(UberFeature::LensDistortion));
        assert!(!flags.contains(UberFeature::ColorGrading));
        assert!(!flags.contains(UberFeature::ChromaticAberration));
    }

    #[test]
    fn inactive_sections_are_not_computed() {
        let mut options = Options::default();
        options.vignette.intensity = 0.5;
        options.color_grading.contrast = 20.0;
        let frame = EffectFrame::new(&options, 8, 8);
        // Grading configured but not in the flag set: its block stays zero.
        let params = build_uber_params(&frame, UberFeature::Vignette.into());
        assert_eq!(params.grading, [0.0; 4]);
        assert_eq!(params.lms_balance, [0.0; 4]);
        assert!(params.vignette_settings[0] > 0.0);
    }
}
