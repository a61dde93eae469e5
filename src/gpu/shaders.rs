//! The compute kernels and the shader defines each can be built with.

use crate::postprocess::target::TargetFormat;

/// Selects `rgba8unorm` instead of `rgba16float` for the kernel output.
pub const OUTPUT_RGBA8: &str = "OUTPUT_RGBA8";
/// Selects `rgba8unorm` for the temporal kernel's history output.
pub const HISTORY_RGBA8: &str = "HISTORY_RGBA8";

/// Post-processing compute kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeShader {
    /// Format-converting copy.
    Copy,
    /// Constant exposure texel.
    ExposureFixed,
    /// Per-tile log2 luminance.
    ExposureLuminance,
    /// Tile average.
    ExposureReduce,
    /// Metering and adaptation.
    ExposureAdapt,
    /// Temporal anti-aliasing blend.
    Temporal,
    /// Uber pass; effects are selected by defines.
    Uber,
    /// FXAA.
    Fxaa,
}

impl ComputeShader {
    /// Every kernel.
    pub const ALL: [Self; 8] = [
        Self::Copy,
        Self::ExposureFixed,
        Self::ExposureLuminance,
        Self::ExposureReduce,
        Self::ExposureAdapt,
        Self::Temporal,
        Self::Uber,
        Self::Fxaa,
    ];

    /// WGSL source.
    #[must_use]
    pub const fn source(self) -> &'static str {
        match self {
            Self::Copy => include_str!("../../assets/shaders/postfx/copy.wgsl"),
            Self::ExposureFixed => {
                include_str!("../../assets/shaders/postfx/exposure_fixed.wgsl")
            }
            Self::ExposureLuminance => {
                include_str!("../../assets/shaders/postfx/exposure_luminance.wgsl")
            }
            Self::ExposureReduce => {
                include_str!("../../assets/shaders/postfx/exposure_reduce.wgsl")
            }
            Self::ExposureAdapt => {
                include_str!("../../assets/shaders/postfx/exposure_adapt.wgsl")
            }
            Self::Temporal => include_str!("../../assets/shaders/postfx/temporal.wgsl"),
            Self::Uber => include_str!("../../assets/shaders/postfx/uber.wgsl"),
            Self::Fxaa => include_str!("../../assets/shaders/postfx/fxaa.wgsl"),
        }
    }

    /// Path used in composer diagnostics.
    #[must_use]
    pub const fn file_path(self) -> &'static str {
        match self {
            Self::Copy => "postfx/copy.wgsl",
            Self::ExposureFixed => "postfx/exposure_fixed.wgsl",
            Self::ExposureLuminance => "postfx/exposure_luminance.wgsl",
            Self::ExposureReduce => "postfx/exposure_reduce.wgsl",
            Self::ExposureAdapt => "postfx/exposure_adapt.wgsl",
            Self::Temporal => "postfx/temporal.wgsl",
            Self::Uber => "postfx/uber.wgsl",
            Self::Fxaa => "postfx/fxaa.wgsl",
        }
    }

    /// Output-format define sets the kernel is built with. Uber variants
    /// are driven by feature flags instead.
    #[must_use]
    pub const fn def_variants(self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Copy | Self::Fxaa => &[&[], &[OUTPUT_RGBA8]],
            Self::Temporal => &[&[], &[HISTORY_RGBA8]],
            Self::ExposureFixed
            | Self::ExposureLuminance
            | Self::ExposureReduce
            | Self::ExposureAdapt
            | Self::Uber => &[&[]],
        }
    }

    /// Workgroup edge length along x and y.
    #[must_use]
    pub const fn workgroup_size(self) -> u32 {
        match self {
            Self::ExposureFixed | Self::ExposureReduce | Self::ExposureAdapt => 1,
            Self::Copy
            | Self::ExposureLuminance
            | Self::Temporal
            | Self::Uber
            | Self::Fxaa => 8,
        }
    }
}

/// Define selecting the storage format of a color output, or `None` for the
/// default `rgba16float`. Formats without a kernel variant yield `Err`.
pub(crate) const fn color_output_def(
    format: TargetFormat,
    def: &'static str,
) -> Result<Option<&'static str>, TargetFormat> {
    match format {
        TargetFormat::Rgba16Float => Ok(None),
        TargetFormat::Rgba8Unorm => Ok(Some(def)),
        other => Err(other),
    }
}
