//! The seam between the frame driver and whatever executes its passes.
//!
//! The driver allocates targets and records [`Pass`]es through
//! [`FrameBackend`]; a frame's passes become visible only once
//! [`FrameBackend::submit_frame`] succeeds. On any error the driver calls
//! [`FrameBackend::abandon_frame`] and nothing recorded for that frame runs.

use super::target::{TargetDesc, TargetFormat, TargetId};
use super::variants::{FeatureFlags, KernelId, KernelSelector};
use crate::effects::exposure::ExposureParams;
use crate::effects::fxaa::FxaaParams;
use crate::effects::temporal::TemporalParams;
use crate::effects::UberParams;
use crate::error::{AllocationError, ConfigError, FrameFxError};

/// One recorded unit of GPU work.
#[derive(Debug, Clone, PartialEq)]
pub enum Pass {
    /// Texel-exact copy when formats match, converting copy otherwise.
    Copy {
        /// Read target.
        source: TargetId,
        /// Written target; same extent as `source`.
        destination: TargetId,
    },
    /// Write a constant exposure texel.
    ExposureFixed {
        /// 1x1 exposure target.
        output: TargetId,
        /// Exposure value stored in the texel.
        ev100: f32,
        /// Linear multiplier for `ev100`.
        multiplier: f32,
    },
    /// Full resolution color to per-tile average log2 luminance.
    ExposureLuminance {
        /// Scene color.
        source: TargetId,
        /// One texel per luminance tile.
        output: TargetId,
        /// Metering uniforms.
        params: ExposureParams,
    },
    /// Coarse tiles to a single average.
    ExposureReduce {
        /// Tile luminance.
        source: TargetId,
        /// 1x1 average.
        output: TargetId,
    },
    /// Meter the average and adapt from the previous exposure.
    ExposureAdapt {
        /// 1x1 average log2 luminance.
        average: TargetId,
        /// Last frame's exposure.
        previous: TargetId,
        /// This frame's exposure.
        output: TargetId,
        /// Metering and adaptation uniforms.
        params: ExposureParams,
    },
    /// Blend the frame with reprojected history; writes both `output` and
    /// `history_out`.
    TemporalBlend {
        /// Current color.
        source: TargetId,
        /// Last frame's resolved color.
        history: TargetId,
        /// Screen-space motion.
        velocity: TargetId,
        /// Scene depth.
        depth: TargetId,
        /// Blended color for the rest of the frame.
        output: TargetId,
        /// Blended color kept for the next frame.
        history_out: TargetId,
        /// Blend uniforms.
        params: TemporalParams,
    },
    /// Combined grading / lens / vignette pass.
    Uber {
        /// Registered variant to run.
        kernel: KernelId,
        /// Effects the variant was built with.
        features: FeatureFlags,
        /// Input color.
        source: TargetId,
        /// Exposure texel to apply.
        exposure: TargetId,
        /// Spectral LUT for chromatic aberration.
        spectral_lut: TargetId,
        /// Graded color.
        output: TargetId,
        /// Effect uniforms.
        params: Box<UberParams>,
    },
    /// Fast approximate anti-aliasing.
    Fxaa {
        /// Input color.
        source: TargetId,
        /// Anti-aliased color.
        output: TargetId,
        /// Edge detection uniforms.
        params: FxaaParams,
    },
}

/// Discriminant of a [`Pass`], handy for asserting on recorded sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// [`Pass::Copy`].
    Copy,
    /// [`Pass::ExposureFixed`].
    ExposureFixed,
    /// [`Pass::ExposureLuminance`].
    ExposureLuminance,
    /// [`Pass::ExposureReduce`].
    ExposureReduce,
    /// [`Pass::ExposureAdapt`].
    ExposureAdapt,
    /// [`Pass::TemporalBlend`].
    TemporalBlend,
    /// [`Pass::Uber`].
    Uber,
    /// [`Pass::Fxaa`].
    Fxaa,
}

impl Pass {
    /// Which kind of pass this is.
    #[must_use]
    pub const fn kind(&self) -> PassKind {
        match self {
            Self::Copy { .. } => PassKind::Copy,
            Self::ExposureFixed { .. } => PassKind::ExposureFixed,
            Self::ExposureLuminance { .. } => PassKind::ExposureLuminance,
            Self::ExposureReduce { .. } => PassKind::ExposureReduce,
            Self::ExposureAdapt { .. } => PassKind::ExposureAdapt,
            Self::TemporalBlend { .. } => PassKind::TemporalBlend,
            Self::Uber { .. } => PassKind::Uber,
            Self::Fxaa { .. } => PassKind::Fxaa,
        }
    }

    /// Debug label used for GPU passes and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Copy { .. } => "framefx copy",
            Self::ExposureFixed { .. } => "framefx exposure fixed",
            Self::ExposureLuminance { .. } => "framefx exposure luminance",
            Self::ExposureReduce { .. } => "framefx exposure reduce",
            Self::ExposureAdapt { .. } => "framefx exposure adapt",
            Self::TemporalBlend { .. } => "framefx temporal",
            Self::Uber { .. } => "framefx uber",
            Self::Fxaa { .. } => "framefx fxaa",
        }
    }

    /// Targets the pass reads.
    #[must_use]
    pub fn inputs(&self) -> Vec<TargetId> {
        match self {
            Self::Copy { source, .. }
            | Self::ExposureLuminance { source, .. }
            | Self::ExposureReduce { source, .. }
            | Self::Fxaa { source, .. } => vec![*source],
            Self::ExposureFixed { .. } => Vec::new(),
            Self::ExposureAdapt {
                average, previous, ..
            } => vec![*average, *previous],
            Self::TemporalBlend {
                source,
                history,
                velocity,
                depth,
                ..
            } => vec![*source, *history, *velocity, *depth],
            Self::Uber {
                source,
                exposure,
                spectral_lut,
                ..
            } => vec![*source, *exposure, *spectral_lut],
        }
    }

    /// Targets the pass writes.
    #[must_use]
    pub fn outputs(&self) -> Vec<TargetId> {
        match self {
            Self::Copy { destination, .. } => vec![*destination],
            Self::ExposureFixed { output, .. }
            | Self::ExposureLuminance { output, .. }
            | Self::ExposureReduce { output, .. }
            | Self::ExposureAdapt { output, .. }
            | Self::Uber { output, .. }
            | Self::Fxaa { output, .. } => vec![*output],
            Self::TemporalBlend {
                output,
                history_out,
                ..
            } => vec![*output, *history_out],
        }
    }

    /// The primary color input, if the pass has one.
    #[must_use]
    pub const fn source(&self) -> Option<TargetId> {
        match self {
            Self::Copy { source, .. }
            | Self::ExposureLuminance { source, .. }
            | Self::ExposureReduce { source, .. }
            | Self::TemporalBlend { source, .. }
            | Self::Uber { source, .. }
            | Self::Fxaa { source, .. } => Some(*source),
            Self::ExposureFixed { .. } | Self::ExposureAdapt { .. } => None,
        }
    }
}

/// Executes frame recordings.
///
/// Calls follow `begin_frame`, any number of `encode`, then exactly one of
/// `submit_frame` or `abandon_frame`. Target management is allowed at any
/// time outside a recording.
pub trait FrameBackend {
    /// Allocate a target.
    ///
    /// # Errors
    ///
    /// [`AllocationError`] if the descriptor is invalid or memory runs out.
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, AllocationError>;

    /// Free a target. Unknown ids are ignored.
    fn release_target(&mut self, id: TargetId);

    /// Descriptor of a live target.
    fn target_desc(&self, id: TargetId) -> Option<&TargetDesc>;

    /// Replace a target's contents with row-major RGBA texels. Channels the
    /// format lacks are dropped.
    ///
    /// # Errors
    ///
    /// [`FrameFxError::MissingTarget`] for unknown ids and
    /// [`ConfigError::DimensionMismatch`] if `texels` has the wrong length.
    fn upload(&mut self, id: TargetId, texels: &[[f32; 4]]) -> Result<(), FrameFxError>;

    /// Build the uber kernel of every registered variant.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ShaderComposition`] if a variant fails to compile.
    fn prepare_variants(&mut self, selector: &KernelSelector) -> Result<(), ConfigError>;

    /// Start recording a frame, discarding any unsubmitted recording.
    fn begin_frame(&mut self, label: &str);

    /// Record a pass.
    ///
    /// # Errors
    ///
    /// [`FrameFxError::NoActiveFrame`] outside a recording,
    /// [`FrameFxError::MissingTarget`] if the pass names an unknown target,
    /// and [`ConfigError`] if the pass needs an unprepared kernel or
    /// mismatched targets.
    fn encode(&mut self, pass: Pass) -> Result<(), FrameFxError>;

    /// Execute everything recorded since `begin_frame`.
    ///
    /// # Errors
    ///
    /// [`FrameFxError::NoActiveFrame`] without a recording; backend
    /// execution failures.
    fn submit_frame(&mut self) -> Result<(), FrameFxError>;

    /// Drop the current recording without executing it.
    fn abandon_frame(&mut self);

    /// Check that every target `pass` names exists and fits its role.
    ///
    /// # Errors
    ///
    /// [`FrameFxError::MissingTarget`] for unknown ids, and
    /// [`ConfigError::DimensionMismatch`] / [`ConfigError::UnsupportedFormat`]
    /// for targets that cannot serve their role.
    fn validate_pass(&self, pass: &Pass) -> Result<(), FrameFxError> {
        for id in pass.inputs().into_iter().chain(pass.outputs()) {
            let _ = lookup(self, id)?;
        }
        match pass {
            Pass::Copy {
                source,
                destination,
            } => {
                let source = lookup(self, *source)?;
                let destination = lookup(self, *destination)?;
                expect_extent("copy destination", source.extent(), destination)?;
                if source.format != destination.format {
                    expect_storage("copy destination", destination)?;
                }
            }
            Pass::ExposureFixed { output, .. }
            | Pass::ExposureLuminance { output, .. }
            | Pass::ExposureReduce { output, .. }
            | Pass::ExposureAdapt { output, .. } => {
                expect_storage("exposure", lookup(self, *output)?)?;
            }
            Pass::TemporalBlend {
                source,
                history,
                velocity,
                depth,
                output,
                history_out,
                ..
            } => {
                let extent = lookup(self, *source)?.extent();
                for (role, id) in [
                    ("history", history),
                    ("velocity", velocity),
                    ("depth", depth),
                    ("temporal output", output),
                    ("history output", history_out),
                ] {
                    expect_extent(role, extent, lookup(self, *id)?)?;
                }
                let depth = lookup(self, *depth)?;
                if !depth.format.is_depth() && depth.format != TargetFormat::R32Float {
                    return Err(ConfigError::UnsupportedFormat {
                        role: "depth",
                        format: depth.format,
                    }
                    .into());
                }
                expect_storage("temporal output", lookup(self, *output)?)?;
                expect_storage("history output", lookup(self, *history_out)?)?;
            }
            Pass::Uber { source, output, .. } | Pass::Fxaa { source, output, .. } => {
                let extent = lookup(self, *source)?.extent();
                let output = lookup(self, *output)?;
                expect_extent("output", extent, output)?;
                expect_storage("output", output)?;
            }
        }
        Ok(())
    }
}

fn lookup<B: FrameBackend + ?Sized>(
    backend: &B,
    id: TargetId,
) -> Result<&TargetDesc, FrameFxError> {
    backend.target_desc(id).ok_or(FrameFxError::MissingTarget(id))
}

fn expect_extent(
    role: &'static str,
    expected: (u32, u32),
    desc: &TargetDesc,
) -> Result<(), ConfigError> {
    if desc.extent() == expected {
        Ok(())
    } else {
        Err(ConfigError::DimensionMismatch {
            role,
            expected,
            actual: desc.extent(),
        })
    }
}

fn expect_storage(role: &'static str, desc: &TargetDesc) -> Result<(), ConfigError> {
    if desc.format.supports_storage() {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedFormat {
            role,
            format: desc.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporal_blend_reports_both_outputs() {
        let pass = Pass::TemporalBlend {
            source: TargetId(1),
            history: TargetId(2),
            velocity: TargetId(3),
            depth: TargetId(4),
            output: TargetId(5),
            history_out: TargetId(6),
            params: bytemuck::Zeroable::zeroed(),
        };
        assert_eq!(pass.kind(), PassKind::TemporalBlend);
        assert_eq!(pass.outputs(), vec![TargetId(5), TargetId(6)]);
        assert_eq!(pass.inputs().len(), 4);
        assert_eq!(pass.source(), Some(TargetId(1)));
    }

    #[test]
    fn fixed_exposure_has_no_inputs() {
        let pass = Pass::ExposureFixed {
            output: TargetId(9),
            ev100: 0.0,
            multiplier: 1.0,
        };
        assert!(pass.inputs().is_empty());
        assert_eq!(pass.source(), None);
        assert_eq!(pass.label(), "framefx exposure fixed");
    }
}
