//! Crate-level error types.

use std::fmt;

use crate::frame_settings::LitShaderMode;
use crate::gpu::render_context::RenderContextError;
use crate::postprocess::target::{TargetFormat, TargetId};
use crate::postprocess::variants::FeatureFlags;

/// Build or configuration mismatches. These are never retried: they mean
/// the pipeline was set up with a combination it cannot execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A feature combination was selected that has no registered kernel.
    UnregisteredVariant(FeatureFlags),
    /// MSAA was explicitly requested together with a lit shader mode that
    /// cannot resolve it.
    UnsupportedShadingMode {
        /// Lit shader mode after overrides were applied.
        lit_shader_mode: LitShaderMode,
    },
    /// Two targets that must share an extent do not.
    DimensionMismatch {
        /// What the target is used as (e.g. "velocity").
        role: &'static str,
        /// Extent the pipeline expected.
        expected: (u32, u32),
        /// Extent the target actually has.
        actual: (u32, u32),
    },
    /// A target has a format the pass cannot read or write.
    UnsupportedFormat {
        /// What the target is used as.
        role: &'static str,
        /// The offending format.
        format: TargetFormat,
    },
    /// A WGSL source failed to compose or validate.
    ShaderComposition {
        /// Shader file path used for diagnostics.
        file_path: String,
        /// Composer diagnostic.
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredVariant(flags) => {
                write!(f, "unregistered uber kernel variant: {flags}")
            }
            Self::UnsupportedShadingMode { lit_shader_mode } => write!(
                f,
                "MSAA requested with unsupported lit shader mode {lit_shader_mode:?}"
            ),
            Self::DimensionMismatch {
                role,
                expected,
                actual,
            } => write!(
                f,
                "{role} target is {}x{}, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            Self::UnsupportedFormat { role, format } => {
                write!(f, "{role} target has unsupported format {format:?}")
            }
            Self::ShaderComposition { file_path, message } => {
                write!(f, "failed to compose shader '{file_path}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Target allocation failures. Fatal for the frame that triggered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// The descriptor cannot be satisfied (zero size, over device limits).
    InvalidDescriptor {
        /// Target label.
        label: String,
        /// Why the descriptor was rejected.
        reason: String,
    },
    /// The device ran out of memory while creating the target.
    OutOfMemory {
        /// Target label.
        label: String,
    },
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDescriptor { label, reason } => {
                write!(f, "invalid target descriptor '{label}': {reason}")
            }
            Self::OutOfMemory { label } => {
                write!(f, "out of memory allocating target '{label}'")
            }
        }
    }
}

impl std::error::Error for AllocationError {}

/// Errors produced by the framefx crate.
#[derive(Debug)]
pub enum FrameFxError {
    /// Configuration or build mismatch.
    Config(ConfigError),
    /// Target allocation failure.
    Allocation(AllocationError),
    /// A pass referenced a target the backend does not own.
    MissingTarget(TargetId),
    /// A pass was encoded outside `begin_frame` / `submit_frame`.
    NoActiveFrame,
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for FrameFxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Allocation(e) => write!(f, "allocation error: {e}"),
            Self::MissingTarget(id) => write!(f, "unknown target {id}"),
            Self::NoActiveFrame => {
                write!(f, "pass encoded without an active frame")
            }
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for FrameFxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Allocation(e) => Some(e),
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::MissingTarget(_) | Self::NoActiveFrame | Self::OptionsParse(_) => None,
        }
    }
}

impl From<ConfigError> for FrameFxError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<AllocationError> for FrameFxError {
    fn from(e: AllocationError) -> Self {
        Self::Allocation(e)
    }
}

impl From<RenderContextError> for FrameFxError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for FrameFxError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postprocess::variants::UberFeature;

    #[test]
    fn config_errors_convert_and_describe_themselves() {
        let flags = FeatureFlags::from(UberFeature::Vignette);
        let err: FrameFxError = ConfigError::UnregisteredVariant(flags).into();
        assert!(matches!(err, FrameFxError::Config(_)));
        assert!(err.to_string().contains("vignette"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn dimension_mismatch_message_names_role() {
        let err = ConfigError::DimensionMismatch {
            role: "velocity",
            expected: (64, 32),
            actual: (32, 32),
        };
        assert_eq!(err.to_string(), "velocity target is 32x32, expected 64x32");
    }
}
