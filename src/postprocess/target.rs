//! Backend-neutral render target descriptions.

use std::fmt;

use crate::error::AllocationError;

/// Opaque handle to a backend-owned 2D image.
///
/// Ids are never reused by a backend, so comparing two ids answers "is this
/// the same resource".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u32);

impl TargetId {
    /// Raw numeric id (for logging and debugging).
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Texel formats the pipeline allocates or consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// HDR color: scratch, history, and the usual source format.
    Rgba16Float,
    /// LDR color, typically the presentation destination.
    Rgba8Unorm,
    /// Two-channel float: exposure values (EV100, multiplier).
    Rg32Float,
    /// Two-channel half: screen-space velocity in UV units.
    Rg16Float,
    /// Single-channel float.
    R32Float,
    /// Scene depth.
    Depth32Float,
}

impl TargetFormat {
    /// Matching wgpu texture format.
    #[must_use]
    pub const fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            Self::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            Self::Rg32Float => wgpu::TextureFormat::Rg32Float,
            Self::Rg16Float => wgpu::TextureFormat::Rg16Float,
            Self::R32Float => wgpu::TextureFormat::R32Float,
            Self::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }

    /// Logical format of a host texture; depth and unlisted formats have
    /// none.
    #[must_use]
    pub const fn from_wgpu(format: wgpu::TextureFormat) -> Option<Self> {
        match format {
            wgpu::TextureFormat::Rgba16Float => Some(Self::Rgba16Float),
            wgpu::TextureFormat::Rgba8Unorm => Some(Self::Rgba8Unorm),
            wgpu::TextureFormat::Rg32Float => Some(Self::Rg32Float),
            wgpu::TextureFormat::Rg16Float => Some(Self::Rg16Float),
            wgpu::TextureFormat::R32Float => Some(Self::R32Float),
            _ => None,
        }
    }

    /// Number of stored channels.
    #[must_use]
    pub const fn channel_count(self) -> usize {
        match self {
            Self::Rgba16Float | Self::Rgba8Unorm => 4,
            Self::Rg32Float | Self::Rg16Float => 2,
            Self::R32Float | Self::Depth32Float => 1,
        }
    }

    /// Size of one texel in bytes.
    #[must_use]
    pub const fn bytes_per_texel(self) -> u32 {
        match self {
            Self::Rgba16Float | Self::Rg32Float => 8,
            Self::Rgba8Unorm | Self::Rg16Float | Self::R32Float | Self::Depth32Float => 4,
        }
    }

    /// Whether the format holds depth.
    #[must_use]
    pub const fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float)
    }

    /// Whether compute kernels can write the format as a storage texture.
    #[must_use]
    pub const fn supports_storage(self) -> bool {
        matches!(
            self,
            Self::Rgba16Float | Self::Rgba8Unorm | Self::Rg32Float | Self::R32Float
        )
    }

    /// Round a texel to the precision the format stores, zeroing channels
    /// the format does not have.
    #[must_use]
    pub fn quantize(self, texel: [f32; 4]) -> [f32; 4] {
        let half = |v: f32| half::f16::from_f32(v).to_f32();
        let unorm = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() / 255.0;
        match self {
            Self::Rgba16Float => texel.map(half),
            Self::Rgba8Unorm => texel.map(unorm),
            Self::Rg32Float => [texel[0], texel[1], 0.0, 1.0],
            Self::Rg16Float => [half(texel[0]), half(texel[1]), 0.0, 1.0],
            Self::R32Float | Self::Depth32Float => [texel[0], 0.0, 0.0, 1.0],
        }
    }

    /// Encode one texel into the format's little-endian byte layout.
    pub(crate) fn encode_texel(self, texel: [f32; 4], out: &mut Vec<u8>) {
        match self {
            Self::Rgba16Float => {
                for v in texel {
                    out.extend_from_slice(&half::f16::from_f32(v).to_le_bytes());
                }
            }
            Self::Rgba8Unorm => {
                for v in texel {
                    out.push((v.clamp(0.0, 1.0) * 255.0).round() as u8);
                }
            }
            Self::Rg32Float => {
                out.extend_from_slice(&texel[0].to_le_bytes());
                out.extend_from_slice(&texel[1].to_le_bytes());
            }
            Self::Rg16Float => {
                out.extend_from_slice(&half::f16::from_f32(texel[0]).to_le_bytes());
                out.extend_from_slice(&half::f16::from_f32(texel[1]).to_le_bytes());
            }
            Self::R32Float | Self::Depth32Float => {
                out.extend_from_slice(&texel[0].to_le_bytes());
            }
        }
    }

    /// Decode one texel from the format's little-endian byte layout. Missing
    /// channels read as 0, missing alpha as 1.
    pub(crate) fn decode_texel(self, bytes: &[u8]) -> [f32; 4] {
        let f32_at = |i: usize| {
            f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
        };
        let f16_at = |i: usize| half::f16::from_le_bytes([bytes[i], bytes[i + 1]]).to_f32();
        match self {
            Self::Rgba16Float => [f16_at(0), f16_at(2), f16_at(4), f16_at(6)],
            Self::Rgba8Unorm => std::array::from_fn(|i| f32::from(bytes[i]) / 255.0),
            Self::Rg32Float => [f32_at(0), f32_at(4), 0.0, 1.0],
            Self::Rg16Float => [f16_at(0), f16_at(2), 0.0, 1.0],
            Self::R32Float | Self::Depth32Float => [f32_at(0), 0.0, 0.0, 1.0],
        }
    }
}

/// Description of a target to allocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDesc {
    /// Debug label.
    pub label: String,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: TargetFormat,
}

impl TargetDesc {
    /// Create a descriptor.
    pub fn new(
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: TargetFormat,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            format,
        }
    }

    /// `(width, height)`.
    #[must_use]
    pub const fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of texels.
    #[must_use]
    pub const fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reject descriptors no backend can satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidDescriptor`] for zero-sized targets
    /// or targets larger than `max_dimension` on either axis.
    pub fn validate(&self, max_dimension: u32) -> Result<(), AllocationError> {
        if self.width == 0 || self.height == 0 {
            return Err(AllocationError::InvalidDescriptor {
                label: self.label.clone(),
                reason: format!("zero-sized extent {}x{}", self.width, self.height),
            });
        }
        if self.width > max_dimension || self.height > max_dimension {
            return Err(AllocationError::InvalidDescriptor {
                label: self.label.clone(),
                reason: format!(
                    "extent {}x{} exceeds device limit {max_dimension}",
                    self.width, self.height
                ),
            });
        }
        Ok(())
    }
}
