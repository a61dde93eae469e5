//! Textures behind the GPU backend's target ids.

use crate::postprocess::target::{TargetDesc, TargetFormat};

/// A backend-owned (or host-imported) texture and its default view.
///
/// Targets the pipeline allocates are created with
/// `TEXTURE_BINDING | COPY_SRC | COPY_DST`, plus `STORAGE_BINDING` for
/// formats the kernels write.
pub struct GpuTarget {
    /// Logical description.
    pub desc: TargetDesc,
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
    /// Whether the host owns the texture.
    pub imported: bool,
}

/// Physical texture format backing a logical one. Depth is stored as
/// `R32Float` so it can be uploaded, read back and fetched in compute.
#[must_use]
pub const fn storage_format(format: TargetFormat) -> wgpu::TextureFormat {
    match format {
        TargetFormat::Depth32Float => wgpu::TextureFormat::R32Float,
        other => other.to_wgpu(),
    }
}

/// Usages of a pipeline-allocated target. `storage_allowed` is whether the
/// device can bind the physical format as a storage texture.
///
/// # Errors
///
/// A reason string when kernels must write the format but the device cannot.
pub fn target_usages(
    format: TargetFormat,
    storage_allowed: bool,
) -> Result<wgpu::TextureUsages, String> {
    let base = wgpu::TextureUsages::TEXTURE_BINDING
        | wgpu::TextureUsages::COPY_SRC
        | wgpu::TextureUsages::COPY_DST;
    if !format.supports_storage() {
        return Ok(base);
    }
    if storage_allowed {
        Ok(base | wgpu::TextureUsages::STORAGE_BINDING)
    } else {
        Err(format!(
            "device cannot write {:?} as a storage texture",
            storage_format(format)
        ))
    }
}

impl GpuTarget {
    /// Create a texture for `desc` with the usages from [`target_usages`].
    #[must_use]
    pub fn new(device: &wgpu::Device, desc: &TargetDesc, usage: wgpu::TextureUsages) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: extent_3d(desc),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: storage_format(desc.format),
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            desc: desc.clone(),
            texture,
            view,
            imported: false,
        }
    }

    /// Wrap a host texture.
    #[must_use]
    pub fn imported(desc: TargetDesc, texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            desc,
            texture,
            view,
            imported: true,
        }
    }

    /// Full-texture copy extent.
    #[must_use]
    pub fn extent(&self) -> wgpu::Extent3d {
        extent_3d(&self.desc)
    }
}

const fn extent_3d(desc: &TargetDesc) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: desc.width,
        height: desc.height,
        depth_or_array_layers: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_is_requested_only_for_kernel_outputs() {
        let half = target_usages(TargetFormat::Rgba16Float, true).unwrap();
        assert!(half.contains(wgpu::TextureUsages::STORAGE_BINDING));
        let velocity = target_usages(TargetFormat::Rg16Float, false).unwrap();
        assert!(!velocity.contains(wgpu::TextureUsages::STORAGE_BINDING));
        assert!(velocity.contains(wgpu::TextureUsages::TEXTURE_BINDING));
    }

    #[test]
    fn missing_storage_support_is_an_error() {
        let reason = target_usages(TargetFormat::Rg32Float, false).unwrap_err();
        assert!(reason.contains("Rg32Float"), "{reason}");
        // Scene depth is only uploaded and sampled.
        assert!(target_usages(TargetFormat::Depth32Float, false).is_ok());
    }

    #[test]
    fn depth_is_stored_as_single_float() {
        assert_eq!(
            storage_format(TargetFormat::Depth32Float),
            wgpu::TextureFormat::R32Float
        );
        assert_eq!(
            storage_format(TargetFormat::Rgba8Unorm),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }
}
