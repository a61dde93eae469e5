//! wgpu execution of post-processing frames.
//!
//! [`backend::GpuBackend`] implements the frame backend with one compute
//! kernel per pass; the remaining modules hold device setup, shader
//! composition and binding boilerplate.

/// Compute backend.
pub mod backend;
/// Shared wgpu boilerplate for compute kernels.
pub mod pipeline_helpers;
/// Headless device and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Embedded kernel sources and their shader-def variants.
pub mod shaders;
/// Textures behind target ids.
pub mod texture;

pub use backend::GpuBackend;
pub use render_context::{RenderContext, RenderContextError};
