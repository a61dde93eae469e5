use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderDefValue,
    ShaderLanguage, ShaderType,
};
use std::borrow::Cow;

use crate::error::ConfigError;

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` and `#ifdef` support.
///
/// Pre-loads the shared WGSL module at construction time. Kernels use
/// `#import framefx::postfx::{...}` to pull in shared code. The composer
/// produces `naga::Module` IR directly, skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path)
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

const MODULES: &[ModuleDef] = &[ModuleDef {
    source: include_str!("../../assets/shaders/modules/postfx_common.wgsl"),
    file_path: "modules/postfx_common.wgsl",
}];

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ShaderComposition`] if a shared module fails to parse.
    pub fn new() -> Result<Self, ConfigError> {
        let mut composer = Composer::default();

        for m in MODULES {
            let added = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map(|_| ());
            if let Err(e) = added {
                return Err(ConfigError::ShaderComposition {
                    file_path: m.file_path.to_owned(),
                    message: e.emit_to_string(&composer),
                });
            }
        }

        Ok(Self { composer })
    }

    /// Compose a shader source (which may contain `#import` and `#ifdef`
    /// directives) with `defs` enabled into a `wgpu::ShaderModule`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ShaderComposition`] with the composer diagnostic.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
        defs: &[&str],
    ) -> Result<wgpu::ShaderModule, ConfigError> {
        let naga_module = self.compose_naga(source, file_path, defs)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module. Useful for testing shader composition without a GPU
    /// device.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ShaderComposition`] with the composer diagnostic.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
        defs: &[&str],
    ) -> Result<naga::Module, ConfigError> {
        let shader_defs = defs
            .iter()
            .map(|def| ((*def).to_owned(), ShaderDefValue::Bool(true)))
            .collect();
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                shader_defs,
                ..Default::default()
            })
            .map_err(|e| ConfigError::ShaderComposition {
                file_path: file_path.to_owned(),
                message: e.emit_to_string(&self.composer),
            })
    }
}
