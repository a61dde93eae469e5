//! wgpu implementation of [`FrameBackend`].
//!
//! Every pass is a compute dispatch recorded into one command encoder per
//! frame; `submit_frame` hands the encoder to the queue. Kernels for the
//! fixed passes are compiled on first use, uber variants up front in
//! `prepare_variants`.

use std::sync::mpsc;

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use super::pipeline_helpers::{
    create_compute_pipeline, dispatch_size, filtering_sampler, linear_sampler, storage_texture,
    texture_2d, uniform_buffer,
};
use super::render_context::{RenderContext, RenderContextError};
use super::shader_composer::ShaderComposer;
use super::shaders::{color_output_def, ComputeShader, HISTORY_RGBA8, OUTPUT_RGBA8};
use super::texture::{storage_format, target_usages, GpuTarget};
use crate::error::{AllocationError, ConfigError, FrameFxError};
use crate::postprocess::backend::{FrameBackend, Pass};
use crate::postprocess::target::{TargetDesc, TargetFormat, TargetId};
use crate::postprocess::variants::{FeatureFlags, KernelId, KernelSelector};

struct Kernel {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KernelKey {
    shader: ComputeShader,
    def: Option<&'static str>,
}

impl KernelKey {
    const fn plain(shader: ComputeShader) -> Self {
        Self { shader, def: None }
    }
}

#[derive(Debug, Clone, Copy)]
enum KernelRef {
    Shared(KernelKey),
    Uber(KernelId, FeatureFlags),
}

/// Bindings of one dispatch, in binding order of the kernel's layout.
#[derive(Debug, Clone, Copy)]
enum Binding<'a> {
    Target(TargetId),
    Uniform(&'a [u8]),
    Sampler,
}

struct Frame {
    label: String,
    encoder: wgpu::CommandEncoder,
    passes: usize,
}

/// Executes frames with wgpu compute kernels.
pub struct GpuBackend {
    context: RenderContext,
    composer: ShaderComposer,
    targets: FxHashMap<TargetId, GpuTarget>,
    next_id: u32,
    kernels: FxHashMap<KernelKey, Kernel>,
    uber: FxHashMap<KernelId, (FeatureFlags, Kernel)>,
    sampler: wgpu::Sampler,
    frame: Option<Frame>,
    frames_submitted: u64,
}

fn layout_entries(key: KernelKey) -> Vec<wgpu::BindGroupLayoutEntry> {
    let color = if key.def.is_some() {
        wgpu::TextureFormat::Rgba8Unorm
    } else {
        wgpu::TextureFormat::Rgba16Float
    };
    match key.shader {
        ComputeShader::Copy => vec![texture_2d(0, false), storage_texture(1, color)],
        ComputeShader::ExposureFixed => vec![
            uniform_buffer(0),
            storage_texture(1, wgpu::TextureFormat::Rg32Float),
        ],
        ComputeShader::ExposureLuminance => vec![
            texture_2d(0, false),
            storage_texture(1, wgpu::TextureFormat::R32Float),
            uniform_buffer(2),
        ],
        ComputeShader::ExposureReduce => vec![
            texture_2d(0, false),
            storage_texture(1, wgpu::TextureFormat::R32Float),
        ],
        ComputeShader::ExposureAdapt => vec![
            texture_2d(0, false),
            texture_2d(1, false),
            storage_texture(2, wgpu::TextureFormat::Rg32Float),
            uniform_buffer(3),
        ],
        ComputeShader::Temporal => vec![
            texture_2d(0, false),
            texture_2d(1, false),
            texture_2d(2, false),
            texture_2d(3, false),
            storage_texture(4, wgpu::TextureFormat::Rgba16Float),
            storage_texture(5, color),
            uniform_buffer(6),
        ],
        ComputeShader::Uber => vec![
            texture_2d(0, true),
            texture_2d(1, false),
            texture_2d(2, true),
            filtering_sampler(3),
            storage_texture(4, wgpu::TextureFormat::Rgba16Float),
            uniform_buffer(5),
        ],
        ComputeShader::Fxaa => vec![
            texture_2d(0, false),
            storage_texture(1, color),
            uniform_buffer(2),
        ],
    }
}

impl GpuBackend {
    /// Backend on an existing context.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ShaderComposition`] if the shared shader modules fail
    /// to parse.
    pub fn new(context: RenderContext) -> Result<Self, FrameFxError> {
        let composer = ShaderComposer::new()?;
        let sampler = linear_sampler(&context.device, "framefx linear sampler");
        Ok(Self {
            context,
            composer,
            targets: FxHashMap::default(),
            next_id: 0,
            kernels: FxHashMap::default(),
            uber: FxHashMap::default(),
            sampler,
            frame: None,
            frames_submitted: 0,
        })
    }

    /// Headless backend on the default adapter.
    ///
    /// # Errors
    ///
    /// [`FrameFxError::Gpu`] when no adapter or device is available.
    pub fn new_headless() -> Result<Self, FrameFxError> {
        Self::new(RenderContext::new_blocking()?)
    }

    /// The device and queue.
    #[must_use]
    pub const fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Number of frames submitted so far.
    #[must_use]
    pub const fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Texture behind a target, for hosts that present or sample it.
    #[must_use]
    pub fn texture(&self, id: TargetId) -> Option<&wgpu::Texture> {
        self.targets.get(&id).map(|target| &target.texture)
    }

    /// Register a host texture as a target. The backend never destroys it.
    ///
    /// Only color formats are accepted; pass scene depth as `R32Float`.
    ///
    /// # Errors
    ///
    /// [`AllocationError::InvalidDescriptor`] for unsupported formats or
    /// textures that cannot be bound for sampling.
    pub fn import_texture(
        &mut self,
        label: &str,
        texture: wgpu::Texture,
    ) -> Result<TargetId, AllocationError> {
        let format = TargetFormat::from_wgpu(texture.format()).ok_or_else(|| {
            AllocationError::InvalidDescriptor {
                label: label.to_owned(),
                reason: format!("unsupported texture format {:?}", texture.format()),
            }
        })?;
        if !texture.usage().contains(wgpu::TextureUsages::TEXTURE_BINDING) {
            return Err(AllocationError::InvalidDescriptor {
                label: label.to_owned(),
                reason: "texture is missing TEXTURE_BINDING usage".to_owned(),
            });
        }
        let desc = TargetDesc::new(label, texture.width(), texture.height(), format);
        desc.validate(self.context.max_dimension())?;
        let id = self.allocate_id();
        let _ = self.targets.insert(id, GpuTarget::imported(desc, texture));
        log::debug!("imported {id} '{label}'");
        Ok(id)
    }

    /// Read a target back to the CPU. Blocks until the GPU is idle.
    ///
    /// # Errors
    ///
    /// [`FrameFxError::MissingTarget`] for unknown ids and
    /// [`FrameFxError::Gpu`] if mapping the readback buffer fails.
    pub fn read_texels(&self, id: TargetId) -> Result<Vec<[f32; 4]>, FrameFxError> {
        let target = self.targets.get(&id).ok_or(FrameFxError::MissingTarget(id))?;
        let desc = &target.desc;
        let texel_bytes = desc.format.bytes_per_texel();
        let unpadded = desc.width * texel_bytes;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("framefx readback"),
            size: u64::from(padded) * u64::from(desc.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self.context.create_encoder("framefx readback");
        encoder.copy_texture_to_buffer(
            target.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(desc.height),
                },
            },
            target.extent(),
        );
        let _ = self.context.submit(encoder);

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.context.wait_idle()?;
        rx.recv()
            .map_err(|_| RenderContextError::ReadbackDropped)?
            .map_err(RenderContextError::BufferMap)?;

        let mut texels = Vec::with_capacity(desc.texel_count());
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize).take(desc.height as usize) {
                texels.extend(
                    row[..unpadded as usize]
                        .chunks(texel_bytes as usize)
                        .map(|bytes| desc.format.decode_texel(bytes)),
                );
            }
        }
        buffer.unmap();
        Ok(texels)
    }

    fn allocate_id(&mut self) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Compile a kernel, reporting shader and pipeline validation errors as
    /// configuration errors instead of device panics.
    fn build_kernel(
        &mut self,
        key: KernelKey,
        defs: &[&str],
        label: &str,
    ) -> Result<Kernel, ConfigError> {
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = self.composer.compose(
            device,
            label,
            key.shader.source(),
            key.shader.file_path(),
            defs,
        );
        let kernel = shader.map(|shader| {
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &layout_entries(key),
            });
            let pipeline = create_compute_pipeline(device, label, &shader, &layout);
            Kernel { layout, pipeline }
        });
        let scope = pollster::block_on(device.pop_error_scope());
        let kernel = kernel?;
        if let Some(error) = scope {
            return Err(ConfigError::ShaderComposition {
                file_path: key.shader.file_path().to_owned(),
                message: error.to_string(),
            });
        }
        log::debug!("compiled kernel '{label}'");
        Ok(kernel)
    }

    fn ensure_kernel(&mut self, key: KernelKey) -> Result<(), ConfigError> {
        if self.kernels.contains_key(&key) {
            return Ok(());
        }
        let defs: Vec<&str> = key.def.into_iter().collect();
        let label = match key.def {
            Some(def) => format!("framefx {:?} {def}", key.shader),
            None => format!("framefx {:?}", key.shader),
        };
        let kernel = self.build_kernel(key, &defs, &label)?;
        let _ = self.kernels.insert(key, kernel);
        Ok(())
    }

    fn target(&self, id: TargetId) -> Result<&GpuTarget, FrameFxError> {
        self.targets.get(&id).ok_or(FrameFxError::MissingTarget(id))
    }

    fn dispatch(
        &mut self,
        kernel: KernelRef,
        label: &str,
        bindings: &[Binding<'_>],
        extent: (u32, u32),
    ) -> Result<(), FrameFxError> {
        let (kernel, workgroup) = match kernel {
            KernelRef::Shared(key) => {
                self.ensure_kernel(key)?;
                let kernel = self
                    .kernels
                    .get(&key)
                    .ok_or(FrameFxError::NoActiveFrame)?;
                (kernel, key.shader.workgroup_size())
            }
            KernelRef::Uber(id, features) => {
                let kernel = match self.uber.get(&id) {
                    Some((flags, kernel)) if *flags == features => kernel,
                    _ => return Err(ConfigError::UnregisteredVariant(features).into()),
                };
                (kernel, ComputeShader::Uber.workgroup_size())
            }
        };

        let device = &self.context.device;
        let buffers: Vec<Option<wgpu::Buffer>> = bindings
            .iter()
            .map(|binding| match binding {
                Binding::Uniform(bytes) => {
                    Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(label),
                        contents: bytes,
                        usage: wgpu::BufferUsages::UNIFORM,
                    }))
                }
                Binding::Target(_) | Binding::Sampler => None,
            })
            .collect();

        let mut entries = Vec::with_capacity(bindings.len());
        for (index, (binding, buffer)) in bindings.iter().zip(&buffers).enumerate() {
            let resource = match (binding, buffer) {
                (Binding::Target(id), _) => {
                    let target = self.targets.get(id).ok_or(FrameFxError::MissingTarget(*id))?;
                    wgpu::BindingResource::TextureView(&target.view)
                }
                (Binding::Uniform(_), Some(buffer)) => buffer.as_entire_binding(),
                (Binding::Sampler, _) | (Binding::Uniform(_), None) => {
                    wgpu::BindingResource::Sampler(&self.sampler)
                }
            };
            entries.push(wgpu::BindGroupEntry {
                binding: index as u32,
                resource,
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &kernel.layout,
            entries: &entries,
        });

        let frame = self.frame.as_mut().ok_or(FrameFxError::NoActiveFrame)?;
        let mut pass = frame
            .encoder
            .begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
        pass.set_pipeline(&kernel.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        let (x, y) = dispatch_size(extent, workgroup);
        pass.dispatch_workgroups(x, y, 1);
        drop(pass);
        frame.passes += 1;
        Ok(())
    }

    fn encode_copy(&mut self, source: TargetId, destination: TargetId) -> Result<(), FrameFxError> {
        let Self { targets, frame, .. } = &mut *self;
        let src = targets.get(&source).ok_or(FrameFxError::MissingTarget(source))?;
        let dst = targets
            .get(&destination)
            .ok_or(FrameFxError::MissingTarget(destination))?;
        if src.texture.format() == dst.texture.format() {
            let frame = frame.as_mut().ok_or(FrameFxError::NoActiveFrame)?;
            frame.encoder.copy_texture_to_texture(
                src.texture.as_image_copy(),
                dst.texture.as_image_copy(),
                src.extent(),
            );
            frame.passes += 1;
            return Ok(());
        }
        let extent = dst.desc.extent();
        let def = color_output_def(dst.desc.format, OUTPUT_RGBA8).map_err(|format| {
            ConfigError::UnsupportedFormat {
                role: "copy destination",
                format,
            }
        })?;
        self.dispatch(
            KernelRef::Shared(KernelKey {
                shader: ComputeShader::Copy,
                def,
            }),
            "framefx copy",
            &[Binding::Target(source), Binding::Target(destination)],
            extent,
        )
    }

    fn record(&mut self, pass: &Pass) -> Result<(), FrameFxError> {
        let label = pass.label();
        match pass {
            Pass::Copy {
                source,
                destination,
            } => self.encode_copy(*source, *destination),
            Pass::ExposureFixed {
                output,
                ev100,
                multiplier,
            } => {
                let texel = [*multiplier, *ev100, 0.0, 1.0];
                self.dispatch(
                    KernelRef::Shared(KernelKey::plain(ComputeShader::ExposureFixed)),
                    label,
                    &[Binding::Uniform(bytemuck::cast_slice(&texel)), Binding::Target(*output)],
                    (1, 1),
                )
            }
            Pass::ExposureLuminance {
                source,
                output,
                params,
            } => {
                let extent = self.target(*output)?.desc.extent();
                self.dispatch(
                    KernelRef::Shared(KernelKey::plain(ComputeShader::ExposureLuminance)),
                    label,
                    &[
                        Binding::Target(*source),
                        Binding::Target(*output),
                        Binding::Uniform(bytemuck::bytes_of(params)),
                    ],
                    extent,
                )
            }
            Pass::ExposureReduce { source, output } => self.dispatch(
                KernelRef::Shared(KernelKey::plain(ComputeShader::ExposureReduce)),
                label,
                &[Binding::Target(*source), Binding::Target(*output)],
                (1, 1),
            ),
            Pass::ExposureAdapt {
                average,
                previous,
                output,
                params,
            } => self.dispatch(
                KernelRef::Shared(KernelKey::plain(ComputeShader::ExposureAdapt)),
                label,
                &[
                    Binding::Target(*average),
                    Binding::Target(*previous),
                    Binding::Target(*output),
                    Binding::Uniform(bytemuck::bytes_of(params)),
                ],
                (1, 1),
            ),
            Pass::TemporalBlend {
                source,
                history,
                velocity,
                depth,
                output,
                history_out,
                params,
            } => {
                expect_half_float(self.target(*output)?, "temporal output")?;
                let history_format = self.target(*history_out)?.desc.format;
                let def = color_output_def(history_format, HISTORY_RGBA8).map_err(|format| {
                    ConfigError::UnsupportedFormat {
                        role: "history output",
                        format,
                    }
                })?;
                let extent = self.target(*source)?.desc.extent();
                self.dispatch(
                    KernelRef::Shared(KernelKey {
                        shader: ComputeShader::Temporal,
                        def,
                    }),
                    label,
                    &[
                        Binding::Target(*source),
                        Binding::Target(*history),
                        Binding::Target(*velocity),
                        Binding::Target(*depth),
                        Binding::Target(*output),
                        Binding::Target(*history_out),
                        Binding::Uniform(bytemuck::bytes_of(params)),
                    ],
                    extent,
                )
            }
            Pass::Uber {
                kernel,
                features,
                source,
                exposure,
                spectral_lut,
                output,
                params,
            } => {
                expect_half_float(self.target(*output)?, "uber output")?;
                let lut = self.target(*spectral_lut)?.desc.format;
                if matches!(
                    lut,
                    TargetFormat::Rg32Float | TargetFormat::R32Float | TargetFormat::Depth32Float
                ) {
                    return Err(ConfigError::UnsupportedFormat {
                        role: "spectral lut",
                        format: lut,
                    }
                    .into());
                }
                let extent = self.target(*source)?.desc.extent();
                self.dispatch(
                    KernelRef::Uber(*kernel, *features),
                    label,
                    &[
                        Binding::Target(*source),
                        Binding::Target(*exposure),
                        Binding::Target(*spectral_lut),
                        Binding::Sampler,
                        Binding::Target(*output),
                        Binding::Uniform(bytemuck::bytes_of(params.as_ref())),
                    ],
                    extent,
                )
            }
            Pass::Fxaa {
                source,
                output,
                params,
            } => {
                let target = self.target(*output)?;
                let extent = target.desc.extent();
                let def = color_output_def(target.desc.format, OUTPUT_RGBA8).map_err(|format| {
                    ConfigError::UnsupportedFormat {
                        role: "fxaa output",
                        format,
                    }
                })?;
                self.dispatch(
                    KernelRef::Shared(KernelKey {
                        shader: ComputeShader::Fxaa,
                        def,
                    }),
                    label,
                    &[
                        Binding::Target(*source),
                        Binding::Target(*output),
                        Binding::Uniform(bytemuck::bytes_of(params)),
                    ],
                    extent,
                )
            }
        }
    }
}

fn expect_half_float(target: &GpuTarget, role: &'static str) -> Result<(), ConfigError> {
    if target.desc.format == TargetFormat::Rgba16Float {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedFormat {
            role,
            format: target.desc.format,
        })
    }
}

impl FrameBackend for GpuBackend {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, AllocationError> {
        desc.validate(self.context.max_dimension())?;
        let format = storage_format(desc.format);
        let usage = target_usages(desc.format, self.context.supports_storage(format)).map_err(
            |reason| AllocationError::InvalidDescriptor {
                label: desc.label.clone(),
                reason,
            },
        )?;

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let target = GpuTarget::new(device, desc, usage);
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        let invalid = pollster::block_on(device.pop_error_scope());
        if out_of_memory.is_some() {
            return Err(AllocationError::OutOfMemory {
                label: desc.label.clone(),
            });
        }
        if let Some(error) = invalid {
            return Err(AllocationError::InvalidDescriptor {
                label: desc.label.clone(),
                reason: error.to_string(),
            });
        }
        let id = self.allocate_id();
        let _ = self.targets.insert(id, target);
        log::debug!(
            "created {id} '{}' {}x{} {:?} ({:?} on device)",
            desc.label,
            desc.width,
            desc.height,
            desc.format,
            storage_format(desc.format)
        );
        Ok(id)
    }

    fn release_target(&mut self, id: TargetId) {
        if let Some(target) = self.targets.remove(&id) {
            if !target.imported {
                target.texture.destroy();
            }
            log::debug!("released {id}");
        }
    }

    fn target_desc(&self, id: TargetId) -> Option<&TargetDesc> {
        self.targets.get(&id).map(|target| &target.desc)
    }

    fn upload(&mut self, id: TargetId, texels: &[[f32; 4]]) -> Result<(), FrameFxError> {
        let target = self.target(id)?;
        let desc = &target.desc;
        if texels.len() != desc.texel_count() {
            return Err(ConfigError::DimensionMismatch {
                role: "upload",
                expected: desc.extent(),
                actual: (texels.len() as u32, 1),
            }
            .into());
        }
        let mut bytes =
            Vec::with_capacity(texels.len() * desc.format.bytes_per_texel() as usize);
        for texel in texels {
            desc.format.encode_texel(*texel, &mut bytes);
        }
        self.context.queue.write_texture(
            target.texture.as_image_copy(),
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * desc.format.bytes_per_texel()),
                rows_per_image: Some(desc.height),
            },
            target.extent(),
        );
        Ok(())
    }

    fn prepare_variants(&mut self, selector: &KernelSelector) -> Result<(), ConfigError> {
        self.uber.clear();
        for (flags, id) in selector.registered() {
            let label = format!("framefx uber [{flags}]");
            let kernel = self.build_kernel(
                KernelKey::plain(ComputeShader::Uber),
                &flags.shader_defs(),
                &label,
            )?;
            let _ = self.uber.insert(id, (flags, kernel));
        }
        log::info!("compiled {} uber variants", self.uber.len());
        Ok(())
    }

    fn begin_frame(&mut self, label: &str) {
        let encoder = self.context.create_encoder(label);
        if let Some(stale) = self.frame.replace(Frame {
            label: label.to_owned(),
            encoder,
            passes: 0,
        }) {
            log::warn!(
                "discarding unsubmitted frame '{}' ({} passes) before '{label}'",
                stale.label,
                stale.passes
            );
        }
    }

    fn encode(&mut self, pass: Pass) -> Result<(), FrameFxError> {
        if self.frame.is_none() {
            return Err(FrameFxError::NoActiveFrame);
        }
        self.validate_pass(&pass)?;
        self.record(&pass)
    }

    fn submit_frame(&mut self) -> Result<(), FrameFxError> {
        let frame = self.frame.take().ok_or(FrameFxError::NoActiveFrame)?;
        log::trace!("submitting '{}' with {} passes", frame.label, frame.passes);
        let _ = self.context.submit(frame.encoder);
        self.frames_submitted += 1;
        Ok(())
    }

    fn abandon_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            log::debug!(
                "abandoned frame '{}' with {} recorded passes",
                frame.label,
                frame.passes
            );
        }
    }
}
