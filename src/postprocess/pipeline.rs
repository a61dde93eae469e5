//! The per-camera frame driver.
//!
//! [`FramePipeline::render`] records one frame for one camera:
//!
//! 1. exposure: fixed / physical / automatic into the camera's exposure
//!    history,
//! 2. temporal anti-aliasing against the camera's TAA history,
//! 3. one uber pass whose kernel variant is picked from the active effects,
//! 4. FXAA or a copy into the destination.
//!
//! Each stage reads the "current color" left by the previous one and, if it
//! runs, writes the next scratch target. The reset-history flag is consumed
//! at the end of every call, whether the frame succeeded or not. History
//! that was not written by the camera's previous frame is seeded again.

use glam::Vec2;
use rustc_hash::FxHashMap;

use super::backend::{FrameBackend, Pass, PassKind};
use super::camera::{AntialiasingMode, CameraId, PostProcessCamera};
use super::history::{HistoryChannel, HistoryPair, HistorySlotAllocator};
use super::ping_pong::PingPongPool;
use super::target::{TargetDesc, TargetFormat, TargetId};
use super::variants::{FeatureFlags, KernelId, KernelSelector};
use crate::effects::exposure::{self, ExposureParams, LUMINANCE_TILE_SIZE};
use crate::effects::fxaa::FxaaParams;
use crate::effects::lens::DEFAULT_SPECTRAL_LUT;
use crate::effects::temporal::TemporalParams;
use crate::effects::{self as fx, EffectFrame};
use crate::error::{AllocationError, ConfigError, FrameFxError};
use crate::options::{ExposureMode, Options};

/// Targets the host provides for one frame. All must match the camera
/// extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInputs {
    /// Scene color, linear HDR.
    pub source: TargetId,
    /// Scene depth (smaller is closer).
    pub depth: TargetId,
    /// Screen-space motion in UV units, current minus previous.
    pub velocity: TargetId,
    /// Where the final image is written.
    pub destination: TargetId,
}

/// What the temporal stage did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalOutcome {
    /// The camera does not use TAA.
    Skipped,
    /// History was (re)seeded with the source; the source passed through.
    Seeded,
    /// The source was blended with last frame's history.
    Blended,
}

/// Summary of a recorded and submitted frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Active uber effects.
    pub features: FeatureFlags,
    /// Uber kernel used; `None` when post-processing is disabled.
    pub kernel: Option<KernelId>,
    /// Exposure target the uber pass read.
    pub exposure: Option<TargetId>,
    /// What the temporal stage did.
    pub temporal: TemporalOutcome,
    /// Color the uber pass read.
    pub uber_input: Option<TargetId>,
    /// Color the final pass read.
    pub final_input: TargetId,
    /// `Copy` or `Fxaa`.
    pub final_pass: PassKind,
    /// Whether history was reset this frame (explicitly, by a camera cut,
    /// or because history was (re)allocated).
    pub history_reset: bool,
    /// Projection jitter to use for this camera's next render, in pixels.
    pub jitter: Vec2,
    /// Number of passes submitted.
    pub pass_count: usize,
}

/// Per-camera scratch resources.
#[derive(Debug)]
struct CameraScratch {
    extent: (u32, u32),
    color: PingPongPool,
    luminance_tiles: TargetId,
    luminance_average: TargetId,
}

impl CameraScratch {
    fn targets(&self) -> [TargetId; 4] {
        let [a, b] = self.color.targets();
        [a, b, self.luminance_tiles, self.luminance_average]
    }
}

/// Shared state of one `render` call.
struct FrameContext<'a> {
    camera: &'a PostProcessCamera,
    options: &'a Options,
    inputs: &'a FrameInputs,
    reset: bool,
}

/// Create every target in `descs`, releasing the ones already created if a
/// later one fails.
fn allocate_all<B: FrameBackend, const N: usize>(
    backend: &mut B,
    descs: [TargetDesc; N],
) -> Result<[TargetId; N], AllocationError> {
    let mut created = Vec::with_capacity(N);
    for desc in &descs {
        match backend.create_target(desc) {
            Ok(id) => created.push(id),
            Err(e) => {
                log::error!("failed to allocate '{}': {e}", desc.label);
                for id in created {
                    backend.release_target(id);
                }
                return Err(e);
            }
        }
    }
    created.try_into().map_err(|_| AllocationError::InvalidDescriptor {
        label: "framefx targets".to_owned(),
        reason: "allocation count mismatch".to_owned(),
    })
}

/// Frame-sequenced post-processing driver.
///
/// Owns per-camera history and scratch bookkeeping; the targets themselves
/// live in the backend passed to each call.
#[derive(Debug)]
pub struct FramePipeline {
    selector: KernelSelector,
    history: HistorySlotAllocator,
    scratch: FxHashMap<CameraId, CameraScratch>,
    reset_history: bool,
    spectral_lut: Option<TargetId>,
    default_spectral_lut: Option<TargetId>,
}

impl FramePipeline {
    /// Pipeline with every uber variant registered and prepared.
    ///
    /// # Errors
    ///
    /// Propagates kernel preparation failures from the backend.
    pub fn new<B: FrameBackend>(backend: &mut B) -> Result<Self, FrameFxError> {
        Self::with_selector(backend, KernelSelector::with_all_variants())
    }

    /// Pipeline restricted to the variants registered in `selector`.
    /// Frames needing any other combination fail with
    /// [`ConfigError::UnregisteredVariant`].
    ///
    /// # Errors
    ///
    /// Propagates kernel preparation failures from the backend.
    pub fn with_selector<B: FrameBackend>(
        backend: &mut B,
        selector: KernelSelector,
    ) -> Result<Self, FrameFxError> {
        backend.prepare_variants(&selector)?;
        log::info!("prepared {} uber variants", selector.len());
        Ok(Self {
            selector,
            history: HistorySlotAllocator::new(),
            scratch: FxHashMap::default(),
            reset_history: false,
            spectral_lut: None,
            default_spectral_lut: None,
        })
    }

    /// Registered uber variants.
    #[must_use]
    pub const fn selector(&self) -> &KernelSelector {
        &self.selector
    }

    /// Seed history from the next rendered frame instead of blending.
    pub fn reset_history(&mut self) {
        self.reset_history = true;
    }

    /// Whether a history reset is pending for the next `render`.
    #[must_use]
    pub const fn history_reset_pending(&self) -> bool {
        self.reset_history
    }

    /// Spectral LUT for chromatic aberration; `None` uses the built-in
    /// red/green/blue ramp.
    pub fn set_spectral_lut(&mut self, lut: Option<TargetId>) {
        self.spectral_lut = lut;
    }

    /// Current history pair of a camera, if allocated.
    #[must_use]
    pub fn history_pair(&self, camera: CameraId, channel: HistoryChannel) -> Option<HistoryPair> {
        self.history.pair(camera, channel)
    }

    /// Free every target owned on behalf of `camera`.
    pub fn release_camera<B: FrameBackend>(&mut self, backend: &mut B, camera: CameraId) {
        self.history
            .release_camera(camera, |id| backend.release_target(id));
        if let Some(scratch) = self.scratch.remove(&camera) {
            for id in scratch.targets() {
                backend.release_target(id);
            }
        }
        log::debug!("released camera {}", camera.0);
    }

    /// Free every target the pipeline owns.
    pub fn release_all<B: FrameBackend>(&mut self, backend: &mut B) {
        let cameras: Vec<CameraId> = self.scratch.keys().copied().collect();
        for camera in cameras {
            self.release_camera(backend, camera);
        }
        if let Some(lut) = self.default_spectral_lut.take() {
            backend.release_target(lut);
        }
    }

    /// Record and submit one frame for `camera`.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] for mismatched inputs or unregistered variants,
    /// [`AllocationError`] when history or scratch targets cannot be
    /// created, and backend submission failures. On error nothing of the
    /// frame is submitted and history keeps last frame's roles; a history
    /// no submitted frame has written yet is seeded by the next frame.
    pub fn render<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        camera: &PostProcessCamera,
        options: &Options,
        inputs: &FrameInputs,
    ) -> Result<FrameReport, FrameFxError> {
        let result = self.render_frame(backend, camera, options, inputs);
        if let Err(e) = &result {
            backend.abandon_frame();
            log::error!("camera {} frame {} failed: {e}", camera.id.0, camera.frame_index);
        }
        self.reset_history = false;
        result
    }

    fn render_frame<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        camera: &PostProcessCamera,
        options: &Options,
        inputs: &FrameInputs,
    ) -> Result<FrameReport, FrameFxError> {
        validate_inputs(backend, camera, inputs)?;

        if !camera.frame_settings.post_process {
            return passthrough(backend, inputs);
        }

        let features = fx::collect_features(options);
        let kernel = self.selector.select(features)?;

        let resized = self
            .history
            .release_mismatched(camera.id, camera.extent(), |id| {
                backend.release_target(id);
            });
        let reset = self.reset_history || camera.camera_cut || resized;
        if reset {
            log::debug!(
                "resetting history for camera {} (requested: {}, cut: {}, resized: {resized})",
                camera.id.0,
                self.reset_history,
                camera.camera_cut
            );
        }

        self.history.swap_camera(camera.id);
        let ctx = FrameContext {
            camera,
            options,
            inputs,
            reset,
        };
        match self.record_frame(backend, ctx, features, kernel) {
            Ok(report) => {
                let channels = [
                    Some(HistoryChannel::Exposure),
                    (camera.antialiasing == AntialiasingMode::Temporal)
                        .then_some(HistoryChannel::TemporalAa),
                ];
                for channel in channels.into_iter().flatten() {
                    self.history.mark_seeded(camera.id, channel, camera.frame_index);
                }
                Ok(report)
            }
            Err(e) => {
                // Nothing was written; keep last frame's roles.
                self.history.swap_camera(camera.id);
                Err(e)
            }
        }
    }

    /// Allocate what the frame needs, then record and submit it.
    fn record_frame<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        mut ctx: FrameContext<'_>,
        features: FeatureFlags,
        kernel: KernelId,
    ) -> Result<FrameReport, FrameFxError> {
        let (camera, options, inputs) = (ctx.camera, ctx.options, ctx.inputs);

        // Everything is allocated before recording starts.
        let lut = self.spectral_lut(backend)?;
        self.ensure_scratch(backend, camera)?;
        let exposure_pair = self.history.get_or_create(
            camera.id,
            HistoryChannel::Exposure,
            camera.extent(),
            || exposure_history(backend),
        )?;
        let exposure_seed =
            self.history
                .needs_seed(camera.id, HistoryChannel::Exposure, camera.frame_index);
        let temporal_pair = if camera.antialiasing == AntialiasingMode::Temporal {
            let format = backend
                .target_desc(inputs.source)
                .map_or(TargetFormat::Rgba16Float, |d| history_format(d.format));
            let pair = self.history.get_or_create(
                camera.id,
                HistoryChannel::TemporalAa,
                camera.extent(),
                || temporal_history(backend, camera.extent(), format),
            )?;
            let seed =
                self.history
                    .needs_seed(camera.id, HistoryChannel::TemporalAa, camera.frame_index);
            Some((pair, seed))
        } else {
            None
        };

        let lut_width = backend.target_desc(lut).map_or(1, |d| d.width);
        let scratch = self
            .scratch
            .get_mut(&camera.id)
            .ok_or(FrameFxError::MissingTarget(inputs.source))?;
        scratch.color.reset();

        let mut rec = Recorder::begin(backend, "framefx frame");

        let exposure_read = stage_exposure(&mut rec, &ctx, scratch, exposure_pair, exposure_seed)?;

        let mut color = inputs.source;
        let temporal = match temporal_pair {
            None => TemporalOutcome::Skipped,
            Some((pair, seed)) => {
                ctx.reset |= seed;
                stage_temporal(&mut rec, &ctx, pair, &mut scratch.color, &mut color)?
            }
        };

        let frame = EffectFrame {
            spectral_lut_width: lut_width,
            ..EffectFrame::new(options, camera.width, camera.height)
        };
        let uber_input = color;
        let output = scratch.color.acquire_next();
        rec.encode(Pass::Uber {
            kernel,
            features,
            source: color,
            exposure: exposure_read,
            spectral_lut: lut,
            output,
            params: Box::new(fx::build_uber_params(&frame, features)),
        })?;
        color = output;

        let final_pass = stage_final(&mut rec, &ctx, color)?;
        let pass_count = rec.submit()?;

        log::trace!(
            "camera {} frame {}: features {features}, taa {temporal:?}, final {final_pass:?}",
            camera.id.0,
            camera.frame_index
        );
        Ok(FrameReport {
            features,
            kernel: Some(kernel),
            exposure: Some(exposure_read),
            temporal,
            uber_input: Some(uber_input),
            final_input: color,
            final_pass,
            history_reset: ctx.reset || exposure_seed,
            jitter: camera.jitter(options.temporal_aa.jitter_sequence_length),
            pass_count,
        })
    }

    /// User LUT if set and still alive, else the built-in one (created on
    /// first use).
    fn spectral_lut<B: FrameBackend>(&mut self, backend: &mut B) -> Result<TargetId, FrameFxError> {
        if let Some(lut) = self.spectral_lut {
            if backend.target_desc(lut).is_some() {
                return Ok(lut);
            }
            log::warn!("spectral LUT {lut} no longer exists; using built-in LUT");
            self.spectral_lut = None;
        }
        if let Some(lut) = self.default_spectral_lut {
            return Ok(lut);
        }
        let desc = TargetDesc::new(
            "framefx spectral lut",
            DEFAULT_SPECTRAL_LUT.len() as u32,
            1,
            TargetFormat::Rgba16Float,
        );
        let [lut] = allocate_all(backend, [desc])?;
        backend.upload(lut, &DEFAULT_SPECTRAL_LUT)?;
        log::debug!("created built-in spectral LUT {lut}");
        self.default_spectral_lut = Some(lut);
        Ok(lut)
    }

    fn ensure_scratch<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        camera: &PostProcessCamera,
    ) -> Result<(), FrameFxError> {
        let extent = camera.extent();
        if let Some(existing) = self.scratch.get(&camera.id) {
            if existing.extent == extent {
                return Ok(());
            }
        }
        if let Some(stale) = self.scratch.remove(&camera.id) {
            for id in stale.targets() {
                backend.release_target(id);
            }
        }
        let tiles = (
            extent.0.div_ceil(LUMINANCE_TILE_SIZE),
            extent.1.div_ceil(LUMINANCE_TILE_SIZE),
        );
        let [a, b, tiles, average] = allocate_all(
            backend,
            [
                TargetDesc::new("framefx scratch 0", extent.0, extent.1, TargetFormat::Rgba16Float),
                TargetDesc::new("framefx scratch 1", extent.0, extent.1, TargetFormat::Rgba16Float),
                TargetDesc::new("framefx luminance tiles", tiles.0, tiles.1, TargetFormat::R32Float),
                TargetDesc::new("framefx luminance average", 1, 1, TargetFormat::R32Float),
            ],
        )?;
        let _ = self.scratch.insert(
            camera.id,
            CameraScratch {
                extent,
                color: PingPongPool::new(a, b),
                luminance_tiles: tiles,
                luminance_average: average,
            },
        );
        Ok(())
    }
}

/// Counts passes recorded into one backend frame.
struct Recorder<'b, B: FrameBackend> {
    backend: &'b mut B,
    passes: usize,
}

impl<'b, B: FrameBackend> Recorder<'b, B> {
    fn begin(backend: &'b mut B, label: &str) -> Self {
        backend.begin_frame(label);
        Self { backend, passes: 0 }
    }

    fn encode(&mut self, pass: Pass) -> Result<(), FrameFxError> {
        self.backend.encode(pass)?;
        self.passes += 1;
        Ok(())
    }

    fn submit(self) -> Result<usize, FrameFxError> {
        self.backend.submit_frame()?;
        Ok(self.passes)
    }
}

fn passthrough<B: FrameBackend>(
    backend: &mut B,
    inputs: &FrameInputs,
) -> Result<FrameReport, FrameFxError> {
    let mut rec = Recorder::begin(backend, "framefx passthrough");
    rec.encode(Pass::Copy {
        source: inputs.source,
        destination: inputs.destination,
    })?;
    let pass_count = rec.submit()?;
    Ok(FrameReport {
        features: FeatureFlags::NONE,
        kernel: None,
        exposure: None,
        temporal: TemporalOutcome::Skipped,
        uber_input: None,
        final_input: inputs.source,
        final_pass: PassKind::Copy,
        history_reset: false,
        jitter: Vec2::ZERO,
        pass_count,
    })
}

/// Write this frame's exposure and return the target the uber pass reads.
///
/// Computed exposures are read back the same frame. Metered exposure is
/// read one frame late, matching the exposure the source was lit with; on
/// reset frames both slots get the fresh value.
fn stage_exposure<B: FrameBackend>(
    rec: &mut Recorder<'_, B>,
    ctx: &FrameContext<'_>,
    scratch: &CameraScratch,
    pair: HistoryPair,
    fresh: bool,
) -> Result<TargetId, FrameFxError> {
    let options = &ctx.options.exposure;
    let fixed = if ctx.camera.frame_settings.exposure_control {
        let ev100 = match options.mode {
            ExposureMode::Fixed => Some(options.fixed_ev100),
            ExposureMode::UsePhysicalCamera => Some(exposure::physical_ev100(&ctx.camera.physical)),
            ExposureMode::Automatic => None,
        };
        ev100.map(|ev| (ev, exposure::ev100_to_multiplier(ev)))
    } else {
        Some((exposure::neutral_ev100(), 1.0))
    };

    if let Some((ev100, multiplier)) = fixed {
        rec.encode(Pass::ExposureFixed {
            output: pair.current,
            ev100,
            multiplier,
        })?;
        return Ok(pair.current);
    }

    let reset = ctx.reset || fresh;
    let params = ExposureParams::new(options, ctx.camera.delta_time, reset);
    rec.encode(Pass::ExposureLuminance {
        source: ctx.inputs.source,
        output: scratch.luminance_tiles,
        params,
    })?;
    rec.encode(Pass::ExposureReduce {
        source: scratch.luminance_tiles,
        output: scratch.luminance_average,
    })?;
    rec.encode(Pass::ExposureAdapt {
        average: scratch.luminance_average,
        previous: pair.previous,
        output: pair.current,
        params,
    })?;
    if reset {
        rec.encode(Pass::Copy {
            source: pair.current,
            destination: pair.previous,
        })?;
    }
    Ok(pair.previous)
}

fn stage_temporal<B: FrameBackend>(
    rec: &mut Recorder<'_, B>,
    ctx: &FrameContext<'_>,
    pair: HistoryPair,
    scratch: &mut PingPongPool,
    color: &mut TargetId,
) -> Result<TemporalOutcome, FrameFxError> {
    if ctx.reset {
        for destination in [pair.current, pair.previous] {
            rec.encode(Pass::Copy {
                source: *color,
                destination,
            })?;
        }
        return Ok(TemporalOutcome::Seeded);
    }
    let output = scratch.acquire_next();
    rec.encode(Pass::TemporalBlend {
        source: *color,
        history: pair.previous,
        velocity: ctx.inputs.velocity,
        depth: ctx.inputs.depth,
        output,
        history_out: pair.current,
        params: TemporalParams::new(
            &ctx.options.temporal_aa,
            ctx.camera.width,
            ctx.camera.height,
        ),
    })?;
    *color = output;
    Ok(TemporalOutcome::Blended)
}

fn stage_final<B: FrameBackend>(
    rec: &mut Recorder<'_, B>,
    ctx: &FrameContext<'_>,
    color: TargetId,
) -> Result<PassKind, FrameFxError> {
    let destination = ctx.inputs.destination;
    let pass = if ctx.camera.antialiasing == AntialiasingMode::Fxaa {
        Pass::Fxaa {
            source: color,
            output: destination,
            params: FxaaParams::new(&ctx.options.fxaa, ctx.camera.width, ctx.camera.height),
        }
    } else {
        Pass::Copy {
            source: color,
            destination,
        }
    };
    let kind = pass.kind();
    rec.encode(pass)?;
    Ok(kind)
}

fn validate_inputs<B: FrameBackend>(
    backend: &B,
    camera: &PostProcessCamera,
    inputs: &FrameInputs,
) -> Result<(), FrameFxError> {
    let expected = camera.extent();
    for (role, id) in [
        ("source", inputs.source),
        ("depth", inputs.depth),
        ("velocity", inputs.velocity),
        ("destination", inputs.destination),
    ] {
        let desc = backend
            .target_desc(id)
            .ok_or(FrameFxError::MissingTarget(id))?;
        if desc.extent() != expected {
            return Err(ConfigError::DimensionMismatch {
                role,
                expected,
                actual: desc.extent(),
            }
            .into());
        }
    }
    let source = backend
        .target_desc(inputs.source)
        .ok_or(FrameFxError::MissingTarget(inputs.source))?;
    if source.format.is_depth() || source.format.channel_count() < 3 {
        return Err(ConfigError::UnsupportedFormat {
            role: "source",
            format: source.format,
        }
        .into());
    }
    Ok(())
}

/// History keeps the source format when kernels can write it.
const fn history_format(source: TargetFormat) -> TargetFormat {
    if source.supports_storage() && source.channel_count() == 4 {
        source
    } else {
        TargetFormat::Rgba16Float
    }
}

fn exposure_history<B: FrameBackend>(backend: &mut B) -> Result<[TargetId; 2], AllocationError> {
    allocate_all(
        backend,
        [
            TargetDesc::new("framefx exposure history 0", 1, 1, TargetFormat::Rg32Float),
            TargetDesc::new("framefx exposure history 1", 1, 1, TargetFormat::Rg32Float),
        ],
    )
}

fn temporal_history<B: FrameBackend>(
    backend: &mut B,
    extent: (u32, u32),
    format: TargetFormat,
) -> Result<[TargetId; 2], AllocationError> {
    allocate_all(
        backend,
        [
            TargetDesc::new("framefx taa history 0", extent.0, extent.1, format),
            TargetDesc::new("framefx taa history 1", extent.0, extent.1, format),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_settings::FrameSettings;
    use crate::postprocess::cpu::CpuBackend;
    use crate::postprocess::variants::UberFeature;

    const SIZE: u32 = 8;

    struct Scene {
        backend: CpuBackend,
        inputs: FrameInputs,
    }

    fn scene_with(backend: CpuBackend, color: [f32; 4]) -> Scene {
        let mut backend = backend;
        let mut target = |label: &str, format| {
            backend
                .create_target(&TargetDesc::new(label, SIZE, SIZE, format))
                .unwrap()
        };
        let inputs = FrameInputs {
            source: target("source", TargetFormat::Rgba16Float),
            depth: target("depth", TargetFormat::Depth32Float),
            velocity: target("velocity", TargetFormat::Rg16Float),
            destination: target("destination", TargetFormat::Rgba16Float),
        };
        let texels = vec![color; (SIZE * SIZE) as usize];
        backend.upload(inputs.source, &texels).unwrap();
        Scene { backend, inputs }
    }

    fn scene(color: [f32; 4]) -> Scene {
        scene_with(CpuBackend::new(), color)
    }

    fn camera(mode: AntialiasingMode) -> PostProcessCamera {
        PostProcessCamera::new(CameraId(1), SIZE, SIZE).with_antialiasing(mode)
    }

    fn kinds(backend: &CpuBackend) -> Vec<PassKind> {
        backend.last_frame_passes().iter().map(Pass::kind).collect()
    }

    #[test]
    fn first_temporal_frame_seeds_both_history_slots() {
        let mut s = scene([0.5, 0.25, 0.125, 1.0]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let cam = camera(AntialiasingMode::Temporal);

        let report = pipeline
            .render(&mut s.backend, &cam, &Options::default(), &s.inputs)
            .unwrap();
        assert_eq!(report.temporal, TemporalOutcome::Seeded);
        assert!(report.history_reset);
        assert_eq!(report.uber_input, Some(s.inputs.source));

        let pair = pipeline
            .history_pair(cam.id, HistoryChannel::TemporalAa)
            .unwrap();
        let source = s.backend.texels(s.inputs.source).unwrap().to_vec();
        assert_eq!(s.backend.texels(pair.current).unwrap(), source.as_slice());
        assert_eq!(s.backend.texels(pair.previous).unwrap(), source.as_slice());
    }

    #[test]
    fn explicit_reset_reseeds_and_is_consumed() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut cam = camera(AntialiasingMode::Temporal);
        let options = Options::default();

        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        cam.advance(1.0 / 60.0);
        let second = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(second.temporal, TemporalOutcome::Blended);
        assert!(!second.history_reset);

        s.backend
            .upload(s.inputs.source, &vec![[0.125, 0.75, 0.25, 1.0]; 64])
            .unwrap();
        pipeline.reset_history();
        assert!(pipeline.history_reset_pending());
        cam.advance(1.0 / 60.0);
        let third = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(third.temporal, TemporalOutcome::Seeded);
        assert!(!pipeline.history_reset_pending());

        let pair = pipeline
            .history_pair(cam.id, HistoryChannel::TemporalAa)
            .unwrap();
        let source = s.backend.texels(s.inputs.source).unwrap().to_vec();
        assert_eq!(s.backend.texels(pair.current).unwrap(), source.as_slice());
        assert_eq!(s.backend.texels(pair.previous).unwrap(), source.as_slice());
    }

    #[test]
    fn camera_cut_and_resize_reseed_history() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut cam = camera(AntialiasingMode::Temporal);
        let options = Options::default();
        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();

        cam.advance(0.016);
        cam.camera_cut = true;
        let cut = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(cut.temporal, TemporalOutcome::Seeded);

        // New extent: inputs have to follow the camera.
        let mut target = |label: &str, format| {
            s.backend
                .create_target(&TargetDesc::new(label, 4, 4, format))
                .unwrap()
        };
        let small = FrameInputs {
            source: target("source", TargetFormat::Rgba16Float),
            depth: target("depth", TargetFormat::Depth32Float),
            velocity: target("velocity", TargetFormat::Rg16Float),
            destination: target("destination", TargetFormat::Rgba16Float),
        };
        let old = pipeline
            .history_pair(cam.id, HistoryChannel::TemporalAa)
            .unwrap();
        cam.advance(0.016);
        cam.width = 4;
        cam.height = 4;
        let resized = pipeline.render(&mut s.backend, &cam, &options, &small).unwrap();
        assert_eq!(resized.temporal, TemporalOutcome::Seeded);
        assert!(resized.history_reset);
        assert!(s.backend.target_desc(old.current).is_none());
        assert!(s.backend.target_desc(old.previous).is_none());
        let new = pipeline
            .history_pair(cam.id, HistoryChannel::TemporalAa)
            .unwrap();
        assert_eq!(s.backend.target_desc(new.current).unwrap().extent(), (4, 4));
    }

    #[test]
    fn blended_frame_writes_history_and_ping_pongs() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut cam = camera(AntialiasingMode::Temporal);
        let options = Options::default();
        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        cam.advance(0.016);
        let report = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();

        let passes = s.backend.last_frame_passes();
        let Some(Pass::TemporalBlend {
            output,
            history_out,
            history,
            ..
        }) = passes.iter().find(|p| p.kind() == PassKind::TemporalBlend)
        else {
            panic!("no temporal pass in {passes:?}");
        };
        let pair = pipeline
            .history_pair(cam.id, HistoryChannel::TemporalAa)
            .unwrap();
        assert_eq!(*history_out, pair.current);
        assert_eq!(*history, pair.previous);
        assert_eq!(report.uber_input, Some(*output));

        let Some(Pass::Uber { output: uber_out, .. }) =
            passes.iter().find(|p| p.kind() == PassKind::Uber)
        else {
            panic!("no uber pass");
        };
        assert_ne!(uber_out, output);
        assert_eq!(report.final_input, *uber_out);
    }

    #[test]
    fn fixed_and_physical_exposure_skip_metering() {
        for mode in [ExposureMode::Fixed, ExposureMode::UsePhysicalCamera] {
            let mut s = scene([0.5; 4]);
            let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
            let mut options = Options::default();
            options.exposure.mode = mode;
            let _ = pipeline
                .render(&mut s.backend, &camera(AntialiasingMode::None), &options, &s.inputs)
                .unwrap();
            assert_eq!(
                kinds(&s.backend),
                vec![PassKind::ExposureFixed, PassKind::Uber, PassKind::Copy],
                "{mode:?}"
            );
        }
    }

    #[test]
    fn physical_exposure_follows_camera_body() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut options = Options::default();
        options.exposure.mode = ExposureMode::UsePhysicalCamera;
        let cam = camera(AntialiasingMode::None);
        let report = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        let texel = s.backend.texels(report.exposure.unwrap()).unwrap()[0];
        let ev = exposure::physical_ev100(&cam.physical);
        assert!((texel[1] - ev).abs() < 1e-5);
        assert!((texel[0] - exposure::ev100_to_multiplier(ev)).abs() < 1e-9);
    }

    #[test]
    fn automatic_exposure_meters_then_adapts() {
        let mut s = scene([0.18, 0.18, 0.18, 1.0]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut options = Options::default();
        options.exposure.mode = ExposureMode::Automatic;
        let mut cam = camera(AntialiasingMode::None);

        let first = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(
            kinds(&s.backend),
            vec![
                PassKind::ExposureLuminance,
                PassKind::ExposureReduce,
                PassKind::ExposureAdapt,
                PassKind::Copy,
                PassKind::Uber,
                PassKind::Copy,
            ]
        );
        let pair = pipeline.history_pair(cam.id, HistoryChannel::Exposure).unwrap();
        assert_eq!(first.exposure, Some(pair.previous));
        let metered = s.backend.texels(pair.previous).unwrap()[0][1];
        let expected = ExposureParams::new(&options.exposure, cam.delta_time, true)
            .meter(0.18f32.log2());
        assert!((metered - expected).abs() < 1e-2, "{metered} vs {expected}");

        // Ten times brighter: the next frame moves only part of the way.
        s.backend
            .upload(s.inputs.source, &vec![[1.8, 1.8, 1.8, 1.0]; 64])
            .unwrap();
        cam.advance(1.0 / 60.0);
        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(kinds(&s.backend).len(), 5);
        let pair = pipeline.history_pair(cam.id, HistoryChannel::Exposure).unwrap();
        let adapted = s.backend.texels(pair.current).unwrap()[0][1];
        let target = expected + 10f32.log2();
        assert!(adapted > metered + 1e-3 && adapted < target - 1e-3, "{adapted}");
    }

    #[test]
    fn disabled_exposure_control_is_neutral() {
        let mut s = scene([0.5, 0.5, 0.5, 1.0]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let settings = FrameSettings {
            exposure_control: false,
            ..FrameSettings::default()
        };
        let cam = camera(AntialiasingMode::None).with_frame_settings(settings);
        let mut options = Options::default();
        options.exposure.fixed_ev100 = 10.0;
        let report = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        let texel = s.backend.texels(report.exposure.unwrap()).unwrap()[0];
        assert!((texel[0] - 1.0).abs() < 1e-6);
        let out = s.backend.texels(s.inputs.destination).unwrap()[0];
        assert!((out[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn without_taa_uber_reads_the_source() {
        for mode in [AntialiasingMode::None, AntialiasingMode::Fxaa] {
            let mut s = scene([0.5; 4]);
            let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
            let report = pipeline
                .render(&mut s.backend, &camera(mode), &Options::default(), &s.inputs)
                .unwrap();
            assert_eq!(report.temporal, TemporalOutcome::Skipped);
            assert_eq!(report.uber_input, Some(s.inputs.source));
            assert!(pipeline
                .history_pair(CameraId(1), HistoryChannel::TemporalAa)
                .is_none());
        }
    }

    #[test]
    fn no_effects_selects_the_plain_kernel_and_copies() {
        let mut s = scene([0.6, 0.6, 0.6, 1.0]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let report = pipeline
            .render(
                &mut s.backend,
                &camera(AntialiasingMode::None),
                &Options::default(),
                &s.inputs,
            )
            .unwrap();
        assert_eq!(report.features, FeatureFlags::NONE);
        assert_eq!(
            report.kernel,
            Some(pipeline.selector().select(FeatureFlags::NONE).unwrap())
        );
        assert_eq!(report.final_pass, PassKind::Copy);
        assert_eq!(report.pass_count, 3);
        for texel in s.backend.texels(s.inputs.destination).unwrap() {
            assert!((texel[0] - 0.5).abs() < 1e-3, "{texel:?}");
            assert_eq!(texel[3], 1.0);
        }
    }

    #[test]
    fn fxaa_cameras_end_with_fxaa() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let report = pipeline
            .render(
                &mut s.backend,
                &camera(AntialiasingMode::Fxaa),
                &Options::default(),
                &s.inputs,
            )
            .unwrap();
        assert_eq!(report.final_pass, PassKind::Fxaa);
        assert_eq!(kinds(&s.backend).last(), Some(&PassKind::Fxaa));
        assert_eq!(report.jitter, Vec2::ZERO);
    }

    #[test]
    fn disabled_post_processing_copies_source() {
        let mut s = scene([3.0, 2.0, 1.0, 1.0]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let settings = FrameSettings {
            post_process: false,
            ..FrameSettings::default()
        };
        let cam = camera(AntialiasingMode::Temporal).with_frame_settings(settings);
        let report = pipeline
            .render(&mut s.backend, &cam, &Options::default(), &s.inputs)
            .unwrap();
        assert_eq!(kinds(&s.backend), vec![PassKind::Copy]);
        assert_eq!(report.final_input, s.inputs.source);
        assert_eq!(report.kernel, None);
        assert_eq!(
            s.backend.texels(s.inputs.destination).unwrap(),
            s.backend.texels(s.inputs.source).unwrap()
        );
    }

    #[test]
    fn unregistered_variant_fails_without_submitting() {
        let mut s = scene([0.5; 4]);
        let mut selector = KernelSelector::new();
        let _ = selector.register(FeatureFlags::NONE);
        let mut pipeline = FramePipeline::with_selector(&mut s.backend, selector).unwrap();
        let mut options = Options::default();
        options.vignette.intensity = 0.4;

        pipeline.reset_history();
        let err = pipeline
            .render(&mut s.backend, &camera(AntialiasingMode::None), &options, &s.inputs)
            .unwrap_err();
        let vignette = FeatureFlags::from(UberFeature::Vignette);
        assert!(matches!(
            err,
            FrameFxError::Config(ConfigError::UnregisteredVariant(flags)) if flags == vignette
        ));
        assert_eq!(s.backend.frames_submitted(), 0);
        // The pending reset is consumed even though the frame failed.
        assert!(!pipeline.history_reset_pending());
    }

    /// Inputs whose destination cannot take the final copy, so recording
    /// fails after the history passes were encoded.
    fn unwritable_destination(s: &Scene) -> FrameInputs {
        FrameInputs {
            destination: s.inputs.velocity,
            ..s.inputs
        }
    }

    #[test]
    fn frame_after_a_failed_first_frame_seeds_temporal_history() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut cam = camera(AntialiasingMode::Temporal);
        let options = Options::default();

        let broken = unwritable_destination(&s);
        let err = pipeline.render(&mut s.backend, &cam, &options, &broken).unwrap_err();
        assert!(matches!(err, FrameFxError::Config(ConfigError::UnsupportedFormat { .. })));
        assert_eq!(s.backend.frames_submitted(), 0);
        assert!(pipeline
            .history_pair(cam.id, HistoryChannel::TemporalAa)
            .is_some());

        cam.advance(1.0 / 60.0);
        let report = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(report.temporal, TemporalOutcome::Seeded);
        assert!(report.history_reset);

        let mut fresh = scene([0.5; 4]);
        let mut reference = FramePipeline::new(&mut fresh.backend).unwrap();
        let _ = reference
            .render(&mut fresh.backend, &cam, &options, &fresh.inputs)
            .unwrap();
        assert_eq!(
            s.backend.texels(s.inputs.destination).unwrap(),
            fresh.backend.texels(fresh.inputs.destination).unwrap()
        );
    }

    #[test]
    fn frame_after_a_failed_first_frame_seeds_automatic_exposure() {
        let mut s = scene([0.18, 0.18, 0.18, 1.0]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut options = Options::default();
        options.exposure.mode = ExposureMode::Automatic;
        let mut cam = camera(AntialiasingMode::None);

        let broken = unwritable_destination(&s);
        let _ = pipeline.render(&mut s.backend, &cam, &options, &broken).unwrap_err();
        cam.advance(1.0 / 60.0);
        let report = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert!(report.history_reset);

        let pair = pipeline.history_pair(cam.id, HistoryChannel::Exposure).unwrap();
        let passes = s.backend.last_frame_passes();
        assert!(passes.iter().any(|p| matches!(
            p,
            Pass::Copy { source, destination }
                if *source == pair.current && *destination == pair.previous
        )));
        let texels = |id| s.backend.texels(id).unwrap()[0];
        assert_eq!(texels(pair.previous), texels(pair.current));
        assert!(texels(pair.previous)[0] > 0.0);
    }

    #[test]
    fn failed_frame_keeps_last_frames_history_roles() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut cam = camera(AntialiasingMode::Temporal);
        let options = Options::default();
        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        let seeded = pipeline
            .history_pair(cam.id, HistoryChannel::TemporalAa)
            .unwrap();

        cam.advance(1.0 / 60.0);
        let broken = unwritable_destination(&s);
        let _ = pipeline.render(&mut s.backend, &cam, &options, &broken).unwrap_err();
        assert_eq!(
            pipeline.history_pair(cam.id, HistoryChannel::TemporalAa),
            Some(seeded)
        );

        // Retrying the same frame blends against the seeded slot.
        let report = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(report.temporal, TemporalOutcome::Blended);
        let history = s.backend.last_frame_passes().iter().find_map(|p| match p {
            Pass::TemporalBlend { history, .. } => Some(*history),
            _ => None,
        });
        assert_eq!(history, Some(seeded.current));
    }

    #[test]
    fn returning_to_temporal_aa_reseeds_history() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut cam = camera(AntialiasingMode::Temporal);
        let options = Options::default();
        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();

        cam.advance(1.0 / 60.0);
        cam.antialiasing = AntialiasingMode::None;
        let off = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(off.temporal, TemporalOutcome::Skipped);

        cam.advance(1.0 / 60.0);
        cam.antialiasing = AntialiasingMode::Temporal;
        let back = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(back.temporal, TemporalOutcome::Seeded);
        assert!(back.history_reset);

        cam.advance(1.0 / 60.0);
        let next = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(next.temporal, TemporalOutcome::Blended);
    }

    #[test]
    fn skipped_camera_frames_reseed_history() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut cam = camera(AntialiasingMode::Temporal);
        let options = Options::default();
        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();

        cam.advance(1.0 / 60.0);
        cam.advance(1.0 / 60.0);
        let report = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(report.temporal, TemporalOutcome::Seeded);
    }

    #[test]
    fn history_allocation_failure_is_reported() {
        // Inputs, LUT, scratch, exposure history and one TAA slot fit; the
        // second TAA slot does not.
        let mut s = scene_with(CpuBackend::new().with_memory_budget(3375), [0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let live_before = s.backend.live_targets();
        let err = pipeline
            .render(
                &mut s.backend,
                &camera(AntialiasingMode::Temporal),
                &Options::default(),
                &s.inputs,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            FrameFxError::Allocation(AllocationError::OutOfMemory { .. })
        ));
        assert_eq!(s.backend.frames_submitted(), 0);
        assert!(pipeline
            .history_pair(CameraId(1), HistoryChannel::TemporalAa)
            .is_none());
        // LUT, scratch and exposure history stay; the partial TAA pair was freed.
        assert_eq!(s.backend.live_targets(), live_before + 7);
    }

    #[test]
    fn mismatched_input_extent_is_a_config_error() {
        let mut s = scene([0.5; 4]);
        let velocity = s
            .backend
            .create_target(&TargetDesc::new("velocity", 4, 8, TargetFormat::Rg16Float))
            .unwrap();
        let inputs = FrameInputs { velocity, ..s.inputs };
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let err = pipeline
            .render(
                &mut s.backend,
                &camera(AntialiasingMode::Temporal),
                &Options::default(),
                &inputs,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            FrameFxError::Config(ConfigError::DimensionMismatch { role: "velocity", .. })
        ));
    }

    #[test]
    fn depth_is_not_a_color_source() {
        let mut s = scene([0.5; 4]);
        let inputs = FrameInputs {
            source: s.inputs.depth,
            ..s.inputs
        };
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let err = pipeline
            .render(
                &mut s.backend,
                &camera(AntialiasingMode::None),
                &Options::default(),
                &inputs,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            FrameFxError::Config(ConfigError::UnsupportedFormat { role: "source", .. })
        ));
    }

    #[test]
    fn custom_spectral_lut_replaces_the_default() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let mut options = Options::default();
        options.chromatic_aberration.intensity = 0.5;
        let cam = camera(AntialiasingMode::None);

        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        let uber_lut = |backend: &CpuBackend| {
            backend
                .last_frame_passes()
                .iter()
                .find_map(|p| match p {
                    Pass::Uber { spectral_lut, .. } => Some(*spectral_lut),
                    _ => None,
                })
                .unwrap()
        };
        let default_lut = uber_lut(&s.backend);
        assert_eq!(s.backend.target_desc(default_lut).unwrap().width, 3);

        let custom = s
            .backend
            .create_target(&TargetDesc::new("lut", 5, 1, TargetFormat::Rgba16Float))
            .unwrap();
        s.backend.upload(custom, &[[1.0; 4]; 5]).unwrap();
        pipeline.set_spectral_lut(Some(custom));
        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(uber_lut(&s.backend), custom);

        // A released LUT falls back to the built-in one.
        s.backend.release_target(custom);
        let _ = pipeline.render(&mut s.backend, &cam, &options, &s.inputs).unwrap();
        assert_eq!(uber_lut(&s.backend), default_lut);
    }

    #[test]
    fn jitter_is_reported_for_temporal_cameras() {
        let mut s = scene([0.5; 4]);
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let cam = camera(AntialiasingMode::Temporal);
        let report = pipeline
            .render(&mut s.backend, &cam, &Options::default(), &s.inputs)
            .unwrap();
        assert_eq!(report.jitter, cam.jitter(8));
        assert_ne!(report.jitter, Vec2::ZERO);
    }

    #[test]
    fn releasing_cameras_frees_their_targets() {
        let mut s = scene([0.5; 4]);
        let baseline = s.backend.live_targets();
        let mut pipeline = FramePipeline::new(&mut s.backend).unwrap();
        let _ = pipeline
            .render(
                &mut s.backend,
                &camera(AntialiasingMode::Temporal),
                &Options::default(),
                &s.inputs,
            )
            .unwrap();
        // LUT + 4 scratch + 2 exposure + 2 TAA.
        assert_eq!(s.backend.live_targets(), baseline + 9);

        pipeline.release_camera(&mut s.backend, CameraId(1));
        assert_eq!(s.backend.live_targets(), baseline + 1);
        pipeline.release_all(&mut s.backend);
        assert_eq!(s.backend.live_targets(), baseline);
    }

    #[test]
    fn history_format_falls_back_to_half_float() {
        assert_eq!(history_format(TargetFormat::Rgba16Float), TargetFormat::Rgba16Float);
        assert_eq!(history_format(TargetFormat::Rgba8Unorm), TargetFormat::Rgba8Unorm);
        assert_eq!(history_format(TargetFormat::Rg16Float), TargetFormat::Rgba16Float);
    }
}
