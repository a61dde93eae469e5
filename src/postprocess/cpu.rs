//! Software backend: executes passes on in-memory images.
//!
//! Mirrors the WGSL kernels closely enough to reason about pipeline
//! behavior (which target fed which pass, what history holds) without a
//! GPU. Also keeps the passes of the last submitted frame for inspection.

use rustc_hash::FxHashMap;

use super::backend::{FrameBackend, Pass};
use super::target::{TargetDesc, TargetId};
use super::variants::{FeatureFlags, KernelId, KernelSelector, UberFeature};
use crate::effects::exposure::{self, ExposureParams, MIN_LUMINANCE};
use crate::effects::fxaa::{self, FxaaParams};
use crate::effects::temporal::TemporalParams;
use crate::effects::{color_grading, lens, UberParams};
use crate::error::{AllocationError, ConfigError, FrameFxError};

/// Largest extent the software backend accepts on either axis.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

#[derive(Debug)]
struct Image {
    desc: TargetDesc,
    texels: Vec<[f32; 4]>,
}

impl Image {
    fn fetch(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, i64::from(self.desc.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.desc.height) - 1) as usize;
        self.texels[y * self.desc.width as usize + x]
    }

    fn fetch_uv(&self, uv: [f32; 2]) -> [f32; 4] {
        let x = (uv[0] * self.desc.width as f32).floor() as i64;
        let y = (uv[1] * self.desc.height as f32).floor() as i64;
        self.fetch(x, y)
    }

    /// Bilinear sample with clamp-to-edge addressing.
    fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        let px = uv[0] * self.desc.width as f32 - 0.5;
        let py = uv[1] * self.desc.height as f32 - 0.5;
        let (x0, y0) = (px.floor(), py.floor());
        let (fx, fy) = (px - x0, py - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);
        let a = self.fetch(x0, y0);
        let b = self.fetch(x0 + 1, y0);
        let c = self.fetch(x0, y0 + 1);
        let d = self.fetch(x0 + 1, y0 + 1);
        std::array::from_fn(|i| {
            let top = a[i] + (b[i] - a[i]) * fx;
            let bottom = c[i] + (d[i] - c[i]) * fx;
            top + (bottom - top) * fy
        })
    }
}

fn rgb(t: [f32; 4]) -> [f32; 3] {
    [t[0], t[1], t[2]]
}

/// Reference backend running every pass on the CPU.
#[derive(Debug)]
pub struct CpuBackend {
    images: FxHashMap<TargetId, Image>,
    next_id: u32,
    max_dimension: u32,
    memory_budget: Option<usize>,
    kernels: FxHashMap<KernelId, FeatureFlags>,
    recording: Option<Vec<Pass>>,
    last_frame: Vec<Pass>,
    frames_submitted: u64,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    /// Backend without a memory budget.
    #[must_use]
    pub fn new() -> Self {
        Self {
            images: FxHashMap::default(),
            next_id: 0,
            max_dimension: DEFAULT_MAX_DIMENSION,
            memory_budget: None,
            kernels: FxHashMap::default(),
            recording: None,
            last_frame: Vec::new(),
            frames_submitted: 0,
        }
    }

    /// Builder: cap on total target memory in bytes. Allocations past the
    /// cap fail with [`AllocationError::OutOfMemory`].
    #[must_use]
    pub const fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Builder: largest accepted extent on either axis.
    #[must_use]
    pub const fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Contents of a target.
    #[must_use]
    pub fn texels(&self, id: TargetId) -> Option<&[[f32; 4]]> {
        self.images.get(&id).map(|image| image.texels.as_slice())
    }

    /// Passes executed by the last successful `submit_frame`.
    #[must_use]
    pub fn last_frame_passes(&self) -> &[Pass] {
        &self.last_frame
    }

    /// Number of frames submitted so far.
    #[must_use]
    pub const fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Number of live targets.
    #[must_use]
    pub fn live_targets(&self) -> usize {
        self.images.len()
    }

    /// Bytes held by live targets, at their storage format's size.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.images.values().map(|image| footprint(&image.desc)).sum()
    }

    fn image(&self, id: TargetId) -> Result<&Image, FrameFxError> {
        self.images.get(&id).ok_or(FrameFxError::MissingTarget(id))
    }

    fn store(&mut self, id: TargetId, texels: Vec<[f32; 4]>) -> Result<(), FrameFxError> {
        let image = self
            .images
            .get_mut(&id)
            .ok_or(FrameFxError::MissingTarget(id))?;
        let format = image.desc.format;
        image.texels = texels.into_iter().map(|t| format.quantize(t)).collect();
        Ok(())
    }

    fn execute(&mut self, pass: &Pass) -> Result<(), FrameFxError> {
        match pass {
            Pass::Copy {
                source,
                destination,
            } => self.copy(*source, *destination),
            Pass::ExposureFixed {
                output,
                ev100,
                multiplier,
            } => {
                let len = self.image(*output)?.texels.len();
                self.store(*output, vec![[*multiplier, *ev100, 0.0, 1.0]; len])
            }
            Pass::ExposureLuminance {
                source,
                output,
                params,
            } => {
                let texels = self.luminance_tiles(*source, *output, params)?;
                self.store(*output, texels)
            }
            Pass::ExposureReduce { source, output } => {
                let coarse = &self.image(*source)?.texels;
                let average =
                    coarse.iter().map(|t| t[0]).sum::<f32>() / coarse.len().max(1) as f32;
                let len = self.image(*output)?.texels.len();
                self.store(*output, vec![[average, 0.0, 0.0, 1.0]; len])
            }
            Pass::ExposureAdapt {
                average,
                previous,
                output,
                params,
            } => {
                let avg = self.image(*average)?.fetch(0, 0)[0];
                let previous_ev = self.image(*previous)?.fetch(0, 0)[1];
                let ev = exposure::adapt(previous_ev, params.meter(avg), params);
                let len = self.image(*output)?.texels.len();
                self.store(*output, vec![exposure::exposure_texel(ev); len])
            }
            Pass::TemporalBlend {
                source,
                history,
                velocity,
                depth,
                output,
                history_out,
                params,
            } => {
                let blended = self.temporal(*source, *history, *velocity, *depth, params)?;
                self.store(*history_out, blended.clone())?;
                self.store(*output, blended)
            }
            Pass::Uber {
                features,
                source,
                exposure,
                spectral_lut,
                output,
                params,
                ..
            } => {
                let texels = self.uber(*features, *source, *exposure, *spectral_lut, params)?;
                self.store(*output, texels)
            }
            Pass::Fxaa {
                source,
                output,
                params,
            } => {
                let texels = self.fxaa(*source, params)?;
                self.store(*output, texels)
            }
        }
    }

    fn copy(&mut self, source: TargetId, destination: TargetId) -> Result<(), FrameFxError> {
        let src = self.image(source)?;
        let same_format = src.desc.format == self.image(destination)?.desc.format;
        let texels = src.texels.clone();
        if same_format {
            // Texel-exact.
            if let Some(dst) = self.images.get_mut(&destination) {
                dst.texels = texels;
            }
            Ok(())
        } else {
            self.store(destination, texels)
        }
    }

    fn luminance_tiles(
        &self,
        source: TargetId,
        output: TargetId,
        params: &ExposureParams,
    ) -> Result<Vec<[f32; 4]>, FrameFxError> {
        let src = self.image(source)?;
        let out = &self.image(output)?.desc;
        let tile = params.tile_size.max(1);
        let mut texels = Vec::with_capacity(out.texel_count());
        for ty in 0..out.height {
            for tx in 0..out.width {
                let mut sum = 0.0;
                let mut count = 0u32;
                for y in ty * tile..((ty + 1) * tile).min(src.desc.height) {
                    for x in tx * tile..((tx + 1) * tile).min(src.desc.width) {
                        let luma =
                            color_grading::luminance(rgb(src.fetch(x.into(), y.into())));
                        sum += luma.max(MIN_LUMINANCE).log2();
                        count += 1;
                    }
                }
                let value = if count == 0 {
                    MIN_LUMINANCE.log2()
                } else {
                    sum / count as f32
                };
                texels.push([value, 0.0, 0.0, 1.0]);
            }
        }
        Ok(texels)
    }

    fn temporal(
        &self,
        source: TargetId,
        history: TargetId,
        velocity: TargetId,
        depth: TargetId,
        params: &TemporalParams,
    ) -> Result<Vec<[f32; 4]>, FrameFxError> {
        let src = self.image(source)?;
        let hist = self.image(history)?;
        let vel = self.image(velocity)?;
        let depth = self.image(depth)?;
        let (w, h) = src.desc.extent();
        let mut texels = Vec::with_capacity(src.desc.texel_count());
        for y in 0..i64::from(h) {
            for x in 0..i64::from(w) {
                let center = src.fetch(x, y);
                let mut lo = rgb(center);
                let mut hi = rgb(center);
                let mut cross = [0.0f32; 3];
                let mut closest = (depth.fetch(x, y)[0], x, y);
                for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)]
                {
                    let n = src.fetch(x + dx, y + dy);
                    for i in 0..3 {
                        lo[i] = lo[i].min(n[i]);
                        hi[i] = hi[i].max(n[i]);
                        if dx == 0 || dy == 0 {
                            cross[i] += n[i] * 0.25;
                        }
                    }
                    let d = depth.fetch(x + dx, y + dy)[0];
                    if d < closest.0 {
                        closest = (d, x + dx, y + dy);
                    }
                }

                let mut current = rgb(center);
                for i in 0..3 {
                    current[i] =
                        (current[i] + (current[i] - cross[i]) * params.sharpness).max(0.0);
                }

                let v = vel.fetch(closest.1, closest.2);
                let uv = [
                    (x as f32 + 0.5) * params.inv_size[0],
                    (y as f32 + 0.5) * params.inv_size[1],
                ];
                let prev_uv = [uv[0] - v[0], uv[1] - v[1]];
                let in_bounds = (0.0..=1.0).contains(&prev_uv[0])
                    && (0.0..=1.0).contains(&prev_uv[1]);
                let motion = (v[0] * params.size[0]).hypot(v[1] * params.size[1]);
                let feedback = if in_bounds { params.feedback(motion) } else { 0.0 };

                let previous = hist.fetch_uv(prev_uv);
                let mut out = [0.0, 0.0, 0.0, center[3]];
                for i in 0..3 {
                    let clamped = previous[i].clamp(lo[i], hi[i]);
                    out[i] = current[i] + (clamped - current[i]) * feedback;
                }
                texels.push(out);
            }
        }
        Ok(texels)
    }

    fn uber(
        &self,
        features: FeatureFlags,
        source: TargetId,
        exposure: TargetId,
        spectral_lut: TargetId,
        params: &UberParams,
    ) -> Result<Vec<[f32; 4]>, FrameFxError> {
        let src = self.image(source)?;
        let multiplier = self.image(exposure)?.fetch(0, 0)[0];
        let lut = self.image(spectral_lut)?;
        let distort = features.contains(UberFeature::LensDistortion);
        let (w, h) = src.desc.extent();
        let mut texels = Vec::with_capacity(src.desc.texel_count());
        for y in 0..h {
            for x in 0..w {
                let uv = [(x as f32 + 0.5) * params.screen[2], (y as f32 + 0.5) * params.screen[3]];
                let center = src.fetch(x.into(), y.into());
                let mut color = if features.contains(UberFeature::ChromaticAberration) {
                    let end = lens::aberration_end(params, uv);
                    let diff = [end[0] - uv[0], end[1] - uv[1]];
                    let samples = lens::aberration_samples(params, diff);
                    let delta = [diff[0] / samples as f32, diff[1] / samples as f32];
                    let mut pos = uv;
                    let mut sum = [0.0f32; 3];
                    let mut filter_sum = [0.0f32; 3];
                    for i in 0..samples {
                        let t = (i as f32 + 0.5) / samples as f32;
                        let s = src.sample(lens::distort_uv(params, distort, pos));
                        let filter = lut.sample([t, 0.5]);
                        for c in 0..3 {
                            sum[c] += s[c] * filter[c];
                            filter_sum[c] += filter[c];
                        }
                        pos = [pos[0] + delta[0], pos[1] + delta[1]];
                    }
                    std::array::from_fn(|c| {
                        if filter_sum[c] > 0.0 {
                            sum[c] / filter_sum[c]
                        } else {
                            0.0
                        }
                    })
                } else if distort {
                    rgb(src.sample(lens::distort_uv(params, true, uv)))
                } else {
                    rgb(center)
                };

                color = color.map(|c| c * multiplier);
                if features.contains(UberFeature::ColorGrading) {
                    color = color_grading::apply(params, color);
                }
                if features.contains(UberFeature::Vignette) {
                    color = lens::vignette(params, uv, color);
                }
                texels.push([color[0], color[1], color[2], center[3]]);
            }
        }
        Ok(texels)
    }

    fn fxaa(&self, source: TargetId, params: &FxaaParams) -> Result<Vec<[f32; 4]>, FrameFxError> {
        let src = self.image(source)?;
        let (w, h) = src.desc.extent();
        let mut texels = Vec::with_capacity(src.desc.texel_count());
        for y in 0..i64::from(h) {
            for x in 0..i64::from(w) {
                let center = src.fetch(x, y);
                let neighbors = [
                    src.fetch(x, y - 1),
                    src.fetch(x, y + 1),
                    src.fetch(x + 1, y),
                    src.fetch(x - 1, y),
                ];
                let blend = params.blend(
                    fxaa::luma(rgb(center)),
                    neighbors.map(|n| fxaa::luma(rgb(n))),
                );
                let mut out = center;
                for i in 0..3 {
                    let average = neighbors.iter().map(|n| n[i]).sum::<f32>() * 0.25;
                    out[i] = center[i] + (average - center[i]) * blend;
                }
                texels.push(out);
            }
        }
        Ok(texels)
    }
}

fn footprint(desc: &TargetDesc) -> usize {
    desc.texel_count() * desc.format.bytes_per_texel() as usize
}

impl FrameBackend for CpuBackend {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, AllocationError> {
        desc.validate(self.max_dimension)?;
        if let Some(budget) = self.memory_budget {
            if self.allocated_bytes() + footprint(desc) > budget {
                return Err(AllocationError::OutOfMemory {
                    label: desc.label.clone(),
                });
            }
        }
        let id = TargetId(self.next_id);
        self.next_id += 1;
        let clear = desc.format.quantize([0.0, 0.0, 0.0, 0.0]);
        let _ = self.images.insert(
            id,
            Image {
                desc: desc.clone(),
                texels: vec![clear; desc.texel_count()],
            },
        );
        log::debug!(
            "created {id} '{}' {}x{} {:?}",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(id)
    }

    fn release_target(&mut self, id: TargetId) {
        if self.images.remove(&id).is_some() {
            log::debug!("released {id}");
        }
    }

    fn target_desc(&self, id: TargetId) -> Option<&TargetDesc> {
        self.images.get(&id).map(|image| &image.desc)
    }

    fn upload(&mut self, id: TargetId, texels: &[[f32; 4]]) -> Result<(), FrameFxError> {
        let desc = &self.image(id)?.desc;
        if texels.len() != desc.texel_count() {
            return Err(ConfigError::DimensionMismatch {
                role: "upload",
                expected: desc.extent(),
                actual: (texels.len() as u32, 1),
            }
            .into());
        }
        self.store(id, texels.to_vec())
    }

    fn prepare_variants(&mut self, selector: &KernelSelector) -> Result<(), ConfigError> {
        self.kernels = selector.registered().map(|(flags, id)| (id, flags)).collect();
        Ok(())
    }

    fn begin_frame(&mut self, label: &str) {
        if self.recording.replace(Vec::new()).is_some() {
            log::warn!("discarding unsubmitted frame recording before '{label}'");
        }
    }

    fn encode(&mut self, pass: Pass) -> Result<(), FrameFxError> {
        if self.recording.is_none() {
            return Err(FrameFxError::NoActiveFrame);
        }
        self.validate_pass(&pass)?;
        if let Pass::Uber {
            kernel, features, ..
        } = &pass
        {
            if self.kernels.get(kernel) != Some(features) {
                return Err(ConfigError::UnregisteredVariant(*features).into());
            }
        }
        if let Some(recording) = self.recording.as_mut() {
            recording.push(pass);
        }
        Ok(())
    }

    fn submit_frame(&mut self) -> Result<(), FrameFxError> {
        let passes = self.recording.take().ok_or(FrameFxError::NoActiveFrame)?;
        for pass in &passes {
            self.execute(pass)?;
        }
        self.last_frame = passes;
        self.frames_submitted += 1;
        Ok(())
    }

    fn abandon_frame(&mut self) {
        if let Some(passes) = self.recording.take() {
            log::debug!("abandoned frame with {} recorded passes", passes.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postprocess::target::TargetFormat;

    fn target(backend: &mut CpuBackend, w: u32, h: u32, format: TargetFormat) -> TargetId {
        backend
            .create_target(&TargetDesc::new("test", w, h, format))
            .unwrap()
    }

    #[test]
    fn ids_are_unique_and_released_targets_vanish() {
        let mut backend = CpuBackend::new();
        let a = target(&mut backend, 4, 4, TargetFormat::Rgba16Float);
        let b = target(&mut backend, 4, 4, TargetFormat::Rgba16Float);
        assert_ne!(a, b);
        backend.release_target(a);
        assert!(backend.target_desc(a).is_none());
        assert_eq!(backend.live_targets(), 1);
        let c = target(&mut backend, 4, 4, TargetFormat::Rgba16Float);
        assert_ne!(a, c);
    }

    #[test]
    fn memory_budget_reports_out_of_memory() {
        let mut backend = CpuBackend::new().with_memory_budget(4 * 4 * 8);
        let _ = target(&mut backend, 4, 4, TargetFormat::Rgba16Float);
        let err = backend
            .create_target(&TargetDesc::new("extra", 1, 1, TargetFormat::R32Float))
            .unwrap_err();
        assert_eq!(
            err,
            AllocationError::OutOfMemory {
                label: "extra".to_owned()
            }
        );
    }

    #[test]
    fn encode_requires_an_active_frame() {
        let mut backend = CpuBackend::new();
        let a = target(&mut backend, 2, 2, TargetFormat::Rgba16Float);
        let b = target(&mut backend, 2, 2, TargetFormat::Rgba16Float);
        let err = backend
            .encode(Pass::Copy {
                source: a,
                destination: b,
            })
            .unwrap_err();
        assert!(matches!(err, FrameFxError::NoActiveFrame));
    }

    #[test]
    fn abandoned_frames_do_not_execute() {
        let mut backend = CpuBackend::new();
        let a = target(&mut backend, 1, 1, TargetFormat::Rgba16Float);
        let b = target(&mut backend, 1, 1, TargetFormat::Rgba16Float);
        backend.upload(a, &[[1.0, 0.5, 0.25, 1.0]]).unwrap();
        backend.begin_frame("test");
        backend
            .encode(Pass::Copy {
                source: a,
                destination: b,
            })
            .unwrap();
        backend.abandon_frame();
        assert_eq!(backend.texels(b).unwrap(), &[[0.0; 4]]);
        assert!(backend.submit_frame().is_err());
        assert_eq!(backend.frames_submitted(), 0);
    }

    #[test]
    fn copy_between_mismatched_extents_is_rejected() {
        let mut backend = CpuBackend::new();
        let a = target(&mut backend, 2, 2, TargetFormat::Rgba16Float);
        let b = target(&mut backend, 4, 2, TargetFormat::Rgba16Float);
        backend.begin_frame("test");
        let err = backend
            .encode(Pass::Copy {
                source: a,
                destination: b,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            FrameFxError::Config(ConfigError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn unknown_targets_are_reported() {
        let mut backend = CpuBackend::new();
        let a = target(&mut backend, 2, 2, TargetFormat::Rgba16Float);
        backend.begin_frame("test");
        let err = backend
            .encode(Pass::Copy {
                source: a,
                destination: TargetId(99),
            })
            .unwrap_err();
        assert!(matches!(err, FrameFxError::MissingTarget(TargetId(99))));
    }

    #[test]
    fn uber_requires_prepared_kernel() {
        let mut backend = CpuBackend::new();
        let src = target(&mut backend, 2, 2, TargetFormat::Rgba16Float);
        let out = target(&mut backend, 2, 2, TargetFormat::Rgba16Float);
        let exposure = target(&mut backend, 1, 1, TargetFormat::Rg32Float);
        let lut = target(&mut backend, 3, 1, TargetFormat::Rgba16Float);
        let mut selector = KernelSelector::new();
        let kernel = selector.register(FeatureFlags::NONE);
        let pass = Pass::Uber {
            kernel,
            features: FeatureFlags::NONE,
            source: src,
            exposure,
            spectral_lut: lut,
            output: out,
            params: Box::new(UberParams::for_screen(2, 2)),
        };
        backend.begin_frame("test");
        assert!(backend.encode(pass.clone()).is_err());
        backend.prepare_variants(&selector).unwrap();
        assert!(backend.encode(pass).is_ok());
    }

    #[test]
    fn converting_copy_quantizes_to_destination() {
        let mut backend = CpuBackend::new();
        let hdr = target(&mut backend, 1, 1, TargetFormat::Rgba16Float);
        let ldr = target(&mut backend, 1, 1, TargetFormat::Rgba8Unorm);
        backend.upload(hdr, &[[4.0, 0.5, -1.0, 1.0]]).unwrap();
        backend.begin_frame("test");
        backend
            .encode(Pass::Copy {
                source: hdr,
                destination: ldr,
            })
            .unwrap();
        backend.submit_frame().unwrap();
        let texel = backend.texels(ldr).unwrap()[0];
        assert_eq!(texel[0], 1.0);
        assert_eq!(texel[2], 0.0);
        assert_eq!(backend.last_frame_passes().len(), 1);
    }

    #[test]
    fn fxaa_smooths_a_hard_edge_only() {
        let mut backend = CpuBackend::new();
        let src = target(&mut backend, 4, 1, TargetFormat::Rgba16Float);
        let out = target(&mut backend, 4, 1, TargetFormat::Rgba16Float);
        backend
            .upload(
                src,
                &[
                    [0.0, 0.0, 0.0, 1.0],
                    [0.0, 0.0, 0.0, 1.0],
                    [1.0, 1.0, 1.0, 1.0],
                    [1.0, 1.0, 1.0, 1.0],
                ],
            )
            .unwrap();
        backend.begin_frame("test");
        backend
            .encode(Pass::Fxaa {
                source: src,
                output: out,
                params: FxaaParams::new(&crate::options::FxaaOptions::default(), 4, 1),
            })
            .unwrap();
        backend.submit_frame().unwrap();
        let texels = backend.texels(out).unwrap();
        assert_eq!(texels[0][0], 0.0);
        assert!(texels[1][0] > 0.0);
        assert!(texels[2][0] < 1.0);
        assert_eq!(texels[3][0], 1.0);
    }

    #[test]
    fn uber_applies_exposure_multiplier() {
        let mut backend = CpuBackend::new();
        let src = target(&mut backend, 2, 1, TargetFormat::Rgba16Float);
        let out = target(&mut backend, 2, 1, TargetFormat::Rgba16Float);
        let exposure = target(&mut backend, 1, 1, TargetFormat::Rg32Float);
        let lut = target(&mut backend, 3, 1, TargetFormat::Rgba16Float);
        backend.upload(src, &[[1.0, 0.5, 0.25, 1.0]; 2]).unwrap();
        let mut selector = KernelSelector::new();
        let kernel = selector.register(FeatureFlags::NONE);
        backend.prepare_variants(&selector).unwrap();
        backend.begin_frame("test");
        backend
            .encode(Pass::ExposureFixed {
                output: exposure,
                ev100: 1.0,
                multiplier: 0.5,
            })
            .unwrap();
        backend
            .encode(Pass::Uber {
                kernel,
                features: FeatureFlags::NONE,
                source: src,
                exposure,
                spectral_lut: lut,
                output: out,
                params: Box::new(UberParams::for_screen(2, 1)),
            })
            .unwrap();
        backend.submit_frame().unwrap();
        assert_eq!(backend.texels(out).unwrap()[0], [0.5, 0.25, 0.125, 1.0]);
    }
}
