//! Parameter building, kernel selection and CPU frame benchmarks.

#![allow(clippy::unwrap_used)]
// `criterion_group!` expands to an undocumented `pub fn`.
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use framefx::effects::{build_uber_params, collect_features, EffectFrame};
use framefx::options::{ExposureMode, Options};
use framefx::postprocess::KernelSelector;
use framefx::{
    AntialiasingMode, CameraId, CpuBackend, FrameBackend, FrameInputs, FramePipeline,
    PostProcessCamera, TargetDesc, TargetFormat,
};

fn graded_options() -> Options {
    let mut options = Options::default();
    options.exposure.mode = ExposureMode::Automatic;
    options.color_grading.contrast = 15.0;
    options.color_grading.saturation = 10.0;
    options.vignette.intensity = 0.35;
    options.chromatic_aberration.intensity = 0.2;
    options
}

fn scene(backend: &mut CpuBackend, size: u32) -> FrameInputs {
    let mut target = |label: &str, format| {
        backend
            .create_target(&TargetDesc::new(label, size, size, format))
            .unwrap()
    };
    let inputs = FrameInputs {
        source: target("source", TargetFormat::Rgba16Float),
        depth: target("depth", TargetFormat::Depth32Float),
        velocity: target("velocity", TargetFormat::Rg16Float),
        destination: target("destination", TargetFormat::Rgba8Unorm),
    };
    let texels: Vec<[f32; 4]> = (0..size * size)
        .map(|i| {
            let v = (i % size) as f32 / size as f32;
            [v * 4.0, v, 1.0 - v, 1.0]
        })
        .collect();
    backend.upload(inputs.source, &texels).unwrap();
    inputs
}

fn uber_params_benchmark(c: &mut Criterion) {
    let options = graded_options();
    let flags = collect_features(&options);
    c.bench_function("build_uber_params", |b| {
        b.iter(|| {
            let frame = EffectFrame::new(black_box(&options), 1920, 1080);
            black_box(build_uber_params(&frame, flags))
        })
    });
}

fn kernel_select_benchmark(c: &mut Criterion) {
    let selector = KernelSelector::with_all_variants();
    let flags = collect_features(&graded_options());
    c.bench_function("kernel_select", |b| {
        b.iter(|| black_box(selector.select(black_box(flags))))
    });
}

fn cpu_frame_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_frame");
    let options = graded_options();

    for size in [32_u32, 64, 128] {
        for (name, aa) in [
            ("fxaa", AntialiasingMode::Fxaa),
            ("temporal", AntialiasingMode::Temporal),
        ] {
            let mut backend = CpuBackend::new();
            let inputs = scene(&mut backend, size);
            let mut pipeline = FramePipeline::new(&mut backend).unwrap();
            let mut camera =
                PostProcessCamera::new(CameraId(1), size, size).with_antialiasing(aa);

            group.bench_function(format!("{name}_{size}px"), |b| {
                b.iter(|| {
                    let report = pipeline
                        .render(&mut backend, &camera, &options, &inputs)
                        .unwrap();
                    camera.advance(1.0 / 60.0);
                    black_box(report)
                })
            });
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    uber_params_benchmark,
    kernel_select_benchmark,
    cpu_frame_benchmark
);
criterion_main!(benches);
