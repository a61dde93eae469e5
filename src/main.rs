//! Headless runner: renders a synthetic scene through the pipeline on the
//! CPU reference backend or the GPU.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use framefx::gpu::GpuBackend;
use framefx::{
    AntialiasingMode, CameraId, CpuBackend, FrameBackend, FrameFxError, FrameInputs,
    FramePipeline, Options, PostProcessCamera, TargetDesc, TargetFormat,
};

#[derive(Parser, Debug)]
#[command(
    name = "framefx",
    author,
    version,
    about = "Run the post-processing pipeline headless over a synthetic scene"
)]
struct Cli {
    /// Options preset (TOML). Missing sections use defaults.
    #[arg(long, value_name = "FILE")]
    preset: Option<PathBuf>,

    /// Number of frames to render.
    #[arg(long, default_value_t = 8)]
    frames: u32,

    /// Render resolution (e.g. `320x180`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "320x180", value_parser = parse_size)]
    size: (u32, u32),

    /// Anti-aliasing mode of the camera.
    #[arg(long, value_enum, default_value_t = Aa::None)]
    aa: Aa,

    /// Execute on the GPU instead of the CPU reference backend.
    #[arg(long)]
    gpu: bool,

    /// Frame index at which to signal a camera cut.
    #[arg(long, value_name = "FRAME")]
    cut_at: Option<u32>,

    /// Print the options JSON schema and exit.
    #[arg(long)]
    schema: bool,

    /// Write the resolved options to a TOML file.
    #[arg(long, value_name = "FILE")]
    save_preset: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Aa {
    None,
    Fxaa,
    Temporal,
}

impl From<Aa> for AntialiasingMode {
    fn from(aa: Aa) -> Self {
        match aa {
            Aa::None => Self::None,
            Aa::Fxaa => Self::Fxaa,
            Aa::Temporal => Self::Temporal,
        }
    }
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((w, h))
}

/// HDR sky gradient with a bright sun disc, a dark ground and a slow pan.
fn synthetic_scene(width: u32, height: u32, frame: u32) -> Vec<[f32; 4]> {
    let sun = (width as f32 * 0.7 + frame as f32, height as f32 * 0.3);
    let radius = width.min(height) as f32 * 0.08;
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let v = y as f32 / height as f32;
            let dx = x as f32 - sun.0;
            let dy = y as f32 - sun.1;
            if (dx * dx + dy * dy).sqrt() < radius {
                [40.0, 36.0, 28.0, 1.0]
            } else if v > 0.6 {
                [0.08, 0.06, 0.04, 1.0]
            } else {
                [0.4 + v, 0.6 + v * 0.5, 1.2, 1.0]
            }
        })
        .collect()
}

fn create_inputs<B: FrameBackend>(
    backend: &mut B,
    (width, height): (u32, u32),
) -> Result<FrameInputs, FrameFxError> {
    let mut target = |label: &str, format| {
        backend.create_target(&TargetDesc::new(label, width, height, format))
    };
    let inputs = FrameInputs {
        source: target("scene color", TargetFormat::Rgba16Float)?,
        depth: target("scene depth", TargetFormat::Depth32Float)?,
        velocity: target("scene velocity", TargetFormat::Rg16Float)?,
        destination: target("output", TargetFormat::Rgba8Unorm)?,
    };
    let texels = (width * height) as usize;
    backend.upload(inputs.depth, &vec![[0.5, 0.0, 0.0, 1.0]; texels])?;
    let pan = 1.0 / width as f32;
    backend.upload(inputs.velocity, &vec![[pan, 0.0, 0.0, 1.0]; texels])?;
    Ok(inputs)
}

fn run<B: FrameBackend>(
    backend: &mut B,
    cli: &Cli,
    options: &Options,
) -> Result<FrameInputs, FrameFxError> {
    let (width, height) = cli.size;
    let inputs = create_inputs(backend, cli.size)?;
    let mut pipeline = FramePipeline::new(backend)?;
    let mut camera =
        PostProcessCamera::new(CameraId(0), width, height).with_antialiasing(cli.aa.into());

    for frame in 0..cli.frames {
        backend.upload(inputs.source, &synthetic_scene(width, height, frame))?;
        camera.camera_cut = cli.cut_at == Some(frame);
        let report = pipeline.render(backend, &camera, options, &inputs)?;
        log::info!(
            "frame {frame}: {} passes, features [{}], temporal {:?}, final {:?}{}",
            report.pass_count,
            report.features,
            report.temporal,
            report.final_pass,
            if report.history_reset { ", history reset" } else { "" }
        );
        camera.advance(1.0 / 60.0);
    }
    pipeline.release_all(backend);
    Ok(inputs)
}

fn log_average(texels: &[[f32; 4]]) {
    let count = texels.len().max(1) as f32;
    let sum = texels.iter().fold([0.0_f32; 3], |acc, t| {
        [acc[0] + t[0], acc[1] + t[1], acc[2] + t[2]]
    });
    log::info!(
        "output average rgb: {:.3} {:.3} {:.3}",
        sum[0] / count,
        sum[1] / count,
        sum[2] / count
    );
}

fn execute(cli: &Cli) -> Result<(), FrameFxError> {
    if cli.schema {
        let schema = serde_json::to_string_pretty(&Options::json_schema())
            .map_err(|e| FrameFxError::OptionsParse(e.to_string()))?;
        writeln!(std::io::stdout().lock(), "{schema}")?;
        return Ok(());
    }

    let options = match &cli.preset {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    if let Some(path) = &cli.save_preset {
        options.save(path)?;
        log::info!("saved options to {}", path.display());
    }

    if cli.gpu {
        let mut backend = GpuBackend::new_headless()?;
        let inputs = run(&mut backend, cli, &options)?;
        log_average(&backend.read_texels(inputs.destination)?);
    } else {
        let mut backend = CpuBackend::new();
        let inputs = run(&mut backend, cli, &options)?;
        if let Some(texels) = backend.texels(inputs.destination) {
            log_average(texels);
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = execute(&cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
