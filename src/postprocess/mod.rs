//! Frame-sequenced post-processing.
//!
//! [`pipeline::FramePipeline`] drives exposure, temporal anti-aliasing, the
//! uber pass and the final FXAA/copy for each camera, recording work through
//! a [`backend::FrameBackend`]. [`cpu::CpuBackend`] executes passes on the
//! CPU; the wgpu backend lives in [`crate::gpu`].

pub mod backend;
pub mod camera;
pub mod cpu;
pub mod history;
pub mod ping_pong;
pub mod pipeline;
pub mod target;
pub mod variants;

pub use backend::{FrameBackend, Pass, PassKind};
pub use camera::{AntialiasingMode, CameraId, PhysicalCameraSettings, PostProcessCamera};
pub use cpu::CpuBackend;
pub use history::{HistoryChannel, HistoryPair, HistorySlotAllocator};
pub use ping_pong::PingPongPool;
pub use pipeline::{FrameInputs, FramePipeline, FrameReport, TemporalOutcome};
pub use target::{TargetDesc, TargetFormat, TargetId};
pub use variants::{FeatureFlags, KernelId, KernelSelector, UberFeature};
