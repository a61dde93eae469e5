// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Frame-sequenced camera post-processing on wgpu.
//!
//! Each camera frame runs exposure, optional temporal anti-aliasing, an uber
//! pass (color grading, tonemapping, lens distortion, chromatic aberration,
//! vignette) and a final FXAA or copy into the host's destination target.
//! Per-camera history survives between frames and is reset on camera cuts,
//! resizes and explicit requests.
//!
//! # Key entry points
//!
//! - [`postprocess::FramePipeline`] - records one camera frame
//! - [`postprocess::FrameBackend`] - the seam executing recorded passes;
//!   [`postprocess::CpuBackend`] is the reference implementation and
//!   [`gpu::GpuBackend`] runs the same passes as wgpu compute kernels
//! - [`options::Options`] - effect settings, loadable from TOML presets
//! - [`volume::VolumeStack`] - priority-ordered per-section overrides
//! - [`frame_settings::FrameSettings`] - per-camera feature toggles
//!
//! # Frame order
//!
//! exposure -> temporal AA -> uber -> FXAA / copy. With post-processing
//! disabled the source is copied straight to the destination.

pub mod effects;
pub mod error;
pub mod frame_settings;
pub mod gpu;
pub mod options;
pub mod postprocess;
pub mod volume;

pub use error::{AllocationError, ConfigError, FrameFxError};
pub use frame_settings::{FrameSettings, FrameSettingsOverrides, LitShaderMode, RenderCaps};
pub use options::Options;
pub use postprocess::{
    AntialiasingMode, CameraId, CpuBackend, FrameBackend, FrameInputs, FramePipeline,
    FrameReport, PostProcessCamera, TargetDesc, TargetFormat, TargetId,
};
pub use volume::{VolumeOverrides, VolumeStack};
